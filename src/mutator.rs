//! Bulk renumbering primitives.
//!
//! Each primitive is a pure function returning a [`MutationPlan`]: a short,
//! fixed list of set-based statements. Nothing here iterates rows. Plans
//! are executed with [`MutationPlan::execute`], which the engine always
//! calls inside the store's atomic unit.
//!
//! Moving a block inside one tree is three plans run back to back:
//!
//! ```text
//! shift_boundaries(target, +width)   open the destination gap
//! move_within_tree(..)               relocate the block
//! shift_boundaries(old_right + 1, -width)  close the origin gap
//! ```
//!
//! The order matters: relocating before the destination gap exists would
//! renumber rows that sit inside the block's own landing window.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    config::ColumnNames,
    node::{Bounds, NodeRecord},
    predicate::{Column, Filter, Scope},
    store::{NodeKey, TreeStore},
};

/// One field update applied by a bulk statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Change<K> {
    /// `column = column + delta`
    Add { column: Column, delta: i64 },
    /// `tree = value`
    SetTree(Option<K>),
}

impl<K: Clone> Change<K> {
    pub fn add(column: Column, delta: i64) -> Self {
        Change::Add { column, delta }
    }

    pub fn apply(&self, record: &mut NodeRecord<K>) {
        match self {
            Change::Add { column, delta } => *column.get_mut(record) += delta,
            Change::SetTree(tree) => record.tree = tree.clone(),
        }
    }
}

/// A single set-based statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step<K> {
    Update {
        filter: Filter<K>,
        changes: Vec<Change<K>>,
    },
    Delete {
        filter: Filter<K>,
    },
}

/// Row counts reported by the store while executing a plan.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq)]
pub struct PlanReport {
    pub updated: usize,
    pub deleted: usize,
}

/// An ordered list of statements forming (part of) one logical operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationPlan<K> {
    steps: Vec<Step<K>>,
}

impl<K> Default for MutationPlan<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MutationPlan<K> {
    pub fn new() -> Self {
        MutationPlan { steps: Vec::new() }
    }

    pub fn update(mut self, filter: Filter<K>, changes: Vec<Change<K>>) -> Self {
        self.steps.push(Step::Update { filter, changes });
        self
    }

    pub fn delete(mut self, filter: Filter<K>) -> Self {
        self.steps.push(Step::Delete { filter });
        self
    }

    /// Appends `other`'s statements after this plan's.
    pub fn then(mut self, other: MutationPlan<K>) -> Self {
        self.steps.extend(other.steps);
        self
    }

    pub fn steps(&self) -> &[Step<K>] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Runs every statement in order against `store`.
    ///
    /// Callers are expected to be inside [`TreeStore::run_atomic`]; a
    /// failure part-way leaves earlier statements applied until the unit
    /// rolls back.
    pub fn execute<S>(&self, store: &mut S, columns: &ColumnNames) -> Result<PlanReport, S::Error>
    where
        K: NodeKey,
        S: TreeStore<Key = K>,
    {
        let mut report = PlanReport::default();
        for step in &self.steps {
            match step {
                Step::Update { filter, changes } => {
                    let n = store.bulk_update(filter, changes)?;
                    trace!(filter = %filter.render(columns), ?changes, rows = n, "bulk update");
                    report.updated += n;
                }
                Step::Delete { filter } => {
                    let n = store.bulk_delete(filter)?;
                    trace!(filter = %filter.render(columns), rows = n, "bulk delete");
                    report.deleted += n;
                }
            }
        }
        Ok(report)
    }
}

/// Adds `delta` to every `left` and every `right` that is at least `from`.
///
/// A positive `delta` opens a gap starting at `from`; a negative one closes
/// the gap that ends just before `from`. Each column is filtered on its own
/// value, so a node straddling `from` only has its right boundary moved.
pub fn shift_boundaries<K: Clone>(from: i64, delta: i64, scope: &Scope<K>) -> MutationPlan<K> {
    [Column::Left, Column::Right]
        .into_iter()
        .fold(MutationPlan::new(), |plan, column| {
            plan.update(
                Filter::shift_from(column, from, scope),
                vec![Change::add(column, delta)],
            )
        })
}

/// Relocates the block `[old_left, old_right]` inside one tree.
///
/// Both boundaries move by `position_offset` and depth by `depth_offset`.
/// The destination gap must already be open.
pub fn move_within_tree<K: Clone>(
    old_left: i64,
    old_right: i64,
    position_offset: i64,
    depth_offset: i64,
    scope: &Scope<K>,
) -> MutationPlan<K> {
    MutationPlan::new().update(
        Filter::subtree_move(old_left, old_right, scope),
        vec![
            Change::add(Column::Left, position_offset),
            Change::add(Column::Right, position_offset),
            Change::add(Column::Depth, depth_offset),
        ],
    )
}

/// Relocates the block `[old_left, old_right]` of `current_tree` into `target_tree`.
///
/// The destination tree must already have a gap opened at the landing spot.
pub fn move_across_trees<K: Clone>(
    old_left: i64,
    old_right: i64,
    position_offset: i64,
    depth_offset: i64,
    target_tree: Option<K>,
    current_tree: Option<K>,
) -> MutationPlan<K> {
    MutationPlan::new().update(
        Filter::cross_tree_move(old_left, old_right, current_tree),
        vec![
            Change::add(Column::Left, position_offset),
            Change::add(Column::Right, position_offset),
            Change::add(Column::Depth, depth_offset),
            Change::SetTree(target_tree),
        ],
    )
}

/// Turns the subtree at `node` into its own tree with id `new_tree`.
///
/// The subtree is renumbered to start at `left = 1` with its top at depth 0.
pub fn promote_to_root<K: Clone>(
    node: &Bounds,
    new_tree: K,
    current_tree: Option<K>,
) -> MutationPlan<K> {
    move_across_trees(
        node.left,
        node.right,
        1 - node.left,
        -node.depth,
        Some(new_tree),
        current_tree,
    )
}

/// Moves what remains of `[left, right]` one level up after its top node was removed.
pub fn lift_descendants<K: Clone>(left: i64, right: i64, scope: &Scope<K>) -> MutationPlan<K> {
    move_within_tree(left, right, -1, -1, scope)
}

/// Removes every row strictly inside `(left, right)`.
///
/// The node owning the interval is left for [`delete_node`] (or the host's
/// own delete statement).
pub fn delete_descendants<K: Clone>(left: i64, right: i64, scope: &Scope<K>) -> MutationPlan<K> {
    MutationPlan::new().delete(Filter::within(left, right, scope))
}

/// Removes the single row with primary key `id`.
pub fn delete_node<K>(id: K) -> MutationPlan<K> {
    MutationPlan::new().delete(Filter::Id(id))
}
