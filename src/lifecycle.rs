//! Lifecycle hooks.
//!
//! A host with its own save cycle stages a structural [`Operation`] on a
//! node and calls the matching pair of hooks around its persistence step:
//!
//! | host step | before            | after            |
//! |-----------|-------------------|------------------|
//! | insert    | `before_insert`   | `after_insert`   |
//! | update    | `before_update`   | `after_update`   |
//! | delete    | `before_delete`   | `after_delete`   |
//!
//! All six must run inside one [`TreeStore::run_atomic`] unit together with
//! the host's own statement. On delete that statement removes the node's own
//! row only: `before_delete` has already removed its descendants when the
//! whole subtree goes. Hosts without a statement of their own call
//! [`Hooks::remove`] in its place. The engine's [`NestedSet`](crate::engine::NestedSet)
//! operations do exactly that.
//!
//! Each hook re-reads the snapshots it depends on and hands them to a pure
//! planner (`plan_*`, `validate_*`) that returns the node's new fields and
//! the [`MutationPlan`] to execute. Planners never touch the store.

use tracing::debug;

use crate::{
    config::NestedSetConfig,
    error::{NestedResult, NestedSetError},
    mutator::{self, Change, MutationPlan, PlanReport},
    node::{Bounds, NodeRecord},
    position::{Operation, Placement, Position},
    predicate::{Filter, Scope},
    store::TreeStore,
};

/// The fields of a node about to be inserted and the statements making room for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertPlan<K> {
    pub bounds: Bounds,
    pub tree: Option<K>,
    pub plan: MutationPlan<K>,
}

/// The statements removing a node and renumbering what is left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletePlan<K> {
    /// Executed by `before_delete`; empty unless the subtree goes too.
    pub descendants: MutationPlan<K>,
    /// The node's own row. Hosts issue their own delete statement instead.
    pub removal: MutationPlan<K>,
    /// Executed by `after_delete`.
    pub renumber: MutationPlan<K>,
}

/// Computes where a new node goes.
///
/// `reference` must be a fresh snapshot; `root_exists` tells whether the
/// table already holds a root (only consulted in single-tree mode).
pub fn plan_insert<K: Clone, E>(
    config: &NestedSetConfig,
    placement: Placement<&NodeRecord<K>>,
    root_exists: bool,
) -> NestedResult<InsertPlan<K>, E> {
    if let Some(reference) = placement.reference() {
        if reference.is_new() {
            return Err(NestedSetError::InvalidTarget);
        }
    }

    let position = placement.resolve();
    let depth = position.depth();
    match position {
        Position::NewRoot => {
            if !config.multi_tree && root_exists {
                return Err(NestedSetError::StructureConflict);
            }
            Ok(InsertPlan {
                bounds: Bounds::ROOT,
                tree: None,
                plan: MutationPlan::new(),
            })
        }
        Position::Relative {
            target,
            depth_delta,
            ..
        } => {
            let reference = placement.reference().ok_or(NestedSetError::InvalidTarget)?;
            if depth_delta == 0 && reference.is_root() {
                return Err(NestedSetError::InvalidOperation(
                    "can not create a sibling of a root node",
                ));
            }
            let scope = Scope::of(reference, config.multi_tree);
            Ok(InsertPlan {
                bounds: Bounds::leaf(target, depth),
                tree: if config.multi_tree {
                    reference.tree.clone()
                } else {
                    None
                },
                plan: mutator::shift_boundaries(target, 2, &scope),
            })
        }
    }
}

/// The statement giving a freshly inserted root its own tree id.
pub fn plan_root_assignment<K: Clone, E>(
    config: &NestedSetConfig,
    placement: &Placement<&NodeRecord<K>>,
    inserted: &NodeRecord<K>,
) -> NestedResult<MutationPlan<K>, E> {
    match placement {
        Placement::MakeRoot if config.multi_tree => {
            let id = inserted.id.clone().ok_or(NestedSetError::MissingIdentity)?;
            Ok(MutationPlan::new().update(
                Filter::Id(id.clone()),
                vec![Change::SetTree(Some(id))],
            ))
        }
        _ => Ok(MutationPlan::new()),
    }
}

/// Checks that `node` may be moved as `placement` describes.
pub fn validate_move<K: PartialEq, E>(
    config: &NestedSetConfig,
    node: &NodeRecord<K>,
    placement: &Placement<&NodeRecord<K>>,
) -> NestedResult<(), E> {
    if node.is_new() {
        return Err(NestedSetError::InvalidTarget);
    }
    match placement {
        Placement::MakeRoot => {
            if !config.multi_tree {
                return Err(NestedSetError::UnsupportedOperation(
                    "moving a node to root requires multi-tree mode",
                ));
            }
            if node.is_root() {
                return Err(NestedSetError::NoOpMove);
            }
        }
        Placement::PrependTo(reference)
        | Placement::AppendTo(reference)
        | Placement::InsertBefore(reference)
        | Placement::InsertAfter(reference) => {
            if reference.is_new() {
                return Err(NestedSetError::InvalidTarget);
            }
            if node.same_node(reference) {
                return Err(NestedSetError::NoOpMove);
            }
            if reference.is_descendant_of(node) {
                return Err(NestedSetError::CycleDetected);
            }
            if placement.is_sibling() && reference.is_root() {
                return Err(NestedSetError::InvalidOperation(
                    "can not move a node next to a root node",
                ));
            }
        }
    }
    Ok(())
}

/// Computes the statements moving `node`'s subtree as `placement` describes.
///
/// Both snapshots must be fresh. The plan is validated first.
pub fn plan_move<K: Clone + PartialEq, E>(
    config: &NestedSetConfig,
    node: &NodeRecord<K>,
    placement: &Placement<&NodeRecord<K>>,
) -> NestedResult<MutationPlan<K>, E> {
    validate_move(config, node, placement)?;

    let width = node.width();
    let origin = Scope::of(node, config.multi_tree);

    let position = placement.resolve();
    let depth_offset = position.depth() - node.depth;
    let (target, reference_tree) = match position {
        Position::NewRoot => {
            let id = node.id.clone().ok_or(NestedSetError::MissingIdentity)?;
            debug!(left = node.left, right = node.right, "promoting subtree to root");
            return Ok(
                mutator::promote_to_root(&node.bounds(), id, node.tree.clone()).then(
                    mutator::shift_boundaries(node.right + 1, -width, &origin),
                ),
            );
        }
        Position::Relative { target, tree, .. } => (target, tree),
    };

    if !config.multi_tree || node.tree == reference_tree {
        let (mut left, mut right) = (node.left, node.right);
        if left >= target {
            left += width;
            right += width;
        }
        debug!(gap_at = target, width, depth_offset, "moving subtree within its tree");
        Ok(mutator::shift_boundaries(target, width, &origin)
            .then(mutator::move_within_tree(
                left,
                right,
                target - left,
                depth_offset,
                &origin,
            ))
            .then(mutator::shift_boundaries(right + 1, -width, &origin)))
    } else {
        debug!(gap_at = target, width, depth_offset, "moving subtree across trees");
        Ok(
            mutator::shift_boundaries(target, width, &Scope::Tree(reference_tree.clone()))
                .then(mutator::move_across_trees(
                    node.left,
                    node.right,
                    target - node.left,
                    depth_offset,
                    reference_tree,
                    node.tree.clone(),
                ))
                .then(mutator::shift_boundaries(node.right + 1, -width, &origin)),
        )
    }
}

/// Checks that `node` may be deleted as `operation` describes.
pub fn validate_delete<K, R, E>(
    node: &NodeRecord<K>,
    operation: &Operation<R>,
) -> NestedResult<(), E> {
    if node.is_new() {
        return Err(NestedSetError::InvalidTarget);
    }
    match operation {
        Operation::DeleteSingle if node.is_root() => Err(NestedSetError::UnsupportedOperation(
            "a root node can only be deleted together with its subtree",
        )),
        Operation::DeleteSingle | Operation::DeleteWithSubtree => Ok(()),
        Operation::Place(_) => Err(NestedSetError::UnsupportedOperation(
            "delete requires a delete operation",
        )),
    }
}

/// Computes the statements removing `node` and closing the gap it leaves.
///
/// A single delete lifts the node's descendants by exactly one level, which
/// holds because exactly one node disappears from between them and the
/// root.
pub fn plan_delete<K: Clone, R, E>(
    config: &NestedSetConfig,
    node: &NodeRecord<K>,
    operation: &Operation<R>,
) -> NestedResult<DeletePlan<K>, E> {
    validate_delete(node, operation)?;
    let id = node.id().cloned().ok_or(NestedSetError::InvalidTarget)?;
    let scope = Scope::of(node, config.multi_tree);
    match operation {
        Operation::DeleteSingle => Ok(DeletePlan {
            descendants: MutationPlan::new(),
            removal: mutator::delete_node(id),
            renumber: mutator::lift_descendants(node.left, node.right, &scope)
                .then(mutator::shift_boundaries(node.right + 1, -2, &scope)),
        }),
        Operation::DeleteWithSubtree => Ok(DeletePlan {
            descendants: mutator::delete_descendants(node.left, node.right, &scope),
            removal: mutator::delete_node(id),
            renumber: mutator::shift_boundaries(node.right + 1, -node.width(), &scope),
        }),
        Operation::Place(_) => Err(NestedSetError::UnsupportedOperation(
            "delete requires a delete operation",
        )),
    }
}

/// The six host-facing hooks, bound to a store for the duration of one unit.
pub struct Hooks<'a, S> {
    config: &'a NestedSetConfig,
    store: &'a mut S,
}

impl<'a, S: TreeStore> Hooks<'a, S> {
    pub fn new(config: &'a NestedSetConfig, store: &'a mut S) -> Self {
        Hooks { config, store }
    }

    pub fn store(&mut self) -> &mut S {
        &mut *self.store
    }

    /// Re-reads `node` by id; unpersisted or vanished nodes are `InvalidTarget`.
    pub fn reload(
        &self,
        node: &NodeRecord<S::Key>,
    ) -> NestedResult<NodeRecord<S::Key>, S::Error> {
        reload(&*self.store, node)
    }

    fn reload_placement(
        &self,
        placement: Placement<&NodeRecord<S::Key>>,
    ) -> NestedResult<Placement<NodeRecord<S::Key>>, S::Error> {
        placement.try_map(|r| self.reload(r))
    }

    fn execute(&mut self, plan: &MutationPlan<S::Key>) -> NestedResult<PlanReport, S::Error> {
        plan.execute(self.store, &self.config.columns)
            .map_err(NestedSetError::Store)
    }

    /// Opens the gap for `node` and fills in its interval, depth and tree.
    pub fn before_insert(
        &mut self,
        node: &mut NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<(), S::Error> {
        let Operation::Place(placement) = operation else {
            return Err(NestedSetError::UnsupportedOperation(
                "insert requires a placement",
            ));
        };
        if let Some(id) = &node.id {
            if self.store.get(id).map_err(NestedSetError::Store)?.is_some() {
                return Err(NestedSetError::InvalidOperation(
                    "node is already persisted, move it instead",
                ));
            }
        }
        let placement = self.reload_placement(placement)?;
        let root_exists = self
            .store
            .exists(&Filter::root())
            .map_err(NestedSetError::Store)?;
        let insert = plan_insert(self.config, placement.as_ref(), root_exists)?;
        debug!(
            op = placement.name(),
            left = insert.bounds.left,
            depth = insert.bounds.depth,
            "inserting node"
        );
        self.execute(&insert.plan)?;
        node.set_bounds(insert.bounds);
        node.tree = insert.tree;
        Ok(())
    }

    /// Assigns a new root its own tree id in multi-tree mode.
    pub fn after_insert(
        &mut self,
        node: &mut NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<(), S::Error> {
        let Operation::Place(placement) = operation else {
            return Err(NestedSetError::UnsupportedOperation(
                "insert requires a placement",
            ));
        };
        let plan = plan_root_assignment(self.config, &placement, node)?;
        if !plan.is_empty() {
            self.execute(&plan)?;
            node.tree = node.id.clone();
        }
        Ok(())
    }

    /// Validates a staged move against fresh snapshots.
    pub fn before_update(
        &mut self,
        node: &NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<(), S::Error> {
        let Operation::Place(placement) = operation else {
            return Err(NestedSetError::UnsupportedOperation(
                "update can not delete nodes",
            ));
        };
        let node = self.reload(node)?;
        let placement = self.reload_placement(placement)?;
        validate_move(self.config, &node, &placement.as_ref())
    }

    /// Moves `node`'s subtree and refreshes `node` with its new position.
    pub fn after_update(
        &mut self,
        node: &mut NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<(), S::Error> {
        let Operation::Place(placement) = operation else {
            return Err(NestedSetError::UnsupportedOperation(
                "update can not delete nodes",
            ));
        };
        let fresh = self.reload(node)?;
        let placement = self.reload_placement(placement)?;
        let plan = plan_move(self.config, &fresh, &placement.as_ref())?;
        let report = self.execute(&plan)?;
        debug!(op = placement.name(), rows = report.updated, "moved subtree");
        *node = self.reload(&fresh)?;
        Ok(())
    }

    /// Validates a staged delete and refreshes `node` so `after_delete` sees current bounds.
    ///
    /// For [`Operation::DeleteWithSubtree`] the descendants are removed here,
    /// leaving only `node`'s own row for the host's delete statement.
    /// Returns the number of rows removed.
    pub fn before_delete(
        &mut self,
        node: &mut NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<usize, S::Error> {
        *node = self.reload(node)?;
        let plan = plan_delete(self.config, node, &operation)?;
        Ok(self.execute(&plan.descendants)?.deleted)
    }

    /// Closes the gap left by a deleted node; `node` is the snapshot taken by `before_delete`.
    pub fn after_delete(
        &mut self,
        node: &NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<(), S::Error> {
        let plan = plan_delete(self.config, node, &operation)?;
        debug!(
            op = operation.name(),
            left = node.left,
            right = node.right,
            "closing gap after delete"
        );
        self.execute(&plan.renumber)?;
        Ok(())
    }

    /// Deletes `node`'s own row, for hosts that let the hooks issue the statement.
    ///
    /// Runs between `before_delete` and `after_delete`.
    pub fn remove(
        &mut self,
        node: &NodeRecord<S::Key>,
        operation: Operation<&NodeRecord<S::Key>>,
    ) -> NestedResult<usize, S::Error> {
        let plan = plan_delete(self.config, node, &operation)?;
        Ok(self.execute(&plan.removal)?.deleted)
    }
}

pub(crate) fn reload<S: TreeStore>(
    store: &S,
    node: &NodeRecord<S::Key>,
) -> NestedResult<NodeRecord<S::Key>, S::Error> {
    let id = node.id().ok_or(NestedSetError::InvalidTarget)?;
    store
        .get(id)
        .map_err(NestedSetError::Store)?
        .ok_or(NestedSetError::InvalidTarget)
}
