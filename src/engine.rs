//! The public face of the crate.
//!
//! [`NestedSet`] owns a [`TreeStore`] and a [`NestedSetConfig`] and exposes
//! every structural operation (insert, move, delete) plus the traversal
//! reads. Each structural operation stages its [`Operation`], runs the
//! matching [`Hooks`] pair inside one atomic unit and returns the affected
//! node as stored afterwards. Snapshots taken during an operation live only
//! for that call.
//!
//! ```rust
//! use nestset::{
//!     config::NestedSetConfig, engine::NestedSet, memory::MemoryStore, node::NodeRecord,
//! };
//!
//! let mut tree = NestedSet::new(MemoryStore::new(), NestedSetConfig::single_tree());
//! let root = tree.insert_as_root(NodeRecord::new("root")).unwrap();
//! let a = tree.insert_as_child(NodeRecord::new("a"), &root, false).unwrap();
//! let b = tree.insert_as_child(NodeRecord::new("b"), &root, false).unwrap();
//!
//! assert_eq!((a.left, a.right, a.depth), (2, 3, 1));
//! assert_eq!((b.left, b.right, b.depth), (4, 5, 1));
//! assert_eq!(tree.children(&tree.refresh(&root).unwrap()).unwrap().len(), 2);
//! ```

use tracing::instrument;

use crate::{
    config::NestedSetConfig,
    error::{InvariantViolation, NestedResult, NestedSetError},
    lifecycle::{self, Hooks},
    node::{self, NodeRecord},
    position::{Operation, Placement},
    predicate::{Filter, Order, Scope},
    store::TreeStore,
    verify,
};

/// A nested-set tree (or forest, in multi-tree mode) backed by a store.
#[derive(Debug, Clone)]
pub struct NestedSet<S> {
    store: S,
    config: NestedSetConfig,
}

type Record<S> = NodeRecord<<S as TreeStore>::Key>;
type Outcome<T, S> = NestedResult<T, <S as TreeStore>::Error>;

impl<S: TreeStore> NestedSet<S> {
    pub fn new(store: S, config: NestedSetConfig) -> Self {
        NestedSet { store, config }
    }

    pub fn config(&self) -> &NestedSetConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct access to the store, for the host's own statements.
    ///
    /// Writing the structural columns through it breaks the tree.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The lifecycle hooks, for hosts that drive their own save cycle.
    pub fn hooks(&mut self) -> Hooks<'_, S> {
        Hooks::new(&self.config, &mut self.store)
    }

    fn atomic<T>(
        &mut self,
        body: impl FnOnce(&mut Hooks<'_, S>) -> Outcome<T, S>,
    ) -> Outcome<T, S> {
        let config = &self.config;
        self.store
            .run_atomic(|store| body(&mut Hooks::new(config, store)))
            .map_err(NestedSetError::Store)?
    }

    fn scope(&self, node: &Record<S>) -> Scope<S::Key> {
        Scope::of(node, self.config.multi_tree)
    }

    fn read(&self, filter: &Filter<S::Key>, scoped: bool) -> Outcome<Vec<Record<S>>, S> {
        self.store
            .read(filter, Order::for_reads(self.config.multi_tree, scoped))
            .map_err(NestedSetError::Store)
    }

    // --- Inserts ---

    /// Inserts the new record `node` as `placement` describes and returns it as stored.
    #[instrument(level = "debug", skip_all, fields(op = placement.name()))]
    pub fn insert(
        &mut self,
        node: Record<S>,
        placement: Placement<&Record<S>>,
    ) -> Outcome<Record<S>, S> {
        let operation = Operation::Place(placement);
        self.atomic(|hooks| {
            let mut node = node;
            hooks.before_insert(&mut node, operation)?;
            let mut stored = hooks.store().insert(node).map_err(NestedSetError::Store)?;
            hooks.after_insert(&mut stored, operation)?;
            Ok(stored)
        })
    }

    /// Inserts `node` as the root of a new tree.
    ///
    /// In single-tree mode this fails with `StructureConflict` once a root exists.
    pub fn insert_as_root(&mut self, node: Record<S>) -> Outcome<Record<S>, S> {
        self.insert(node, Placement::MakeRoot)
    }

    /// Inserts `node` as the first (`at_front`) or last child of `parent`.
    pub fn insert_as_child(
        &mut self,
        node: Record<S>,
        parent: &Record<S>,
        at_front: bool,
    ) -> Outcome<Record<S>, S> {
        let placement = if at_front {
            Placement::PrependTo(parent)
        } else {
            Placement::AppendTo(parent)
        };
        self.insert(node, placement)
    }

    /// Inserts `node` right before or right after `sibling`.
    pub fn insert_as_sibling(
        &mut self,
        node: Record<S>,
        sibling: &Record<S>,
        before: bool,
    ) -> Outcome<Record<S>, S> {
        let placement = if before {
            Placement::InsertBefore(sibling)
        } else {
            Placement::InsertAfter(sibling)
        };
        self.insert(node, placement)
    }

    pub fn append_to(&mut self, node: Record<S>, parent: &Record<S>) -> Outcome<Record<S>, S> {
        self.insert(node, Placement::AppendTo(parent))
    }

    pub fn prepend_to(&mut self, node: Record<S>, parent: &Record<S>) -> Outcome<Record<S>, S> {
        self.insert(node, Placement::PrependTo(parent))
    }

    pub fn insert_before(
        &mut self,
        node: Record<S>,
        sibling: &Record<S>,
    ) -> Outcome<Record<S>, S> {
        self.insert(node, Placement::InsertBefore(sibling))
    }

    pub fn insert_after(
        &mut self,
        node: Record<S>,
        sibling: &Record<S>,
    ) -> Outcome<Record<S>, S> {
        self.insert(node, Placement::InsertAfter(sibling))
    }

    // --- Moves ---

    /// Moves `node` and its subtree as `placement` describes and returns `node` as stored.
    #[instrument(level = "debug", skip_all, fields(op = placement.name()))]
    pub fn move_node(
        &mut self,
        node: &Record<S>,
        placement: Placement<&Record<S>>,
    ) -> Outcome<Record<S>, S> {
        let operation = Operation::Place(placement);
        self.atomic(|hooks| {
            let mut moving = node.clone();
            hooks.before_update(&moving, operation)?;
            hooks.after_update(&mut moving, operation)?;
            Ok(moving)
        })
    }

    /// Detaches `node`'s subtree into a tree of its own (multi-tree mode only).
    pub fn make_root(&mut self, node: &Record<S>) -> Outcome<Record<S>, S> {
        self.move_node(node, Placement::MakeRoot)
    }

    pub fn move_append_to(
        &mut self,
        node: &Record<S>,
        parent: &Record<S>,
    ) -> Outcome<Record<S>, S> {
        self.move_node(node, Placement::AppendTo(parent))
    }

    pub fn move_prepend_to(
        &mut self,
        node: &Record<S>,
        parent: &Record<S>,
    ) -> Outcome<Record<S>, S> {
        self.move_node(node, Placement::PrependTo(parent))
    }

    pub fn move_before(&mut self, node: &Record<S>, sibling: &Record<S>) -> Outcome<Record<S>, S> {
        self.move_node(node, Placement::InsertBefore(sibling))
    }

    pub fn move_after(&mut self, node: &Record<S>, sibling: &Record<S>) -> Outcome<Record<S>, S> {
        self.move_node(node, Placement::InsertAfter(sibling))
    }

    // --- Deletes ---

    /// Deletes `node` alone; its children move up one level. Returns the number of rows removed.
    #[instrument(level = "debug", skip_all)]
    pub fn delete_single(&mut self, node: &Record<S>) -> Outcome<usize, S> {
        self.delete(node, Operation::DeleteSingle)
    }

    /// Deletes `node` together with its whole subtree. Returns the number of rows removed.
    #[instrument(level = "debug", skip_all)]
    pub fn delete_with_subtree(&mut self, node: &Record<S>) -> Outcome<usize, S> {
        self.delete(node, Operation::DeleteWithSubtree)
    }

    fn delete(
        &mut self,
        node: &Record<S>,
        operation: Operation<&Record<S>>,
    ) -> Outcome<usize, S> {
        self.atomic(|hooks| {
            let mut snapshot = node.clone();
            let descendants = hooks.before_delete(&mut snapshot, operation)?;
            let removed = hooks.remove(&snapshot, operation)?;
            hooks.after_delete(&snapshot, operation)?;
            Ok(descendants + removed)
        })
    }

    // --- Reads ---

    pub fn get(&self, id: &S::Key) -> Outcome<Option<Record<S>>, S> {
        self.store.get(id).map_err(NestedSetError::Store)
    }

    /// Re-reads `node`; fails with `InvalidTarget` if it is not stored.
    pub fn refresh(&self, node: &Record<S>) -> Outcome<Record<S>, S> {
        lifecycle::reload(&self.store, node)
    }

    /// Ancestors of `node` from the root down, at most `max_relative_depth` levels up.
    pub fn ancestors(
        &self,
        node: &Record<S>,
        max_relative_depth: Option<i64>,
    ) -> Outcome<Vec<Record<S>>, S> {
        let filter = Filter::ancestors_of(&node.bounds(), max_relative_depth, &self.scope(node));
        self.read(&filter, true)
    }

    pub fn parent(&self, node: &Record<S>) -> Outcome<Option<Record<S>>, S> {
        Ok(self.ancestors(node, Some(1))?.pop())
    }

    /// Descendants of `node` in document order, at most `max_relative_depth` levels down.
    pub fn descendants(
        &self,
        node: &Record<S>,
        max_relative_depth: Option<i64>,
    ) -> Outcome<Vec<Record<S>>, S> {
        let filter =
            Filter::descendants_of(&node.bounds(), max_relative_depth, &self.scope(node));
        self.read(&filter, true)
    }

    pub fn children(&self, node: &Record<S>) -> Outcome<Vec<Record<S>>, S> {
        self.descendants(node, Some(1))
    }

    /// `node` followed by all its descendants.
    pub fn subtree(&self, node: &Record<S>) -> Outcome<Vec<Record<S>>, S> {
        self.read(&Filter::subtree_of(&node.bounds(), &self.scope(node)), true)
    }

    pub fn next_sibling(&self, node: &Record<S>) -> Outcome<Option<Record<S>>, S> {
        let filter = Filter::next_sibling_of(&node.bounds(), &self.scope(node));
        Ok(self.read(&filter, true)?.into_iter().next())
    }

    pub fn previous_sibling(&self, node: &Record<S>) -> Outcome<Option<Record<S>>, S> {
        let filter = Filter::previous_sibling_of(&node.bounds(), &self.scope(node));
        Ok(self.read(&filter, true)?.into_iter().next())
    }

    /// Leaves below `node`, or every leaf in the table when `node` is `None`.
    pub fn leaves(&self, node: Option<&Record<S>>) -> Outcome<Vec<Record<S>>, S> {
        match node {
            Some(node) => {
                let filter = Filter::leaves_under(&node.bounds(), &self.scope(node));
                self.read(&filter, true)
            }
            None => self.read(&Filter::leaf(), false),
        }
    }

    /// Every root, ordered by tree.
    pub fn roots(&self) -> Outcome<Vec<Record<S>>, S> {
        self.read(&Filter::root(), false)
    }

    /// Every row, ordered by tree then left.
    pub fn nodes(&self) -> Outcome<Vec<Record<S>>, S> {
        self.read(&Filter::All, false)
    }

    /// Checks the whole table against the nested-set invariants.
    pub fn verify(&self) -> Outcome<Result<(), InvariantViolation<S::Key>>, S> {
        Ok(verify::verify(&self.nodes()?, self.config.multi_tree))
    }

    /// The whole table as an indented outline, see [`node::outline`].
    pub fn outline(&self) -> Outcome<String, S> {
        Ok(node::outline(&self.nodes()?))
    }
}
