//! Error types.

use std::fmt::Debug;

use thiserror::Error;

/// Errors raised by engine operations.
///
/// Every variant except [`NestedSetError::Store`] is detected before the
/// store is touched, so a failed operation leaves the tree unchanged.
/// `E` is the error type of the underlying [`TreeStore`](crate::store::TreeStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NestedSetError<E> {
    #[error("Target node is not persisted")]
    InvalidTarget,
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("Can not move a node relative to itself")]
    NoOpMove,
    #[error("Can not move a node into its own subtree")]
    CycleDetected,
    #[error("Can not create more than one root in single-tree mode")]
    StructureConflict,
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    #[error("Node has no primary key to use as tree id")]
    MissingIdentity,
    #[error(transparent)]
    Store(E),
}

impl<E> NestedSetError<E> {
    /// True for the semantic errors raised during validation.
    pub fn is_validation(&self) -> bool {
        !matches!(self, NestedSetError::Store(_))
    }
}

pub type NestedResult<T, E> = Result<T, NestedSetError<E>>;

/// A broken tree invariant, as reported by [`verify`](crate::verify::verify).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation<K: Debug> {
    #[error("Tree {tree:?} has {count} roots")]
    RootCount { tree: Option<K>, count: usize },
    #[error("Node {id:?} has invalid interval [{left}, {right}]")]
    BadInterval {
        id: Option<K>,
        left: i64,
        right: i64,
    },
    #[error("Tree {tree:?} does not number its boundaries 1..={expected}")]
    NonContiguous { tree: Option<K>, expected: i64 },
    #[error("Node {id:?} overlaps its neighbour without being nested in it")]
    Overlap { id: Option<K> },
    #[error("Node {id:?} has depth {depth} but {ancestors} ancestors")]
    DepthMismatch {
        id: Option<K>,
        depth: i64,
        ancestors: i64,
    },
}
