//! The stored shape of a nested-set node.
//!
//! A [`NodeRecord`] is one row of the tree table: its identity, its
//! `(left, right)` interval, its depth and, when several trees share a table,
//! the id of the tree it belongs to. Containment of intervals is ancestry:
//! `b` lies under `a` exactly when `a.left < b.left` and `b.right < a.right`
//! inside the same tree.

use std::fmt::{self, Debug, Display};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The interval triple carried by every node.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i64,
    pub right: i64,
    pub depth: i64,
}

impl Bounds {
    /// The bounds of a tree consisting of a single root.
    pub const ROOT: Bounds = Bounds {
        left: 1,
        right: 2,
        depth: 0,
    };

    /// A leaf occupying `[left, left + 1]`.
    pub fn leaf(left: i64, depth: i64) -> Self {
        Bounds {
            left,
            right: left + 1,
            depth,
        }
    }

    /// Span consumed by the node and all its descendants.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    pub fn is_root(&self) -> bool {
        self.left == 1
    }

    pub fn is_leaf(&self) -> bool {
        self.right - self.left == 1
    }

    /// Strict interval containment, ignoring tree ids.
    pub fn contains(&self, other: &Bounds) -> bool {
        self.left < other.left && other.right < self.right
    }
}

impl Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}] d{}", self.left, self.right, self.depth)
    }
}

/// One row of a nested-set table.
///
/// `id` is `None` until the host has persisted the row. `tree` is only
/// meaningful in multi-tree mode, where it holds the id of the tree's root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRecord<K> {
    pub id: Option<K>,
    pub left: i64,
    pub right: i64,
    pub depth: i64,
    pub tree: Option<K>,
}

impl<K> NodeRecord<K> {
    /// A record that has not been placed in any tree yet.
    ///
    /// Its interval is filled in by the engine when it is inserted.
    pub fn new(id: K) -> Self {
        NodeRecord {
            id: Some(id),
            left: 0,
            right: 0,
            depth: 0,
            tree: None,
        }
    }

    /// A record without identity; the store assigns one on insert.
    pub fn unkeyed() -> Self {
        NodeRecord {
            id: None,
            left: 0,
            right: 0,
            depth: 0,
            tree: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.set_bounds(bounds);
        self
    }

    pub fn with_tree(mut self, tree: Option<K>) -> Self {
        self.tree = tree;
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            left: self.left,
            right: self.right,
            depth: self.depth,
        }
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.left = bounds.left;
        self.right = bounds.right;
        self.depth = bounds.depth;
    }

    pub fn id(&self) -> Option<&K> {
        self.id.as_ref()
    }

    /// True while the record has no primary key.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.bounds().is_root()
    }

    pub fn is_leaf(&self) -> bool {
        self.bounds().is_leaf()
    }

    pub fn width(&self) -> i64 {
        self.bounds().width()
    }
}

impl<K: PartialEq> NodeRecord<K> {
    /// True when `self` lies strictly inside `ancestor`'s interval in the same tree.
    pub fn is_descendant_of(&self, ancestor: &NodeRecord<K>) -> bool {
        ancestor.bounds().contains(&self.bounds()) && self.same_tree(ancestor)
    }

    /// True when `other` lies strictly inside `self`'s interval in the same tree.
    pub fn contains(&self, other: &NodeRecord<K>) -> bool {
        other.is_descendant_of(self)
    }

    pub fn same_tree(&self, other: &NodeRecord<K>) -> bool {
        self.tree == other.tree
    }

    /// Identity comparison; two unpersisted records are never the same node.
    pub fn same_node(&self, other: &NodeRecord<K>) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Renders records as an indented outline, one line per node.
///
/// Records are expected in `(tree, left)` order, as returned by the engine's
/// reads. Each line shows the id, the interval and the depth:
///
/// ```text
/// "root" [1, 6] d0
///   "a" [2, 3] d1
///   "b" [4, 5] d1
/// ```
pub fn outline<K: Debug>(records: &[NodeRecord<K>]) -> String {
    records
        .iter()
        .map(|r| {
            let indent = "  ".repeat(usize::try_from(r.depth).unwrap_or(0));
            match &r.id {
                Some(id) => format!("{indent}{id:?} {}", r.bounds()),
                None => format!("{indent}<new> {}", r.bounds()),
            }
        })
        .join("\n")
}
