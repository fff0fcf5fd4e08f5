//! Where a placed node goes.
//!
//! A [`Placement`] names how a node is positioned relative to a reference
//! node. Resolving it against the reference's current bounds yields the
//! boundary value at which the node's interval will start and the depth
//! difference to the reference.

use serde::{Deserialize, Serialize};

use crate::node::NodeRecord;

/// How a node is placed, carrying its reference node `R`.
///
/// The engine's public API takes `Placement<&NodeRecord<K>>`; once the
/// reference has been re-read from the store the placement is resolved with
/// [`Placement::resolve`].
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement<R> {
    /// Start a new tree.
    MakeRoot,
    /// Become the first child of the reference.
    PrependTo(R),
    /// Become the last child of the reference.
    AppendTo(R),
    /// Become the sibling right before the reference.
    InsertBefore(R),
    /// Become the sibling right after the reference.
    InsertAfter(R),
}

impl<R> Placement<R> {
    pub fn reference(&self) -> Option<&R> {
        match self {
            Placement::MakeRoot => None,
            Placement::PrependTo(r)
            | Placement::AppendTo(r)
            | Placement::InsertBefore(r)
            | Placement::InsertAfter(r) => Some(r),
        }
    }

    pub fn as_ref(&self) -> Placement<&R> {
        self.map_ref(|r| r)
    }

    fn map_ref<'a, U>(&'a self, f: impl FnOnce(&'a R) -> U) -> Placement<U> {
        match self {
            Placement::MakeRoot => Placement::MakeRoot,
            Placement::PrependTo(r) => Placement::PrependTo(f(r)),
            Placement::AppendTo(r) => Placement::AppendTo(f(r)),
            Placement::InsertBefore(r) => Placement::InsertBefore(f(r)),
            Placement::InsertAfter(r) => Placement::InsertAfter(f(r)),
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(R) -> Result<U, E>) -> Result<Placement<U>, E> {
        Ok(match self {
            Placement::MakeRoot => Placement::MakeRoot,
            Placement::PrependTo(r) => Placement::PrependTo(f(r)?),
            Placement::AppendTo(r) => Placement::AppendTo(f(r)?),
            Placement::InsertBefore(r) => Placement::InsertBefore(f(r)?),
            Placement::InsertAfter(r) => Placement::InsertAfter(f(r)?),
        })
    }

    /// True for the placements that make the node a sibling of the reference.
    pub fn is_sibling(&self) -> bool {
        matches!(self, Placement::InsertBefore(_) | Placement::InsertAfter(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Placement::MakeRoot => "make-root",
            Placement::PrependTo(_) => "prepend-to",
            Placement::AppendTo(_) => "append-to",
            Placement::InsertBefore(_) => "insert-before",
            Placement::InsertAfter(_) => "insert-after",
        }
    }
}

/// Every structural operation the engine performs on a node.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation<R> {
    Place(Placement<R>),
    DeleteSingle,
    DeleteWithSubtree,
}

impl<R> From<Placement<R>> for Operation<R> {
    fn from(placement: Placement<R>) -> Self {
        Operation::Place(placement)
    }
}

impl<R> Operation<R> {
    pub fn placement(&self) -> Option<&Placement<R>> {
        match self {
            Operation::Place(p) => Some(p),
            Operation::DeleteSingle | Operation::DeleteWithSubtree => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Place(p) => p.name(),
            Operation::DeleteSingle => "delete-single",
            Operation::DeleteWithSubtree => "delete-with-subtree",
        }
    }
}

/// The outcome of resolving a placement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Position<K> {
    /// A fresh tree scope whose root starts at `left = 1`.
    NewRoot,
    /// A slot inside the reference's tree.
    Relative {
        /// Boundary value the placed interval starts at.
        target: i64,
        /// Depth of the placed node relative to the reference.
        depth_delta: i64,
        reference_depth: i64,
        /// Tree id of the reference.
        tree: Option<K>,
    },
}

impl<K> Position<K> {
    /// Absolute depth of the placed node.
    pub fn depth(&self) -> i64 {
        match self {
            Position::NewRoot => 0,
            Position::Relative {
                depth_delta,
                reference_depth,
                ..
            } => reference_depth + depth_delta,
        }
    }
}

impl<K: Clone> Placement<&NodeRecord<K>> {
    /// Computes the insertion point relative to the reference's current bounds.
    pub fn resolve(&self) -> Position<K> {
        let (reference, target, depth_delta) = match *self {
            Placement::MakeRoot => return Position::NewRoot,
            Placement::PrependTo(r) => (r, r.left + 1, 1),
            Placement::AppendTo(r) => (r, r.right, 1),
            Placement::InsertBefore(r) => (r, r.left, 0),
            Placement::InsertAfter(r) => (r, r.right + 1, 0),
        };
        Position::Relative {
            target,
            depth_delta,
            reference_depth: reference.depth,
            tree: reference.tree.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Bounds;

    fn reference() -> NodeRecord<u32> {
        NodeRecord::new(7)
            .with_bounds(Bounds {
                left: 4,
                right: 9,
                depth: 2,
            })
            .with_tree(Some(1))
    }

    fn target_and_delta(p: Placement<&NodeRecord<u32>>) -> (i64, i64) {
        match p.resolve() {
            Position::Relative {
                target,
                depth_delta,
                ..
            } => (target, depth_delta),
            Position::NewRoot => panic!("expected a relative position"),
        }
    }

    #[test]
    fn resolves_each_placement() {
        let r = reference();
        assert_eq!(target_and_delta(Placement::AppendTo(&r)), (9, 1));
        assert_eq!(target_and_delta(Placement::PrependTo(&r)), (5, 1));
        assert_eq!(target_and_delta(Placement::InsertAfter(&r)), (10, 0));
        assert_eq!(target_and_delta(Placement::InsertBefore(&r)), (4, 0));
        assert_eq!(Placement::<&NodeRecord<u32>>::MakeRoot.resolve(), Position::NewRoot);
    }

    #[test]
    fn carries_reference_depth_and_tree() {
        let r = reference();
        let position = Placement::AppendTo(&r).resolve();
        assert_eq!(position.depth(), 3);
        match position {
            Position::Relative {
                reference_depth,
                tree,
                ..
            } => {
                assert_eq!(reference_depth, 2);
                assert_eq!(tree, Some(1));
            }
            Position::NewRoot => panic!("expected a relative position"),
        }
        assert_eq!(Placement::InsertBefore(&r).resolve().depth(), 2);
    }

    #[test]
    fn mapping_keeps_the_kind() {
        let p = Placement::InsertAfter(3)
            .try_map(|x| Ok::<_, ()>(x * 2))
            .unwrap();
        assert_eq!(p, Placement::InsertAfter(6));
        assert!(p.is_sibling());
        assert_eq!(p.reference(), Some(&6));

        let failed: Result<Placement<u8>, &str> = Placement::AppendTo(1).try_map(|_| Err("no"));
        assert_eq!(failed, Err("no"));

        let op: Operation<u8> = Placement::MakeRoot.into();
        assert_eq!(op.name(), "make-root");
        assert_eq!(op.placement(), Some(&Placement::MakeRoot));
        assert_eq!(Operation::<u8>::DeleteSingle.placement(), None);
    }
}
