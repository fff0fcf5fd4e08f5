//! Whole-table invariant checks.
//!
//! [`verify`] takes every row of a table (in any order) and checks, for each
//! tree scope, that the intervals form a well-formed nested set: a single
//! root, odd positive widths, boundaries numbered `1..=2n` without holes,
//! proper nesting and depths matching the number of enclosing intervals.

use ahash::AHashMap;
use itertools::Itertools;

use crate::{error::InvariantViolation, node::NodeRecord, store::NodeKey};

/// Checks every nested-set invariant over `records`.
///
/// In single-tree mode all rows form one scope; otherwise rows are grouped
/// by their tree column. Returns the first violation found, scanning scopes
/// in tree-id order.
pub fn verify<K: NodeKey>(
    records: &[NodeRecord<K>],
    multi_tree: bool,
) -> Result<(), InvariantViolation<K>> {
    let mut scopes: AHashMap<Option<K>, Vec<&NodeRecord<K>>> = AHashMap::new();
    for r in records {
        let scope = if multi_tree { r.tree.clone() } else { None };
        scopes.entry(scope).or_default().push(r);
    }

    for (tree, mut nodes) in scopes.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        nodes.sort_by_key(|r| r.left);
        verify_scope(tree, &nodes)?;
    }
    Ok(())
}

fn verify_scope<K: NodeKey>(
    tree: Option<K>,
    nodes: &[&NodeRecord<K>],
) -> Result<(), InvariantViolation<K>> {
    for r in nodes {
        let span = r.right - r.left;
        if span < 1 || span % 2 == 0 {
            return Err(InvariantViolation::BadInterval {
                id: r.id.clone(),
                left: r.left,
                right: r.right,
            });
        }
    }

    let roots = nodes.iter().filter(|r| r.is_root()).count();
    if roots != 1 {
        return Err(InvariantViolation::RootCount {
            tree,
            count: roots,
        });
    }

    let expected = 2 * i64::try_from(nodes.len()).unwrap_or(i64::MAX);
    let contiguous = nodes
        .iter()
        .flat_map(|r| [r.left, r.right])
        .sorted()
        .eq(1..=expected);
    if !contiguous {
        return Err(InvariantViolation::NonContiguous { tree, expected });
    }

    // Open intervals enclosing the current node, innermost last.
    let mut open: Vec<&NodeRecord<K>> = Vec::new();
    for r in nodes {
        while open.last().is_some_and(|top| top.right < r.left) {
            open.pop();
        }
        if let Some(parent) = open.last() {
            if r.right > parent.right {
                return Err(InvariantViolation::Overlap { id: r.id.clone() });
            }
        }
        let ancestors = i64::try_from(open.len()).unwrap_or(i64::MAX);
        if r.depth != ancestors {
            return Err(InvariantViolation::DepthMismatch {
                id: r.id.clone(),
                depth: r.depth,
                ancestors,
            });
        }
        open.push(r);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Bounds;

    fn rec(id: &'static str, left: i64, right: i64, depth: i64) -> NodeRecord<&'static str> {
        NodeRecord::new(id).with_bounds(Bounds { left, right, depth })
    }

    #[test]
    fn accepts_well_formed_tree() {
        let records = [
            rec("b", 4, 7, 1),
            rec("r", 1, 8, 0),
            rec("a", 2, 3, 1),
            rec("c", 5, 6, 2),
        ];
        assert_eq!(verify(&records, false), Ok(()));
    }

    #[test]
    fn reports_depth_mismatch() {
        let records = [rec("r", 1, 4, 0), rec("a", 2, 3, 2)];
        assert_eq!(
            verify(&records, false),
            Err(InvariantViolation::DepthMismatch {
                id: Some("a"),
                depth: 2,
                ancestors: 1
            })
        );
    }

    #[test]
    fn reports_holes_and_overlaps() {
        let holes = [rec("r", 1, 6, 0), rec("a", 2, 3, 1)];
        assert_eq!(
            verify(&holes, false),
            Err(InvariantViolation::NonContiguous {
                tree: None,
                expected: 4
            })
        );

        let overlap = [
            rec("r", 1, 8, 0),
            rec("a", 2, 5, 1),
            rec("b", 3, 6, 2),
            rec("c", 4, 7, 1),
        ];
        assert!(matches!(
            verify(&overlap, false),
            Err(InvariantViolation::BadInterval { .. } | InvariantViolation::Overlap { .. })
        ));
    }

    #[test]
    fn one_root_per_scope() {
        let t1 = rec("r1", 1, 2, 0).with_tree(Some("r1"));
        let t2 = rec("r2", 1, 2, 0).with_tree(Some("r2"));
        assert_eq!(verify(&[t1.clone(), t2.clone()], true), Ok(()));
        assert_eq!(
            verify(&[t1, t2], false),
            Err(InvariantViolation::RootCount {
                tree: None,
                count: 2
            })
        );
    }
}
