//! Interval predicates over the structural columns.
//!
//! Every read and every bulk write the engine issues selects its rows with a
//! [`Filter`]. Filters are plain data: the store either evaluates them
//! directly ([`Filter::matches`]) or translates them into its own query
//! language ([`Filter::render`] shows the SQL-like reading).
//!
//! Predicates that only make sense inside one tree take a [`Scope`]. In
//! multi-tree mode the scope conjoins a tree-id equality clause; leaving it
//! out would silently mix rows of unrelated trees.

use std::fmt::{self, Debug, Display};

use serde::{Deserialize, Serialize};

use crate::{
    config::ColumnNames,
    node::{Bounds, NodeRecord},
};

/// Integer-valued structural column.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Left,
    Right,
    Depth,
}

impl Column {
    pub fn get<K>(self, record: &NodeRecord<K>) -> i64 {
        match self {
            Column::Left => record.left,
            Column::Right => record.right,
            Column::Depth => record.depth,
        }
    }

    pub fn get_mut<K>(self, record: &mut NodeRecord<K>) -> &mut i64 {
        match self {
            Column::Left => &mut record.left,
            Column::Right => &mut record.right,
            Column::Depth => &mut record.depth,
        }
    }

    pub fn name(self, columns: &ColumnNames) -> &str {
        match self {
            Column::Left => &columns.left,
            Column::Right => &columns.right,
            Column::Depth => &columns.depth,
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// The set of rows a scoped predicate may touch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope<K> {
    /// The whole table (single-tree mode).
    Global,
    /// Rows whose tree column equals the given value.
    Tree(Option<K>),
}

impl<K: Clone> Scope<K> {
    /// The scope `node` lives in under the given mode.
    pub fn of(node: &NodeRecord<K>, multi_tree: bool) -> Self {
        if multi_tree {
            Scope::Tree(node.tree.clone())
        } else {
            Scope::Global
        }
    }

    fn clause(&self) -> Option<Filter<K>> {
        match self {
            Scope::Global => None,
            Scope::Tree(tree) => Some(Filter::in_tree(tree.clone())),
        }
    }
}

/// Sort key for reads. All keys sort ascending.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    Tree,
    Left,
}

impl Order {
    /// Ordering for reads confined to one tree.
    pub const SCOPED: &'static [Order] = &[Order::Left];
    /// Ordering for reads that may span several trees.
    pub const UNSCOPED: &'static [Order] = &[Order::Tree, Order::Left];

    pub fn for_reads(multi_tree: bool, scoped: bool) -> &'static [Order] {
        if multi_tree && !scoped {
            Self::UNSCOPED
        } else {
            Self::SCOPED
        }
    }
}

/// A boolean expression over `id`, `left`, `right`, `depth` and `tree`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Filter<K> {
    /// Every row.
    All,
    /// `column op value`
    Bound {
        column: Column,
        op: Comparison,
        value: i64,
    },
    /// `column op other + offset`
    Offset {
        column: Column,
        op: Comparison,
        other: Column,
        offset: i64,
    },
    /// `tree = value`, or `tree IS NULL` for `None`.
    Tree(Option<K>),
    /// `id = value`
    Id(K),
    And(Vec<Filter<K>>),
}

impl<K> Filter<K> {
    pub fn bound(column: Column, op: Comparison, value: i64) -> Self {
        Filter::Bound { column, op, value }
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    pub fn and(self, other: Filter<K>) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Filter::All => {}
                Filter::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Filter::All,
            1 => parts.pop().unwrap_or(Filter::All),
            _ => Filter::And(parts),
        }
    }

    pub fn in_tree(tree: Option<K>) -> Self {
        Filter::Tree(tree)
    }

    /// `right = left + 1`
    pub fn leaf() -> Self {
        Filter::Offset {
            column: Column::Right,
            op: Comparison::Eq,
            other: Column::Left,
            offset: 1,
        }
    }

    /// `left = 1`
    pub fn root() -> Self {
        Filter::bound(Column::Left, Comparison::Eq, 1)
    }

    /// `depth <= depth`
    pub fn depth_at_most(depth: i64) -> Self {
        Filter::bound(Column::Depth, Comparison::Le, depth)
    }

    /// `depth >= depth`
    pub fn depth_at_least(depth: i64) -> Self {
        Filter::bound(Column::Depth, Comparison::Ge, depth)
    }

    pub fn matches(&self, record: &NodeRecord<K>) -> bool
    where
        K: PartialEq,
    {
        match self {
            Filter::All => true,
            Filter::Bound { column, op, value } => op.holds(column.get(record), *value),
            Filter::Offset {
                column,
                op,
                other,
                offset,
            } => op.holds(column.get(record), other.get(record) + offset),
            Filter::Tree(tree) => record.tree == *tree,
            Filter::Id(id) => record.id.as_ref() == Some(id),
            Filter::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }

    /// Displays the filter as a SQL-like condition using `columns`.
    pub fn render<'a>(&'a self, columns: &'a ColumnNames) -> Rendered<'a, K> {
        Rendered {
            filter: self,
            columns,
        }
    }
}

impl<K: Clone> Filter<K> {
    /// Conjoins the scope's tree clause, if any.
    pub fn scoped(self, scope: &Scope<K>) -> Self {
        match scope.clause() {
            Some(clause) => self.and(clause),
            None => self,
        }
    }

    /// Rows strictly inside `(left, right)`.
    pub fn within(left: i64, right: i64, scope: &Scope<K>) -> Self {
        Filter::bound(Column::Left, Comparison::Gt, left)
            .and(Filter::bound(Column::Right, Comparison::Lt, right))
            .scoped(scope)
    }

    /// Rows inside `[left, right]`.
    pub fn within_inclusive(left: i64, right: i64, scope: &Scope<K>) -> Self {
        Filter::bound(Column::Left, Comparison::Ge, left)
            .and(Filter::bound(Column::Right, Comparison::Le, right))
            .scoped(scope)
    }

    /// Rows whose `column` is at least `value`.
    pub fn at_least(column: Column, value: i64, scope: &Scope<K>) -> Self {
        Filter::bound(column, Comparison::Ge, value).scoped(scope)
    }

    /// Strict ancestors of `node`, optionally at most `max_relative_depth` levels up.
    pub fn ancestors_of(node: &Bounds, max_relative_depth: Option<i64>, scope: &Scope<K>) -> Self {
        let filter = Filter::bound(Column::Left, Comparison::Lt, node.left)
            .and(Filter::bound(Column::Right, Comparison::Gt, node.right));
        let filter = match max_relative_depth {
            Some(n) => filter.and(Filter::depth_at_least(node.depth - n)),
            None => filter,
        };
        filter.scoped(scope)
    }

    /// Strict descendants of `node`, optionally at most `max_relative_depth` levels down.
    pub fn descendants_of(
        node: &Bounds,
        max_relative_depth: Option<i64>,
        scope: &Scope<K>,
    ) -> Self {
        let filter = Filter::within(node.left, node.right, scope);
        match max_relative_depth {
            Some(n) => filter.and(Filter::depth_at_most(node.depth + n)),
            None => filter,
        }
    }

    /// `node` and everything below it.
    pub fn subtree_of(node: &Bounds, scope: &Scope<K>) -> Self {
        Filter::within_inclusive(node.left, node.right, scope)
    }

    /// Leaves strictly below `node`.
    pub fn leaves_under(node: &Bounds, scope: &Scope<K>) -> Self {
        Filter::within(node.left, node.right, scope).and(Filter::leaf())
    }

    /// The sibling whose interval starts right after `node`'s.
    pub fn next_sibling_of(node: &Bounds, scope: &Scope<K>) -> Self {
        Filter::bound(Column::Left, Comparison::Eq, node.right + 1).scoped(scope)
    }

    /// The sibling whose interval ends right before `node`'s.
    pub fn previous_sibling_of(node: &Bounds, scope: &Scope<K>) -> Self {
        Filter::bound(Column::Right, Comparison::Eq, node.left - 1).scoped(scope)
    }

    /// Rows whose `column` must move when boundaries from `from` on shift.
    pub fn shift_from(column: Column, from: i64, scope: &Scope<K>) -> Self {
        Filter::at_least(column, from, scope)
    }

    /// The block relocated by a move inside one tree.
    pub fn subtree_move(left: i64, right: i64, scope: &Scope<K>) -> Self {
        Filter::within_inclusive(left, right, scope)
    }

    /// The block relocated out of `current_tree` by a cross-tree move or promotion.
    pub fn cross_tree_move(left: i64, right: i64, current_tree: Option<K>) -> Self {
        Filter::within_inclusive(left, right, &Scope::Tree(current_tree))
    }
}

/// Display adapter returned by [`Filter::render`].
pub struct Rendered<'a, K> {
    filter: &'a Filter<K>,
    columns: &'a ColumnNames,
}

impl<K: Debug> Rendered<'_, K> {
    fn write(&self, filter: &Filter<K>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.columns;
        match filter {
            Filter::All => write!(f, "TRUE"),
            Filter::Bound { column, op, value } => {
                write!(f, "{} {} {value}", column.name(names), op.symbol())
            }
            Filter::Offset {
                column,
                op,
                other,
                offset,
            } => {
                write!(f, "{} {} {}", column.name(names), op.symbol(), other.name(names))?;
                match offset {
                    0 => Ok(()),
                    o if *o > 0 => write!(f, " + {o}"),
                    o => write!(f, " - {}", -o),
                }
            }
            Filter::Tree(Some(tree)) => write!(f, "{} = {tree:?}", names.tree),
            Filter::Tree(None) => write!(f, "{} IS NULL", names.tree),
            Filter::Id(id) => write!(f, "{} = {id:?}", names.id),
            Filter::And(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    self.write(part, f)?;
                }
                Ok(())
            }
        }
    }
}

impl<K: Debug> Display for Rendered<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(self.filter, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn node(left: i64, right: i64, depth: i64) -> Bounds {
        Bounds { left, right, depth }
    }

    #[test]
    fn multi_tree_scope_adds_tree_clause() {
        let columns = ColumnNames::default();
        let b = node(2, 7, 1);

        let global: Filter<u32> = Filter::descendants_of(&b, None, &Scope::Global);
        let scoped: Filter<u32> = Filter::descendants_of(&b, None, &Scope::Tree(Some(4)));

        insta::assert_snapshot!(global.render(&columns), @"lft > 2 AND rgt < 7");
        insta::assert_snapshot!(scoped.render(&columns), @"lft > 2 AND rgt < 7 AND tree = 4");
    }

    #[test]
    fn relative_depth_limits() {
        let columns = ColumnNames::default();
        let b = node(4, 5, 3);

        let up: Filter<u32> = Filter::ancestors_of(&b, Some(1), &Scope::Global);
        let down: Filter<u32> = Filter::descendants_of(&b, Some(2), &Scope::Tree(None));

        insta::assert_snapshot!(up.render(&columns), @"lft < 4 AND rgt > 5 AND depth >= 2");
        insta::assert_snapshot!(down.render(&columns), @"lft > 4 AND rgt < 5 AND tree IS NULL AND depth <= 5");
    }

    #[test]
    fn leaf_and_sibling_predicates() {
        let columns = ColumnNames::default();
        let b = node(4, 9, 1);

        let leaves: Filter<&str> = Filter::leaves_under(&b, &Scope::Global);
        let next: Filter<&str> = Filter::next_sibling_of(&b, &Scope::Tree(Some("t")));
        let prev: Filter<&str> = Filter::previous_sibling_of(&b, &Scope::Global);

        insta::assert_snapshot!(leaves.render(&columns), @"lft > 4 AND rgt < 9 AND rgt = lft + 1");
        insta::assert_snapshot!(next.render(&columns), @r#"lft = 10 AND tree = "t""#);
        insta::assert_snapshot!(prev.render(&columns), @"rgt = 3");
    }

    #[test]
    fn evaluation() {
        let record = NodeRecord::new(1u32)
            .with_bounds(node(3, 4, 2))
            .with_tree(Some(9));

        assert!(Filter::<u32>::leaf().matches(&record));
        assert!(!Filter::<u32>::root().matches(&record));
        assert!(Filter::within(2, 5, &Scope::Tree(Some(9))).matches(&record));
        assert!(!Filter::within(2, 5, &Scope::Tree(Some(8))).matches(&record));
        assert!(!Filter::within(3, 5, &Scope::Global).matches(&record));
        assert!(Filter::within_inclusive(3, 4, &Scope::Global).matches(&record));
        assert!(Filter::Id(1).matches(&record));
        assert!(!Filter::Id(2).matches(&record));
        assert!(Filter::<u32>::All.matches(&record));
    }

    #[test]
    fn conjunction_flattens() {
        let f: Filter<u32> = Filter::All
            .and(Filter::root())
            .and(Filter::leaf().and(Filter::in_tree(Some(1))));
        match f {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert_eq!(Filter::<u32>::All.and(Filter::All), Filter::All);
    }

    #[test]
    fn read_order() {
        assert_eq!(Order::for_reads(true, false), &[Order::Tree, Order::Left]);
        assert_eq!(Order::for_reads(true, true), &[Order::Left]);
        assert_eq!(Order::for_reads(false, false), &[Order::Left]);
    }
}
