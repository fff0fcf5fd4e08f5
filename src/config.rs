//! Engine configuration.
//!
//! The engine itself only needs to know whether the table holds one tree or
//! many. Column names are carried along so that host adapters translating
//! [`Filter`](crate::predicate::Filter)s into their own query language, and
//! the trace output, agree on what the structural columns are called.

use serde::{Deserialize, Serialize};

/// Names of the structural columns in the host's table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub id: String,
    pub left: String,
    pub right: String,
    pub depth: String,
    pub tree: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "id".into(),
            left: "lft".into(),
            right: "rgt".into(),
            depth: "depth".into(),
            tree: "tree".into(),
        }
    }
}

/// Configuration of a [`NestedSet`](crate::engine::NestedSet).
///
/// # Example
///
/// ```rust
/// use nestset::config::NestedSetConfig;
///
/// let config = NestedSetConfig::multi_tree();
/// assert!(config.multi_tree);
/// assert_eq!(config.columns.left, "lft");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedSetConfig {
    /// When set, every row carries a tree id and each tree is an
    /// independent scope with its own root.
    pub multi_tree: bool,

    /// Column naming used when rendering predicates.
    pub columns: ColumnNames,
}

impl NestedSetConfig {
    /// One global tree per table.
    #[must_use]
    pub fn single_tree() -> Self {
        Self::default()
    }

    /// Many trees per table, scoped by the tree column.
    #[must_use]
    pub fn multi_tree() -> Self {
        Self {
            multi_tree: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: ColumnNames) -> Self {
        self.columns = columns;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = NestedSetConfig::single_tree();
        assert!(!config.multi_tree);
        assert_eq!(config.columns.right, "rgt");
        assert_eq!(config.columns.tree, "tree");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: NestedSetConfig =
            serde_json::from_str(r#"{ "multi_tree": true, "columns": { "left": "lo" } }"#)
                .unwrap();

        assert!(config.multi_tree);
        assert_eq!(config.columns.left, "lo");
        assert_eq!(config.columns.right, "rgt");
        assert_eq!(config.columns.depth, "depth");
    }

    #[test]
    fn round_trips_through_json() {
        let config = NestedSetConfig::multi_tree().with_columns(ColumnNames {
            tree: "root_id".into(),
            ..Default::default()
        });
        let json = serde_json::to_string(&config).unwrap();
        let back: NestedSetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
