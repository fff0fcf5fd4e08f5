//! # Nestset
//!
//! Nestset maintains trees stored as flat records in the nested-set
//! encoding: every node carries a `(left, right)` interval and a depth, and
//! a node lies below another exactly when its interval nests inside the
//! other's. Subtree queries become single range scans; structural changes
//! become a handful of set-based renumbering statements.
//!
//! The crate does not own the table. It drives any [`store::TreeStore`]
//! (an SQL adapter, or the bundled [`memory::MemoryStore`]) through
//! [`engine::NestedSet`], which keeps the intervals consistent across
//! inserts, moves and deletes. Several independent trees may share one
//! table when [`config::NestedSetConfig::multi_tree`] is enabled.

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod mutator;
pub mod node;
pub mod position;
pub mod predicate;
pub mod store;
pub mod verify;

pub use config::NestedSetConfig;
pub use engine::NestedSet;
pub use error::{NestedResult, NestedSetError};
pub use node::{Bounds, NodeRecord};
pub use position::Placement;
pub use store::TreeStore;
