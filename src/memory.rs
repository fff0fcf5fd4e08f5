//! An in-memory [`TreeStore`].
//!
//! Rows live in an [`IndexMap`] keyed by id. Physical order is insertion
//! order, disturbed by deletes (which swap-remove), so it generally differs
//! from tree order; reads sort explicitly. `run_atomic` snapshots the table
//! and restores it when the body fails.

use std::fmt::Debug;

use indexmap::IndexMap;
use itertools::Itertools;
use thiserror::Error;

use crate::{
    mutator::Change,
    node::NodeRecord,
    predicate::{Filter, Order},
    store::{NodeKey, TreeStore},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    #[error("Record has no primary key")]
    MissingKey,
    #[error("Duplicate primary key {0}")]
    DuplicateKey(String),
    #[error("Injected failure")]
    Injected,
}

#[derive(Debug, Clone)]
pub struct MemoryStore<K> {
    rows: IndexMap<K, NodeRecord<K>>,
    /// Number of statements to let through before failing, for rollback tests.
    fail_after: Option<usize>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        MemoryStore {
            rows: IndexMap::new(),
            fail_after: None,
        }
    }
}

impl<K: NodeKey> MemoryStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already numbered rows.
    pub fn from_records(
        records: impl IntoIterator<Item = NodeRecord<K>>,
    ) -> Result<Self, MemoryStoreError> {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in physical order.
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord<K>> {
        self.rows.values()
    }

    /// Makes the statement after the next `statements` ones fail.
    pub fn fail_after(&mut self, statements: usize) {
        self.fail_after = Some(statements);
    }

    fn tick(&mut self) -> Result<(), MemoryStoreError> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                Err(MemoryStoreError::Injected)
            }
            Some(n) => {
                self.fail_after = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<K: NodeKey> TreeStore for MemoryStore<K> {
    type Key = K;
    type Error = MemoryStoreError;

    fn read(
        &self,
        filter: &Filter<K>,
        order: &[Order],
    ) -> Result<Vec<NodeRecord<K>>, Self::Error> {
        Ok(self
            .rows
            .values()
            .filter(|r| filter.matches(r))
            .sorted_by(|a, b| {
                order
                    .iter()
                    .map(|o| match o {
                        Order::Tree => a.tree.cmp(&b.tree),
                        Order::Left => a.left.cmp(&b.left),
                    })
                    .find(|c| c.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
            .collect())
    }

    fn bulk_update(
        &mut self,
        filter: &Filter<K>,
        changes: &[Change<K>],
    ) -> Result<usize, Self::Error> {
        self.tick()?;
        // A row's filter only reads that row, so checking and updating in one
        // pass sees pre-statement values.
        let mut n = 0;
        for record in self.rows.values_mut().filter(|r| filter.matches(r)) {
            for change in changes {
                change.apply(record);
            }
            n += 1;
        }
        Ok(n)
    }

    fn bulk_delete(&mut self, filter: &Filter<K>) -> Result<usize, Self::Error> {
        self.tick()?;
        let doomed = self
            .rows
            .iter()
            .filter(|(_, r)| filter.matches(r))
            .map(|(k, _)| k.clone())
            .collect_vec();
        for key in &doomed {
            self.rows.swap_remove(key);
        }
        Ok(doomed.len())
    }

    fn insert(&mut self, record: NodeRecord<K>) -> Result<NodeRecord<K>, Self::Error> {
        let key = record.id.clone().ok_or(MemoryStoreError::MissingKey)?;
        if self.rows.contains_key(&key) {
            return Err(MemoryStoreError::DuplicateKey(format!("{key:?}")));
        }
        self.rows.insert(key, record.clone());
        Ok(record)
    }

    fn run_atomic<T, E>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<Result<T, E>, Self::Error> {
        let snapshot = self.rows.clone();
        let result = body(self);
        if result.is_err() {
            self.rows = snapshot;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        node::Bounds,
        predicate::{Column, Scope},
    };

    fn store() -> MemoryStore<&'static str> {
        MemoryStore::from_records([
            NodeRecord::new("b").with_bounds(Bounds::leaf(4, 1)),
            NodeRecord::new("r").with_bounds(Bounds {
                left: 1,
                right: 6,
                depth: 0,
            }),
            NodeRecord::new("a").with_bounds(Bounds::leaf(2, 1)),
        ])
        .unwrap()
    }

    #[test]
    fn reads_sort_by_left() {
        let store = store();
        let ids = store
            .read(&Filter::All, Order::SCOPED)
            .unwrap()
            .into_iter()
            .map(|r| r.id.unwrap())
            .collect_vec();
        assert_eq!(ids, ["r", "a", "b"]);
    }

    #[test]
    fn update_filters_on_old_values() {
        let mut store = store();
        // Shifting lefts >= 2 by 2 must not chase rows it already moved.
        let n = store
            .bulk_update(
                &Filter::at_least(Column::Left, 2, &Scope::Global),
                &[Change::add(Column::Left, 2)],
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.get(&"a").unwrap().unwrap().left, 4);
        assert_eq!(store.get(&"b").unwrap().unwrap().left, 6);
    }

    #[test]
    fn rejects_duplicate_and_missing_keys() {
        let mut store = store();
        assert_eq!(
            store.insert(NodeRecord::new("a")),
            Err(MemoryStoreError::DuplicateKey("\"a\"".into()))
        );
        assert_eq!(
            store.insert(NodeRecord::unkeyed()),
            Err(MemoryStoreError::MissingKey)
        );
    }

    #[test]
    fn atomic_unit_rolls_back() {
        let mut store = store();
        let result: Result<(), MemoryStoreError> = store
            .run_atomic(|s| {
                s.bulk_delete(&Filter::Id("a"))?;
                s.fail_after(0);
                s.bulk_delete(&Filter::Id("b"))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(result, Err(MemoryStoreError::Injected));
        assert_eq!(store.len(), 3);
        assert!(store.get(&"a").unwrap().is_some());
    }
}
