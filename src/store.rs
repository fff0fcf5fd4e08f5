//! The storage contract the engine drives.
//!
//! The engine never iterates rows itself: it hands the store a [`Filter`]
//! and a list of [`Change`]s and lets the store apply them in one
//! set-based statement. Implementations typically translate filters into
//! `UPDATE ... WHERE ...` statements; [`MemoryStore`](crate::memory::MemoryStore)
//! evaluates them in memory.

use std::{fmt::Debug, hash::Hash};

use crate::{
    mutator::Change,
    node::NodeRecord,
    predicate::{Filter, Order},
};

/// Keys usable as node ids and tree ids.
pub trait NodeKey: Clone + Eq + Ord + Hash + Debug {}

impl<T: Clone + Eq + Ord + Hash + Debug> NodeKey for T {}

/// A table of [`NodeRecord`]s.
pub trait TreeStore {
    type Key: NodeKey;
    type Error: std::error::Error + 'static;

    /// Rows matching `filter`, sorted by `order` (all keys ascending).
    fn read(
        &self,
        filter: &Filter<Self::Key>,
        order: &[Order],
    ) -> Result<Vec<NodeRecord<Self::Key>>, Self::Error>;

    /// Applies `changes` to every row matching `filter`.
    ///
    /// The filter is evaluated against the values the rows had before the
    /// statement, as a single SQL `UPDATE` would. Returns the number of rows
    /// touched.
    fn bulk_update(
        &mut self,
        filter: &Filter<Self::Key>,
        changes: &[Change<Self::Key>],
    ) -> Result<usize, Self::Error>;

    /// Removes every row matching `filter`, returning how many were removed.
    fn bulk_delete(&mut self, filter: &Filter<Self::Key>) -> Result<usize, Self::Error>;

    /// Persists a new row and returns it as stored, with its key assigned.
    fn insert(
        &mut self,
        record: NodeRecord<Self::Key>,
    ) -> Result<NodeRecord<Self::Key>, Self::Error>;

    /// Runs `body` as one all-or-nothing unit.
    ///
    /// If `body` returns `Err`, every change it made must be rolled back and
    /// the error handed back inside `Ok`. The outer `Err` is reserved for
    /// failures of the unit itself (begin/commit/rollback).
    #[allow(clippy::type_complexity)]
    fn run_atomic<T, E>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<Result<T, E>, Self::Error>;

    /// The first row matching `filter` in `order`.
    fn read_one(
        &self,
        filter: &Filter<Self::Key>,
        order: &[Order],
    ) -> Result<Option<NodeRecord<Self::Key>>, Self::Error> {
        Ok(self.read(filter, order)?.into_iter().next())
    }

    /// The row with primary key `id`.
    fn get(&self, id: &Self::Key) -> Result<Option<NodeRecord<Self::Key>>, Self::Error> {
        self.read_one(&Filter::Id(id.clone()), Order::SCOPED)
    }

    fn exists(&self, filter: &Filter<Self::Key>) -> Result<bool, Self::Error> {
        Ok(self.read_one(filter, &[])?.is_some())
    }
}
