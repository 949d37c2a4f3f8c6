//! Order storage
//!
//! Synchronous contract the persisted cart variant runs on. The production
//! relational backend lives outside this crate; [`MemoryOrderStore`] is the
//! bundled reference implementation used by tests.

use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::{
    lines::{Line, LineKey},
    vouchers::Discount,
};

/// Errors surfaced by an order storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The order record does not exist.
    #[error("order {0} not found")]
    OrderNotFound(u64),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage primitives for persisted orders, scoped per order id.
///
/// Line writes upsert on [`LineKey`]; backends must enforce uniqueness of
/// `(order, item kind, item id, canonical options)` so that concurrent
/// writers race into a last-writer-wins update rather than duplicate lines.
pub trait OrderStore {
    /// Creates the order record if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot create the record.
    fn ensure_order(&mut self, order: u64) -> Result<(), StorageError>;

    /// Whether the order record exists.
    fn order_exists(&self, order: u64) -> bool;

    /// All lines of the order, in stable row order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn lines(&self, order: u64) -> Result<Vec<Line>, StorageError>;

    /// Inserts the line, or replaces the line with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn upsert_line(&mut self, order: u64, line: Line) -> Result<(), StorageError>;

    /// Deletes the line with the given key; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn delete_line(&mut self, order: u64, key: &LineKey) -> Result<bool, StorageError>;

    /// Deletes all lines of the order; returns how many were deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn delete_lines(&mut self, order: u64) -> Result<usize, StorageError>;

    /// Deletes the order record together with its lines and discounts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn delete_order(&mut self, order: u64) -> Result<(), StorageError>;

    /// The order's opaque shipping options payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn shipping_options(&self, order: u64) -> Result<Option<Value>, StorageError>;

    /// Replaces the order's shipping options payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn set_shipping_options(
        &mut self,
        order: u64,
        options: Option<Value>,
    ) -> Result<(), StorageError>;

    /// Stored discount rows, in stable row order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn discounts(&self, order: u64) -> Result<Vec<Discount>, StorageError>;

    /// Replaces all discount rows of the order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OrderNotFound`] if the record is gone.
    fn replace_discounts(
        &mut self,
        order: u64,
        discounts: Vec<Discount>,
    ) -> Result<(), StorageError>;

    /// Runs `work` atomically against this store.
    ///
    /// On `Err`, every change made inside `work` is rolled back; the order
    /// must never become visible with a partial line set.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `work` after rolling back.
    fn transaction(
        &mut self,
        order: u64,
        work: &mut dyn FnMut(&mut dyn OrderStore) -> Result<(), StorageError>,
    ) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct OrderRecord {
    lines: Vec<Line>,
    shipping_options: Option<Value>,
    discounts: Vec<Discount>,
}

/// In-memory reference backend with snapshot-restore transactions.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrderStore {
    orders: FxHashMap<u64, OrderRecord>,
}

impl MemoryOrderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, order: u64) -> Result<&OrderRecord, StorageError> {
        self.orders
            .get(&order)
            .ok_or(StorageError::OrderNotFound(order))
    }

    fn record_mut(&mut self, order: u64) -> Result<&mut OrderRecord, StorageError> {
        self.orders
            .get_mut(&order)
            .ok_or(StorageError::OrderNotFound(order))
    }
}

impl OrderStore for MemoryOrderStore {
    fn ensure_order(&mut self, order: u64) -> Result<(), StorageError> {
        self.orders.entry(order).or_default();
        Ok(())
    }

    fn order_exists(&self, order: u64) -> bool {
        self.orders.contains_key(&order)
    }

    fn lines(&self, order: u64) -> Result<Vec<Line>, StorageError> {
        Ok(self.record(order)?.lines.clone())
    }

    fn upsert_line(&mut self, order: u64, line: Line) -> Result<(), StorageError> {
        let record = self.record_mut(order)?;
        let key = line.key();

        match record.lines.iter_mut().find(|existing| existing.matches(&key)) {
            Some(existing) => *existing = line,
            None => record.lines.push(line),
        }

        Ok(())
    }

    fn delete_line(&mut self, order: u64, key: &LineKey) -> Result<bool, StorageError> {
        let record = self.record_mut(order)?;
        let before = record.lines.len();

        record.lines.retain(|line| !line.matches(key));

        Ok(record.lines.len() < before)
    }

    fn delete_lines(&mut self, order: u64) -> Result<usize, StorageError> {
        let record = self.record_mut(order)?;
        let deleted = record.lines.len();

        record.lines.clear();

        Ok(deleted)
    }

    fn delete_order(&mut self, order: u64) -> Result<(), StorageError> {
        match self.orders.remove(&order) {
            Some(_) => Ok(()),
            None => Err(StorageError::OrderNotFound(order)),
        }
    }

    fn shipping_options(&self, order: u64) -> Result<Option<Value>, StorageError> {
        Ok(self.record(order)?.shipping_options.clone())
    }

    fn set_shipping_options(
        &mut self,
        order: u64,
        options: Option<Value>,
    ) -> Result<(), StorageError> {
        self.record_mut(order)?.shipping_options = options;
        Ok(())
    }

    fn discounts(&self, order: u64) -> Result<Vec<Discount>, StorageError> {
        Ok(self.record(order)?.discounts.clone())
    }

    fn replace_discounts(
        &mut self,
        order: u64,
        discounts: Vec<Discount>,
    ) -> Result<(), StorageError> {
        self.record_mut(order)?.discounts = discounts;
        Ok(())
    }

    fn transaction(
        &mut self,
        order: u64,
        work: &mut dyn FnMut(&mut dyn OrderStore) -> Result<(), StorageError>,
    ) -> Result<(), StorageError> {
        // Snapshot-restore stands in for a database transaction.
        let snapshot = self.orders.get(&order).cloned();

        match work(self) {
            Ok(()) => Ok(()),
            Err(err) => {
                match snapshot {
                    Some(record) => {
                        self.orders.insert(order, record);
                    }
                    None => {
                        self.orders.remove(&order);
                    }
                }

                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{items::ItemRef, options::NormalizedOptions};

    use super::*;

    fn line(id: u64, quantity: u32) -> Line {
        Line::new(
            ItemRef::new("catalogue.product", id),
            NormalizedOptions::default(),
            quantity,
        )
    }

    #[test]
    fn ensure_order_is_idempotent() -> TestResult {
        let mut store = MemoryOrderStore::new();

        store.ensure_order(1)?;
        store.upsert_line(1, line(1, 2))?;
        store.ensure_order(1)?;

        assert_eq!(store.lines(1)?.len(), 1);

        Ok(())
    }

    #[test]
    fn upsert_replaces_the_line_with_the_same_key() -> TestResult {
        let mut store = MemoryOrderStore::new();
        store.ensure_order(1)?;

        store.upsert_line(1, line(1, 2))?;
        store.upsert_line(1, line(1, 5))?;

        let lines = store.lines(1)?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().map(Line::quantity), Some(5));

        Ok(())
    }

    #[test]
    fn lines_keep_insertion_order() -> TestResult {
        let mut store = MemoryOrderStore::new();
        store.ensure_order(1)?;

        store.upsert_line(1, line(2, 1))?;
        store.upsert_line(1, line(1, 1))?;

        let ids: Vec<u64> = store.lines(1)?.iter().map(|l| l.item().id()).collect();
        assert_eq!(ids, vec![2, 1]);

        Ok(())
    }

    #[test]
    fn delete_line_reports_whether_it_existed() -> TestResult {
        let mut store = MemoryOrderStore::new();
        store.ensure_order(1)?;
        store.upsert_line(1, line(1, 2))?;

        assert!(store.delete_line(1, &line(1, 2).key())?);
        assert!(!store.delete_line(1, &line(1, 2).key())?);

        Ok(())
    }

    #[test]
    fn delete_order_removes_the_record() -> TestResult {
        let mut store = MemoryOrderStore::new();
        store.ensure_order(1)?;

        store.delete_order(1)?;

        assert!(!store.order_exists(1));
        assert!(matches!(
            store.lines(1),
            Err(StorageError::OrderNotFound(1))
        ));

        Ok(())
    }

    #[test]
    fn missing_order_is_reported() {
        let store = MemoryOrderStore::new();

        assert!(matches!(
            store.lines(42),
            Err(StorageError::OrderNotFound(42))
        ));
    }

    #[test]
    fn failed_transaction_rolls_back() -> TestResult {
        let mut store = MemoryOrderStore::new();
        store.ensure_order(1)?;
        store.upsert_line(1, line(1, 2))?;

        let result = store.transaction(1, &mut |store| {
            store.delete_lines(1)?;
            store.upsert_line(1, line(2, 9))?;
            Err(StorageError::Backend("boom".into()))
        });

        assert!(result.is_err(), "transaction should propagate the failure");

        let lines = store.lines(1)?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().map(|l| l.item().id()), Some(1));

        Ok(())
    }

    #[test]
    fn committed_transaction_keeps_changes() -> TestResult {
        let mut store = MemoryOrderStore::new();
        store.ensure_order(1)?;

        store.transaction(1, &mut |store| {
            store.upsert_line(1, line(1, 2))?;
            store.upsert_line(1, line(2, 3))?;
            Ok(())
        })?;

        assert_eq!(store.lines(1)?.len(), 2);

        Ok(())
    }
}
