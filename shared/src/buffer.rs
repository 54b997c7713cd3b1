//! Pending inventory edits
//!
//! An [`EditBuffer`] holds the uncommitted field edits of one [`DayKey`] and
//! mirrors them into a [`KeyValueStore`] after every change, so a reload
//! picks them up again. Entries leave the buffer on cancel or after the
//! backend has accepted them.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{BulkUpsertItem, BulkUpsertRequest, InventoryRecord};
use crate::types::{DayKey, ProductId};
use crate::validation::coerce_quantity;

/// Durable string key-value storage (browser `localStorage`, a file, memory)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory store, used in tests and when no durable storage exists
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key)
    }
}

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Persisted edits for {key} are unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Editable fields of an inventory row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EditField {
    Opening,
    ReceivedQty,
    ManualClosing,
}

impl FromStr for EditField {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opening" => Ok(EditField::Opening),
            "receivedQty" | "received_qty" => Ok(EditField::ReceivedQty),
            "manualClosing" | "manual_closing" => Ok(EditField::ManualClosing),
            _ => Err("Field is not editable"),
        }
    }
}

/// Uncommitted values for one row
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingEdit {
    pub opening: i64,
    pub received_qty: i64,
    pub manual_closing: i64,
}

impl PendingEdit {
    /// Seed from the row as currently shown, with missing values as 0
    pub fn seed(record: &InventoryRecord) -> Self {
        Self {
            opening: record.opening.unwrap_or(0),
            received_qty: record.received_qty.unwrap_or(0),
            manual_closing: record.manual_closing.unwrap_or(0),
        }
    }

    pub fn set(&mut self, field: EditField, value: i64) {
        match field {
            EditField::Opening => self.opening = value,
            EditField::ReceivedQty => self.received_qty = value,
            EditField::ManualClosing => self.manual_closing = value,
        }
    }

    pub fn get(&self, field: EditField) -> i64 {
        match field {
            EditField::Opening => self.opening,
            EditField::ReceivedQty => self.received_qty,
            EditField::ManualClosing => self.manual_closing,
        }
    }
}

/// Pending edits keyed by product, in a stable order
pub type EditEntries = BTreeMap<ProductId, PendingEdit>;

/// Pending edits of one bar-day, mirrored into a key-value store
#[derive(Debug)]
pub struct EditBuffer<S> {
    key: DayKey,
    entries: EditEntries,
    store: S,
}

impl<S: KeyValueStore> EditBuffer<S> {
    /// Empty buffer for `key`; call [`restore`](Self::restore) to pick up
    /// edits persisted by an earlier session.
    pub fn new(key: DayKey, store: S) -> Self {
        Self {
            key,
            entries: EditEntries::new(),
            store,
        }
    }

    /// Load the persisted edits of the current day, replacing memory.
    ///
    /// An unreadable payload is dropped from the store and the buffer stays
    /// empty.
    pub fn restore(&mut self) -> Result<usize, BufferError> {
        self.entries.clear();
        let storage_key = self.key.edits_key();
        let Some(raw) = self.store.get(&storage_key) else {
            return Ok(0);
        };
        match serde_json::from_str::<EditEntries>(&raw) {
            Ok(entries) => {
                self.entries = entries;
                Ok(self.entries.len())
            }
            Err(source) => {
                self.store.remove(&storage_key);
                Err(BufferError::Corrupt {
                    key: storage_key,
                    source,
                })
            }
        }
    }

    /// Move to another bar-day, leaving the current edits persisted under
    /// their own key.
    pub fn switch_day(&mut self, key: DayKey) -> Result<usize, BufferError> {
        self.persist();
        self.key = key;
        self.restore()
    }

    pub fn key(&self) -> &DayKey {
        &self.key
    }

    pub fn entries(&self) -> &EditEntries {
        &self.entries
    }

    pub fn get(&self, product_id: &ProductId) -> Option<&PendingEdit> {
        self.entries.get(product_id)
    }

    pub fn is_editing(&self, product_id: &ProductId) -> bool {
        self.entries.contains_key(product_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Begin editing a row. A row already being edited keeps its values.
    pub fn start_edit(&mut self, product_id: ProductId, record: &InventoryRecord) {
        self.entries
            .entry(product_id)
            .or_insert_with(|| PendingEdit::seed(record));
        self.persist();
    }

    /// Set one field from raw form input. Returns `false` when the row is not
    /// being edited.
    pub fn update_field(&mut self, product_id: &ProductId, field: EditField, raw: &str) -> bool {
        let Some(entry) = self.entries.get_mut(product_id) else {
            return false;
        };
        entry.set(field, coerce_quantity(raw));
        self.persist();
        true
    }

    /// Discard the edits of one row. Returns `false` when there were none.
    pub fn cancel_edit(&mut self, product_id: &ProductId) -> bool {
        let removed = self.entries.remove(product_id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Bulk-upsert request carrying every pending edit of the day
    pub fn bulk_request(&self) -> BulkUpsertRequest {
        BulkUpsertRequest {
            bar_id: self.key.bar_id.clone(),
            date: self.key.date,
            items: self
                .entries
                .iter()
                .map(|(product_id, edit)| BulkUpsertItem {
                    product_id: product_id.clone(),
                    opening: edit.opening,
                    received_qty: edit.received_qty,
                    manual_closing: edit.manual_closing,
                })
                .collect(),
        }
    }

    /// Drop the entries a successful save carried. Entries changed or added
    /// since `saved` was taken stay pending. Returns how many were dropped.
    pub fn settle(&mut self, saved: &EditEntries) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|product_id, edit| saved.get(product_id) != Some(edit));
        let settled = before - self.entries.len();
        if settled > 0 {
            self.persist();
        }
        settled
    }

    /// Drop every pending edit of the day, after a successful save
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn persist(&mut self) {
        let storage_key = self.key.edits_key();
        if self.entries.is_empty() {
            self.store.remove(&storage_key);
            return;
        }
        // A map of plain integers always serializes.
        if let Ok(raw) = serde_json::to_string(&self.entries) {
            self.store.set(&storage_key, &raw);
        }
    }
}

/// Counted cash of a bar-day, if one was recorded
pub fn load_cash_count<S: KeyValueStore + ?Sized>(store: &S, key: &DayKey) -> Option<Decimal> {
    store
        .get(&key.cash_count_key())
        .and_then(|raw| Decimal::from_str(raw.trim()).ok())
}

pub fn save_cash_count<S: KeyValueStore + ?Sized>(store: &mut S, key: &DayKey, amount: Decimal) {
    store.set(&key.cash_count_key(), &amount.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductRef;
    use chrono::NaiveDate;

    fn day_key(bar: &str, day: u32) -> DayKey {
        DayKey::new(bar, NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
    }

    fn record(id: &str, opening: i64, manual_closing: Option<i64>) -> InventoryRecord {
        InventoryRecord {
            product: Some(ProductRef::Id(ProductId::new(id))),
            opening: Some(opening),
            received_qty: Some(2),
            manual_closing,
            ..Default::default()
        }
    }

    #[test]
    fn test_start_edit_seeds_from_record() {
        let mut buffer = EditBuffer::new(day_key("bar", 2), MemoryStore::new());
        let pid = ProductId::new("p1");
        buffer.start_edit(pid.clone(), &record("p1", 10, None));

        assert_eq!(
            buffer.get(&pid),
            Some(&PendingEdit {
                opening: 10,
                received_qty: 2,
                manual_closing: 0,
            })
        );
    }

    #[test]
    fn test_start_edit_keeps_existing_values() {
        let mut buffer = EditBuffer::new(day_key("bar", 2), MemoryStore::new());
        let pid = ProductId::new("p1");
        buffer.start_edit(pid.clone(), &record("p1", 10, None));
        assert!(buffer.update_field(&pid, EditField::ManualClosing, "7"));
        buffer.start_edit(pid.clone(), &record("p1", 10, None));

        assert_eq!(buffer.get(&pid).unwrap().manual_closing, 7);
    }

    #[test]
    fn test_update_field_coerces_garbage_to_zero() {
        let mut buffer = EditBuffer::new(day_key("bar", 2), MemoryStore::new());
        let pid = ProductId::new("p1");
        buffer.start_edit(pid.clone(), &record("p1", 10, Some(4)));
        assert!(buffer.update_field(&pid, EditField::ManualClosing, "abc"));

        assert_eq!(buffer.get(&pid).unwrap().manual_closing, 0);
    }

    #[test]
    fn test_update_field_requires_editing_row() {
        let mut buffer = EditBuffer::new(day_key("bar", 2), MemoryStore::new());
        assert!(!buffer.update_field(&ProductId::new("p1"), EditField::Opening, "3"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_cancel_edit_discards_row() {
        let mut buffer = EditBuffer::new(day_key("bar", 2), MemoryStore::new());
        let pid = ProductId::new("p1");
        buffer.start_edit(pid.clone(), &record("p1", 10, None));

        assert!(buffer.cancel_edit(&pid));
        assert!(!buffer.cancel_edit(&pid));
        assert!(buffer.is_empty());
        assert!(buffer.store().is_empty());
    }

    #[test]
    fn test_edits_survive_reload() {
        let key = day_key("bar", 2);
        let mut buffer = EditBuffer::new(key.clone(), MemoryStore::new());
        let pid = ProductId::new("p1");
        buffer.start_edit(pid.clone(), &record("p1", 10, None));
        assert!(buffer.update_field(&pid, EditField::ReceivedQty, "9"));

        let store = buffer.store().clone();
        let mut reloaded = EditBuffer::new(key, store);
        assert_eq!(reloaded.restore().unwrap(), 1);
        assert_eq!(reloaded.get(&pid).unwrap().received_qty, 9);
    }

    #[test]
    fn test_edits_do_not_leak_across_days() {
        let mut buffer = EditBuffer::new(day_key("bar", 2), MemoryStore::new());
        let pid = ProductId::new("p1");
        buffer.start_edit(pid.clone(), &record("p1", 10, None));

        assert_eq!(buffer.switch_day(day_key("bar", 3)).unwrap(), 0);
        assert!(!buffer.is_editing(&pid));
        assert_eq!(buffer.switch_day(day_key("other", 2)).unwrap(), 0);

        assert_eq!(buffer.switch_day(day_key("bar", 2)).unwrap(), 1);
        assert!(buffer.is_editing(&pid));
    }

    #[test]
    fn test_corrupt_payload_is_dropped() {
        let key = day_key("bar", 2);
        let mut store = MemoryStore::new();
        store.set(&key.edits_key(), "{not json");
        let mut buffer = EditBuffer::new(key.clone(), store);

        assert!(matches!(buffer.restore(), Err(BufferError::Corrupt { .. })));
        assert!(buffer.is_empty());
        assert!(buffer.store().get(&key.edits_key()).is_none());
    }

    #[test]
    fn test_bulk_request_carries_all_entries() {
        let key = day_key("bar", 2);
        let mut buffer = EditBuffer::new(key.clone(), MemoryStore::new());
        buffer.start_edit(ProductId::new("b"), &record("b", 1, Some(1)));
        buffer.start_edit(ProductId::new("a"), &record("a", 5, Some(3)));

        let request = buffer.bulk_request();
        assert_eq!(request.bar_id, key.bar_id);
        assert_eq!(request.date, key.date);
        let ids: Vec<&str> = request.items.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(request.items[0].manual_closing, 3);
    }

    #[test]
    fn test_settle_keeps_edits_made_after_snapshot() {
        let key = day_key("bar", 2);
        let mut buffer = EditBuffer::new(key.clone(), MemoryStore::new());
        let (a, b, c) = (ProductId::new("a"), ProductId::new("b"), ProductId::new("c"));
        buffer.start_edit(a.clone(), &record("a", 1, Some(1)));
        buffer.start_edit(b.clone(), &record("b", 2, Some(2)));
        let sent = buffer.entries().clone();

        assert!(buffer.update_field(&b, EditField::ManualClosing, "9"));
        buffer.start_edit(c.clone(), &record("c", 3, None));

        assert_eq!(buffer.settle(&sent), 1);
        assert!(!buffer.is_editing(&a));
        assert_eq!(buffer.get(&b).unwrap().manual_closing, 9);
        assert!(buffer.is_editing(&c));

        let mut reloaded = EditBuffer::new(key, buffer.store().clone());
        assert_eq!(reloaded.restore().unwrap(), 2);
    }

    #[test]
    fn test_cash_count_round_trip() {
        let key = day_key("bar", 2);
        let mut store = MemoryStore::new();
        assert_eq!(load_cash_count(&store, &key), None);

        save_cash_count(&mut store, &key, Decimal::new(10050, 2));
        assert_eq!(load_cash_count(&store, &key), Some(Decimal::new(10050, 2)));
        assert_eq!(load_cash_count(&store, &day_key("bar", 3)), None);
    }

    #[test]
    fn test_edit_field_names() {
        assert_eq!("manualClosing".parse::<EditField>(), Ok(EditField::ManualClosing));
        assert_eq!("received_qty".parse::<EditField>(), Ok(EditField::ReceivedQty));
        assert!("salesQty".parse::<EditField>().is_err());
    }
}
