//! Per-launch record store
//!
//! Records are keyed by transaction identity, never by position, so the N
//! concurrent buy submissions can append in any order without clobbering
//! each other. Insertion order is kept separately for reporting.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use super::{TransactionRecord, TxState};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Notification pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordUpdate {
    pub record: TransactionRecord,
    /// `None` when the record was just created
    pub previous: Option<TxState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub pending: usize,
    pub confirmed: usize,
    pub failed: usize,
}

pub struct RecordStore {
    records: DashMap<String, TransactionRecord>,
    order: Mutex<Vec<String>>,
    updates: broadcast::Sender<RecordUpdate>,
}

impl RecordStore {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            records: DashMap::new(),
            order: Mutex::new(Vec::new()),
            updates,
        }
    }

    /// Add a record; returns `false` if one with the same key already exists
    pub fn insert(&self, record: TransactionRecord) -> bool {
        let update = match self.records.entry(record.key.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                self.order.lock().push(record.key.clone());
                slot.insert(record.clone());
                RecordUpdate {
                    record,
                    previous: None,
                }
            }
        };
        let _ = self.updates.send(update);
        true
    }

    /// Move a pending record to `to`
    ///
    /// Terminal records never change again, and a transition to the current
    /// state is not an update; both return `None` and notify nobody.
    pub fn transition(
        &self,
        key: &str,
        to: TxState,
        error: Option<String>,
    ) -> Option<RecordUpdate> {
        let update = {
            let mut entry = self.records.get_mut(key)?;
            if entry.state == to || entry.state.is_terminal() {
                return None;
            }
            let previous = entry.state;
            entry.state = to;
            entry.error = error;
            entry.updated_at = Utc::now();
            RecordUpdate {
                record: entry.clone(),
                previous: Some(previous),
            }
        };
        let _ = self.updates.send(update.clone());
        Some(update)
    }

    /// Tag records with the bundle id returned by the relay
    pub(crate) fn assign_bundle(&self, keys: &[String], bundle_id: &str) {
        for key in keys {
            if let Some(mut entry) = self.records.get_mut(key) {
                entry.bundle_id = Some(bundle_id.to_string());
            }
        }
    }

    /// Receive every insert and state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RecordUpdate> {
        self.updates.subscribe()
    }

    pub fn get(&self, key: &str) -> Option<TransactionRecord> {
        self.records.get(key).map(|r| r.clone())
    }

    /// All records in insertion order
    pub fn snapshot(&self) -> Vec<TransactionRecord> {
        let order = self.order.lock().clone();
        order
            .iter()
            .filter_map(|key| self.records.get(key).map(|r| r.clone()))
            .collect()
    }

    pub fn pending_keys(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.state == TxState::Pending)
            .map(|r| r.key)
            .collect()
    }

    pub fn counts(&self) -> RecordCounts {
        let mut counts = RecordCounts::default();
        for record in self.records.iter() {
            match record.state {
                TxState::Pending => counts.pending += 1,
                TxState::Confirmed => counts.confirmed += 1,
                TxState::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
