//! Last-observed progress per tracked transaction.
//!
//! The cache is volatile and exclusively owned by the reconciliation
//! worker; nothing else reads or writes it, so no locking is needed. After
//! a restart it starts empty, which means every open transaction is
//! reclassified as new on the first tick and its START notification may
//! repeat. That trade-off is accepted (availability over exactly-once).

use std::collections::HashMap;

/// What we last acted on for one tracked transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// True once a START notification has been attempted.
    pub start_notified: bool,
    /// Energy level at the last notification (start value until a progress
    /// notification is dispatched).
    pub last_notified_energy: f64,
}

/// Invariant: an entry exists iff the transaction was seen in some prior
/// active snapshot and has not yet been reconciled as completed. Entries
/// are removed exactly once, when the transaction leaves the snapshot.
#[derive(Debug, Default)]
pub struct TransactionStateCache {
    entries: HashMap<i32, CacheEntry>,
}

impl TransactionStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, transaction_pk: i32) -> Option<&CacheEntry> {
        self.entries.get(&transaction_pk)
    }

    pub fn contains(&self, transaction_pk: i32) -> bool {
        self.entries.contains_key(&transaction_pk)
    }

    pub fn insert(&mut self, transaction_pk: i32, entry: CacheEntry) {
        self.entries.insert(transaction_pk, entry);
    }

    pub fn set_last_notified_energy(&mut self, transaction_pk: i32, energy: f64) {
        if let Some(entry) = self.entries.get_mut(&transaction_pk) {
            entry.last_notified_energy = energy;
        }
    }

    pub fn remove(&mut self, transaction_pk: i32) -> Option<CacheEntry> {
        self.entries.remove(&transaction_pk)
    }

    /// Identities of every tracked transaction.
    pub fn tracked_ids(&self) -> Vec<i32> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
