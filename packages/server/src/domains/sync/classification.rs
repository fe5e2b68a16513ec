//! Per-tick lifecycle classification.
//!
//! A transaction's state for one tick is derived from exactly two facts:
//! whether it appears in the current active snapshot and whether the cache
//! holds an entry for it. No other signal participates, which keeps the
//! state machine auditable without any I/O.

/// Lifecycle transition assigned to a transaction for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First time this transaction is observed active.
    New,
    /// Observed active before and still active.
    Ongoing,
    /// Tracked in the cache but gone from the active snapshot.
    Completed,
}

/// Classify one transaction for this tick.
///
/// Returns `None` for the remaining quadrant (absent from snapshot, absent
/// from cache): either already reconciled or never observed, nothing to do.
pub fn classify(in_snapshot: bool, in_cache: bool) -> Option<Classification> {
    match (in_snapshot, in_cache) {
        (true, false) => Some(Classification::New),
        (true, true) => Some(Classification::Ongoing),
        (false, true) => Some(Classification::Completed),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_member_without_cache_entry_is_new() {
        assert_eq!(classify(true, false), Some(Classification::New));
    }

    #[test]
    fn snapshot_member_with_cache_entry_is_ongoing() {
        assert_eq!(classify(true, true), Some(Classification::Ongoing));
    }

    #[test]
    fn cached_transaction_missing_from_snapshot_is_completed() {
        assert_eq!(classify(false, true), Some(Classification::Completed));
    }

    #[test]
    fn unknown_transaction_is_not_classified() {
        assert_eq!(classify(false, false), None);
    }
}
