// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. Classification
// (what counts as NEW/ONGOING/COMPLETED) lives in the sync domain and uses
// these traits.
//
// Naming convention: Base* for trait names (e.g. BaseChargePointStore)

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::charging::models::{ChargingUser, MeterSample, Transaction};
use crate::domains::notifications::models::NewTransactionEvent;

// =============================================================================
// Charge-Point Store Trait (Infrastructure - external SteVe database)
// =============================================================================

/// Point-in-time reads against the external charge-point store.
///
/// The store is read-only to us and exposes snapshots, not a change stream;
/// change detection is the sync domain's job.
#[async_trait]
pub trait BaseChargePointStore: Send + Sync {
    /// All currently open transactions (stop timestamp not yet recorded).
    async fn fetch_active_transactions(&self) -> Result<Vec<Transaction>>;

    /// A closed transaction by primary key. `None` when the stop record has
    /// not been committed yet (or was purged).
    async fn fetch_completed_transaction(&self, transaction_pk: i32) -> Result<Option<Transaction>>;

    /// Latest meter reading for a transaction, if any were reported.
    async fn fetch_latest_meter_sample(&self, transaction_pk: i32) -> Result<Option<MeterSample>>;

    /// Resolve the user behind a session tag. `Ok(None)` is a miss, not an
    /// error.
    async fn resolve_user(&self, id_tag: &str) -> Result<Option<ChargingUser>>;
}

// =============================================================================
// Push Notification Trait (Infrastructure)
// =============================================================================

/// Outcome of one notify call across a user's devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: u32,
    pub failed: u32,
}

impl DeliverySummary {
    pub fn confirmed(&self) -> bool {
        self.delivered > 0
    }
}

#[async_trait]
pub trait BasePushNotificationService: Send + Sync {
    /// Send a notification to every active device of a user.
    ///
    /// Per-device provider rejections are folded into the summary rather
    /// than returned as errors; an `Err` means the dispatch itself could
    /// not be attempted.
    async fn notify_user(&self, user_tag: &str, title: &str, body: &str)
        -> Result<DeliverySummary>;
}

// =============================================================================
// Event Journal Trait (Infrastructure - local audit store)
// =============================================================================

#[async_trait]
pub trait BaseEventJournal: Send + Sync {
    /// Append one START/STOP event. The journal is an audit aid; callers
    /// log and swallow failures.
    async fn append(&self, event: NewTransactionEvent) -> Result<()>;
}
