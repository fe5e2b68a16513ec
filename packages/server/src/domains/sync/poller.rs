//! The reconciliation loop.
//!
//! A single worker task ticks on a fixed interval and runs one full
//! poll-classify-act pass per tick:
//!
//! ```text
//! Scheduler (every POLLING_INTERVAL_MS)
//!     │
//!     └─► fetch_active_transactions()
//!             ├─► NEW:       notify START, journal START, create cache entry
//!             ├─► ONGOING:   latest meter sample; notify progress past threshold
//!             └─► COMPLETED: fetch stop record, notify STOP, journal STOP,
//!                            drop cache entry
//! ```
//!
//! Ticks never overlap: the tick body runs inline in the select loop, so a
//! new tick cannot start before the previous pass finishes. The cache is
//! owned by the worker and only ever touched between awaits on that one
//! task.
//!
//! Failure rules (per transaction, per tick):
//! - snapshot fetch failure aborts the whole tick with zero cache mutation;
//! - a store failure while classifying one transaction leaves that
//!   transaction's cache untouched and moves on to the next;
//! - dispatch and journal failures are logged and swallowed, the cache
//!   still advances (at-most-once dispatch, not guaranteed delivery).

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::energy;
use crate::domains::charging::models::Transaction;
use crate::domains::notifications::models::{EventKind, NewTransactionEvent};
use crate::domains::sync::cache::{CacheEntry, TransactionStateCache};
use crate::domains::sync::classification::{classify, Classification};
use crate::kernel::{BaseChargePointStore, BaseEventJournal, BasePushNotificationService};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Tick cadence.
    pub poll_interval: Duration,
    /// Minimum energy delta (raw meter units) since the last notification
    /// before another progress notification fires.
    pub progress_threshold: f64,
    /// Upper bound on every store query, dispatch, and journal call.
    pub call_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            progress_threshold: 5.0,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Operational snapshot of the scheduler, served by the API.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub active: bool,
    pub cached_transactions: usize,
    pub interval_ms: u64,
}

/// Bound a collaborator call; a timeout is indistinguishable from a failure.
async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("call timed out after {limit:?}"))?
}

/// One poll-classify-act worker. Owns the cache outright; nothing else may
/// read or mutate it.
pub struct Reconciler {
    store: Arc<dyn BaseChargePointStore>,
    push: Arc<dyn BasePushNotificationService>,
    journal: Arc<dyn BaseEventJournal>,
    config: SyncConfig,
    cache: TransactionStateCache,
    cached_count: Arc<AtomicUsize>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn BaseChargePointStore>,
        push: Arc<dyn BasePushNotificationService>,
        journal: Arc<dyn BaseEventJournal>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            push,
            journal,
            config,
            cache: TransactionStateCache::new(),
            cached_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn cached_transactions(&self) -> usize {
        self.cache.len()
    }

    /// Run ticks until cancelled. An in-flight tick always finishes before
    /// the loop exits; aborting mid-tick could leave a transaction with a
    /// notification sent but no cache entry, duplicating it next tick.
    async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("transaction polling stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.run_tick().await;
                }
            }
        }
    }

    /// One full poll-classify-act pass.
    pub async fn run_tick(&mut self) {
        let snapshot = match bounded(
            self.config.call_timeout,
            self.store.fetch_active_transactions(),
        )
        .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                // No snapshot, no classification: the cache stays exactly as
                // it was and the next scheduled tick starts from there.
                warn!(error = %e, "skipping tick: failed to fetch active transactions");
                return;
            }
        };

        let active_ids: HashSet<i32> = snapshot.iter().map(|t| t.transaction_pk).collect();

        for transaction in &snapshot {
            let pk = transaction.transaction_pk;
            match classify(true, self.cache.contains(pk)) {
                Some(Classification::New) => {
                    if let Err(e) = self.handle_new(transaction).await {
                        warn!(transaction_pk = pk, error = %e, "failed to process new transaction");
                    }
                }
                Some(Classification::Ongoing) => {
                    if let Err(e) = self.handle_ongoing(transaction).await {
                        warn!(transaction_pk = pk, error = %e, "failed to process ongoing transaction");
                    }
                }
                _ => unreachable!("snapshot members are new or ongoing"),
            }
        }

        let departed: Vec<i32> = self
            .cache
            .tracked_ids()
            .into_iter()
            .filter(|pk| !active_ids.contains(pk))
            .collect();

        for pk in departed {
            debug_assert_eq!(
                classify(false, self.cache.contains(pk)),
                Some(Classification::Completed)
            );
            match self.handle_completed(pk).await {
                // Removed exactly once, whether or not a stop record was
                // found; a missed completion is tolerated.
                Ok(()) => {
                    self.cache.remove(pk);
                }
                // Transient store failure: keep the entry so the next tick
                // observes the disappearance again and retries.
                Err(e) => {
                    warn!(transaction_pk = pk, error = %e, "failed to process completed transaction");
                }
            }
        }

        self.cached_count.store(self.cache.len(), Ordering::Relaxed);
    }

    /// First observation of an open transaction: START notification,
    /// journal entry, cache entry.
    async fn handle_new(&mut self, transaction: &Transaction) -> Result<()> {
        let pk = transaction.transaction_pk;
        info!(
            transaction_pk = pk,
            id_tag = %transaction.id_tag,
            charge_box_id = %transaction.charge_box_id,
            "new transaction detected"
        );

        // A store error here aborts before any cache mutation so the
        // transaction is retried as new next tick. A miss is final for
        // this transition: no notification, but journal and cache advance.
        let user = bounded(
            self.config.call_timeout,
            self.store.resolve_user(&transaction.id_tag),
        )
        .await?;

        if user.is_some() {
            let body = format!(
                "Your charging session has started at {}",
                transaction.charge_box_id
            );
            self.dispatch(&transaction.id_tag, "Charging started", &body)
                .await;
        }

        self.append_journal(NewTransactionEvent {
            kind: EventKind::Start,
            transaction_pk: pk,
            charge_box_id: transaction.charge_box_id.clone(),
            id_tag: transaction.id_tag.clone(),
            payload: serde_json::json!({
                "startValue": transaction.start_value,
                "timestamp": transaction.start_timestamp,
            }),
        })
        .await;

        self.cache.insert(
            pk,
            CacheEntry {
                start_notified: true,
                last_notified_energy: energy::parse_meter_value(transaction.start_value.as_deref()),
            },
        );

        Ok(())
    }

    /// Tracked and still active: check the latest meter sample and notify
    /// progress once it clears the threshold.
    async fn handle_ongoing(&mut self, transaction: &Transaction) -> Result<()> {
        let pk = transaction.transaction_pk;

        let Some(sample) = bounded(
            self.config.call_timeout,
            self.store.fetch_latest_meter_sample(pk),
        )
        .await?
        else {
            return Ok(());
        };

        let current_energy = energy::parse_meter_value(sample.value.as_deref());
        let Some(entry) = self.cache.get(pk) else {
            return Ok(());
        };

        if current_energy <= entry.last_notified_energy + self.config.progress_threshold {
            return Ok(());
        }

        let user = bounded(
            self.config.call_timeout,
            self.store.resolve_user(&transaction.id_tag),
        )
        .await?;

        if user.is_some() {
            let body = format!("Energy delivered: {:.2} kWh", current_energy);
            self.dispatch(&transaction.id_tag, "Charging in progress", &body)
                .await;

            // Baseline moves only when a dispatch was attempted, so an
            // unresolvable user keeps accumulating toward the next tick.
            self.cache.set_last_notified_energy(pk, current_energy);
            debug!(
                transaction_pk = pk,
                energy = current_energy,
                "progress notification dispatched"
            );
        }

        Ok(())
    }

    /// Tracked but gone from the snapshot: look up the stop record and act
    /// on it if it exists. The caller removes the cache entry on `Ok`.
    async fn handle_completed(&mut self, pk: i32) -> Result<()> {
        let Some(transaction) = bounded(
            self.config.call_timeout,
            self.store.fetch_completed_transaction(pk),
        )
        .await?
        else {
            // Raced the external writer (or the record was purged). Drop
            // the entry without retrying; the STOP notification is lost.
            info!(
                transaction_pk = pk,
                "transaction left snapshot without a stop record"
            );
            return Ok(());
        };

        info!(
            transaction_pk = pk,
            charge_box_id = %transaction.charge_box_id,
            "transaction completed"
        );

        let delivered_kwh = energy::delivered_kwh(
            transaction.start_value.as_deref(),
            transaction.stop_value.as_deref(),
        );

        let user = bounded(
            self.config.call_timeout,
            self.store.resolve_user(&transaction.id_tag),
        )
        .await?;

        if user.is_some() {
            let body = format!(
                "Session finished at {}. Energy: {:.2} kWh",
                transaction.charge_box_id, delivered_kwh
            );
            self.dispatch(&transaction.id_tag, "Charging complete", &body)
                .await;
        }

        let duration_ms = transaction
            .stop_timestamp
            .map(|stop| (stop - transaction.start_timestamp).num_milliseconds());

        self.append_journal(NewTransactionEvent {
            kind: EventKind::Stop,
            transaction_pk: pk,
            charge_box_id: transaction.charge_box_id.clone(),
            id_tag: transaction.id_tag.clone(),
            payload: serde_json::json!({
                "stopValue": transaction.stop_value,
                "energyDelivered": delivered_kwh,
                "durationMs": duration_ms,
                "timestamp": transaction.stop_timestamp,
            }),
        })
        .await;

        Ok(())
    }

    /// Best-effort dispatch: failures and unconfirmed deliveries are logged,
    /// never propagated, and never retried within the tick.
    async fn dispatch(&self, id_tag: &str, title: &str, body: &str) {
        match bounded(
            self.config.call_timeout,
            self.push.notify_user(id_tag, title, body),
        )
        .await
        {
            Ok(summary) if summary.confirmed() => {
                debug!(id_tag = %id_tag, delivered = summary.delivered, "notification delivered");
            }
            Ok(summary) => {
                warn!(id_tag = %id_tag, failed = summary.failed, "notification not confirmed");
            }
            Err(e) => {
                warn!(id_tag = %id_tag, error = %e, "notification dispatch failed");
            }
        }
    }

    /// The journal is an audit aid: append failures are logged and
    /// swallowed so they never block classification.
    async fn append_journal(&self, event: NewTransactionEvent) {
        let pk = event.transaction_pk;
        if let Err(e) = bounded(self.config.call_timeout, self.journal.append(event)).await {
            warn!(transaction_pk = pk, error = %e, "failed to append transaction event");
        }
    }
}

struct RunningPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the lifecycle of the reconciliation worker: idempotent start/stop
/// and the operational status endpoint's data.
pub struct SyncScheduler {
    store: Arc<dyn BaseChargePointStore>,
    push: Arc<dyn BasePushNotificationService>,
    journal: Arc<dyn BaseEventJournal>,
    config: SyncConfig,
    cached_count: Arc<AtomicUsize>,
    running: Mutex<Option<RunningPoller>>,
}

impl SyncScheduler {
    pub fn new(
        store: Arc<dyn BaseChargePointStore>,
        push: Arc<dyn BasePushNotificationService>,
        journal: Arc<dyn BaseEventJournal>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            push,
            journal,
            config,
            cached_count: Arc::new(AtomicUsize::new(0)),
            running: Mutex::new(None),
        }
    }

    /// Start polling. A no-op if the worker is already running.
    ///
    /// Each start begins with an empty cache, so every currently open
    /// transaction is treated as new on the first tick; after a process
    /// restart that can repeat a START notification. Accepted trade-off.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if let Some(poller) = running.as_ref() {
            if !poller.handle.is_finished() {
                debug!("polling already active, ignoring start");
                return false;
            }
        }

        let mut reconciler = Reconciler::new(
            self.store.clone(),
            self.push.clone(),
            self.journal.clone(),
            self.config.clone(),
        );
        // The scheduler observes the worker's cache size through this
        // counter; the cache itself never leaves the worker task.
        self.cached_count.store(0, Ordering::Relaxed);
        reconciler.cached_count = self.cached_count.clone();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reconciler.run(cancel.clone()));

        *running = Some(RunningPoller { cancel, handle });
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "transaction polling started"
        );
        true
    }

    /// Stop polling. A no-op if already stopped. The in-flight tick is
    /// allowed to finish before this returns.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(poller) = running.take() else {
            debug!("polling already stopped, ignoring stop");
            return false;
        };

        poller.cancel.cancel();
        if let Err(e) = poller.handle.await {
            warn!(error = %e, "polling worker did not shut down cleanly");
        }
        self.cached_count.store(0, Ordering::Relaxed);
        true
    }

    pub async fn status(&self) -> SyncStatus {
        let running = self.running.lock().await;
        let active = running
            .as_ref()
            .map(|p| !p.handle.is_finished())
            .unwrap_or(false);

        SyncStatus {
            active,
            cached_transactions: self.cached_count.load(Ordering::Relaxed),
            interval_ms: self.config.poll_interval.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{
        MockChargePointStore, MockEventJournal, MockPushService,
    };

    fn scheduler_with_store(store: Arc<MockChargePointStore>) -> SyncScheduler {
        SyncScheduler::new(
            store,
            Arc::new(MockPushService::new()),
            Arc::new(MockEventJournal::new()),
            SyncConfig {
                poll_interval: Duration::from_millis(20),
                ..SyncConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let scheduler = scheduler_with_store(Arc::new(MockChargePointStore::new()));

        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.status().await.active);

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert!(!scheduler.status().await.active);
    }

    #[tokio::test]
    async fn status_reports_configured_interval() {
        let scheduler = scheduler_with_store(Arc::new(MockChargePointStore::new()));

        let status = scheduler.status().await;
        assert!(!status.active);
        assert_eq!(status.interval_ms, 20);
        assert_eq!(status.cached_transactions, 0);
    }

    #[tokio::test]
    async fn worker_polls_until_stopped_and_then_goes_quiet() {
        let store = Arc::new(MockChargePointStore::new());
        let scheduler = scheduler_with_store(store.clone());

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(90)).await;
        scheduler.stop().await;

        // First tick fires immediately, then every 20ms.
        let calls = store.snapshot_calls();
        assert!(calls >= 2, "expected at least two polls, got {calls}");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.snapshot_calls(), calls);
    }
}
