//! Reconciliation loop behavior, driven tick-by-tick against mock
//! collaborators (no database, no push provider).

use std::sync::Arc;
use std::time::Duration;

use evcs_core::domains::notifications::models::EventKind;
use evcs_core::domains::sync::{Reconciler, SyncConfig};
use evcs_core::kernel::test_dependencies::{
    active_transaction, completed_transaction, meter_sample, MockChargePointStore,
    MockEventJournal, MockPushService,
};

fn test_config() -> SyncConfig {
    SyncConfig {
        poll_interval: Duration::from_millis(10),
        progress_threshold: 5.0,
        call_timeout: Duration::from_secs(1),
    }
}

struct Harness {
    store: Arc<MockChargePointStore>,
    push: Arc<MockPushService>,
    journal: Arc<MockEventJournal>,
    reconciler: Reconciler,
}

fn harness(store: MockChargePointStore) -> Harness {
    let store = Arc::new(store);
    let push = Arc::new(MockPushService::new());
    let journal = Arc::new(MockEventJournal::new());
    let reconciler = Reconciler::new(
        store.clone(),
        push.clone(),
        journal.clone(),
        test_config(),
    );
    Harness {
        store,
        push,
        journal,
        reconciler,
    }
}

#[tokio::test]
async fn start_notification_fires_exactly_once_across_stable_snapshots() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));

    for _ in 0..3 {
        h.store
            .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
        h.reconciler.run_tick().await;
    }

    let starts: Vec<_> = h
        .push
        .sent()
        .into_iter()
        .filter(|n| n.title == "Charging started")
        .collect();
    assert_eq!(starts.len(), 1);
    assert_eq!(h.journal.events_for(1).len(), 1);
    assert_eq!(h.reconciler.cached_transactions(), 1);
}

#[tokio::test]
async fn stop_notification_fires_at_most_once() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));

    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    h.store
        .set_completed(completed_transaction(1, "U1", "CP-01", Some("0"), Some("8000")));

    // Absent from several consecutive snapshots; the entry is removed on
    // the first observation, so later ticks have nothing to reconcile.
    for _ in 0..3 {
        h.store.push_snapshot(vec![]);
        h.reconciler.run_tick().await;
    }

    let stops: Vec<_> = h
        .push
        .sent()
        .into_iter()
        .filter(|n| n.title == "Charging complete")
        .collect();
    assert_eq!(stops.len(), 1);
    assert_eq!(h.reconciler.cached_transactions(), 0);
}

#[tokio::test]
async fn progress_fires_only_past_threshold_and_rebaselines() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));
    let tx = active_transaction(1, "U1", "CP-01", Some("0"));

    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;

    // 4 units above baseline: below the threshold of 5, nothing fires.
    h.store.set_latest_sample(1, meter_sample("4"));
    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;
    assert!(h.push.sent().iter().all(|n| n.title != "Charging in progress"));

    // 6 units above baseline: one progress notification.
    h.store.set_latest_sample(1, meter_sample("6"));
    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;

    // Same reading again: the baseline moved to 6, so nothing more fires.
    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;

    let progress: Vec<_> = h
        .push
        .sent()
        .into_iter()
        .filter(|n| n.title == "Charging in progress")
        .collect();
    assert_eq!(progress.len(), 1);
    assert!(progress[0].body.contains("6.00"));
}

#[tokio::test]
async fn snapshot_fetch_failure_skips_tick_without_cache_mutation() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));

    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;
    assert_eq!(h.reconciler.cached_transactions(), 1);

    // Tick K: the snapshot query fails. The transaction must NOT be
    // treated as completed and the cache must stay intact.
    h.store.push_snapshot_error("connection refused");
    h.reconciler.run_tick().await;
    assert_eq!(h.reconciler.cached_transactions(), 1);
    assert_eq!(h.push.sent().len(), 1);

    // Tick K+1 proceeds normally against the prior cache state.
    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;
    assert_eq!(h.reconciler.cached_transactions(), 1);
    // Still only the original START: no reclassification happened.
    assert_eq!(h.push.sent().len(), 1);
}

#[tokio::test]
async fn completion_without_stop_record_drops_entry_silently() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));

    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    // No completed record seeded: simulates racing the external writer.
    h.store.push_snapshot(vec![]);
    h.reconciler.run_tick().await;

    assert_eq!(h.reconciler.cached_transactions(), 0);
    assert!(h.push.sent().iter().all(|n| n.title != "Charging complete"));
    assert!(h
        .journal
        .events_for(1)
        .iter()
        .all(|e| e.kind != EventKind::Stop));

    // And no retry loop: later ticks fetch nothing for it.
    h.store.push_snapshot(vec![]);
    h.reconciler.run_tick().await;
    assert_eq!(h.reconciler.cached_transactions(), 0);
}

#[tokio::test]
async fn end_to_end_lifecycle_scenario() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));
    let tx = active_transaction(1, "U1", "CP-01", Some("0"));

    // Tick 1: transaction appears.
    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;
    let sent = h.push.sent_to("U1");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Charging started");

    // Tick 2: 4 energy units, below threshold.
    h.store.set_latest_sample(1, meter_sample("4"));
    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;
    assert_eq!(h.push.sent_to("U1").len(), 1);

    // Tick 3: 6 energy units, one progress notification.
    h.store.set_latest_sample(1, meter_sample("6"));
    h.store.push_snapshot(vec![tx.clone()]);
    h.reconciler.run_tick().await;
    let sent = h.push.sent_to("U1");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].title, "Charging in progress");

    // Tick 4: gone from the snapshot, stop record shows 12000 milli-units.
    h.store
        .set_completed(completed_transaction(1, "U1", "CP-01", Some("0"), Some("12000")));
    h.store.push_snapshot(vec![]);
    h.reconciler.run_tick().await;

    let sent = h.push.sent_to("U1");
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].title, "Charging complete");
    assert!(sent[2].body.contains("12.00 kWh"));
    assert_eq!(h.reconciler.cached_transactions(), 0);

    let kinds: Vec<_> = h.journal.events_for(1).iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Start, EventKind::Stop]);
}

#[tokio::test]
async fn unresolved_user_is_journaled_but_not_notified() {
    // No user registered for the tag.
    let mut h = harness(MockChargePointStore::new());

    h.store
        .push_snapshot(vec![active_transaction(1, "ANON", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    assert!(h.push.sent().is_empty());
    assert_eq!(h.journal.events_for(1).len(), 1);
    assert_eq!(h.reconciler.cached_transactions(), 1);

    h.store
        .set_completed(completed_transaction(1, "ANON", "CP-01", Some("0"), Some("2000")));
    h.store.push_snapshot(vec![]);
    h.reconciler.run_tick().await;

    assert!(h.push.sent().is_empty());
    let kinds: Vec<_> = h.journal.events_for(1).iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Start, EventKind::Stop]);
}

#[tokio::test]
async fn restart_reclassifies_open_transactions_as_new() {
    // The cache is volatile: a fresh worker re-notifies START for a
    // transaction that is still open. Accepted trade-off, not a bug.
    let store = Arc::new(MockChargePointStore::new().with_user("U1"));
    let push = Arc::new(MockPushService::new());
    let journal = Arc::new(MockEventJournal::new());

    let mut first = Reconciler::new(
        store.clone(),
        push.clone(),
        journal.clone(),
        test_config(),
    );
    store.push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    first.run_tick().await;

    // "Restart": a new reconciler with an empty cache over the same world.
    let mut second = Reconciler::new(
        store.clone(),
        push.clone(),
        journal.clone(),
        test_config(),
    );
    store.push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    second.run_tick().await;

    let starts: Vec<_> = push
        .sent()
        .into_iter()
        .filter(|n| n.title == "Charging started")
        .collect();
    assert_eq!(starts.len(), 2);
}

#[tokio::test]
async fn resolve_user_failure_leaves_transaction_for_next_tick() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));

    h.store.set_fail_resolve_user(true);
    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    // Transient store failure: no cache entry, no journal row.
    assert_eq!(h.reconciler.cached_transactions(), 0);
    assert!(h.journal.events().is_empty());

    h.store.set_fail_resolve_user(false);
    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    assert_eq!(h.reconciler.cached_transactions(), 1);
    assert_eq!(h.push.sent().len(), 1);
}

#[tokio::test]
async fn completed_lookup_failure_retries_next_tick() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));

    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    // Store unreachable while looking up the stop record: the entry stays
    // so the disappearance is observed again next tick.
    h.store.set_fail_completed_fetch(true);
    h.store.push_snapshot(vec![]);
    h.reconciler.run_tick().await;
    assert_eq!(h.reconciler.cached_transactions(), 1);

    h.store.set_fail_completed_fetch(false);
    h.store
        .set_completed(completed_transaction(1, "U1", "CP-01", Some("0"), Some("3000")));
    h.store.push_snapshot(vec![]);
    h.reconciler.run_tick().await;

    assert_eq!(h.reconciler.cached_transactions(), 0);
    let stops: Vec<_> = h
        .push
        .sent()
        .into_iter()
        .filter(|n| n.title == "Charging complete")
        .collect();
    assert_eq!(stops.len(), 1);
}

#[tokio::test]
async fn dispatch_failure_still_advances_cache() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));
    h.push.set_failing(true);

    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    // At-most-once dispatch: the attempt failed but the transaction is
    // tracked, so the START is not retried next tick.
    assert_eq!(h.reconciler.cached_transactions(), 1);
    assert_eq!(h.journal.events_for(1).len(), 1);

    h.push.set_failing(false);
    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;
    assert!(h.push.sent().is_empty());
}

#[tokio::test]
async fn journal_failure_does_not_block_dispatch() {
    let mut h = harness(MockChargePointStore::new().with_user("U1"));
    h.journal.set_failing(true);

    h.store
        .push_snapshot(vec![active_transaction(1, "U1", "CP-01", Some("0"))]);
    h.reconciler.run_tick().await;

    assert_eq!(h.push.sent().len(), 1);
    assert_eq!(h.reconciler.cached_transactions(), 1);
    assert!(h.journal.events().is_empty());
}

#[tokio::test]
async fn independent_transactions_do_not_block_each_other() {
    let mut h = harness(MockChargePointStore::new().with_user("U1").with_user("U2"));

    h.store.push_snapshot(vec![
        active_transaction(1, "U1", "CP-01", Some("0")),
        active_transaction(2, "U2", "CP-02", Some("0")),
    ]);
    h.reconciler.run_tick().await;
    assert_eq!(h.reconciler.cached_transactions(), 2);

    // T1 completes cleanly while T2 keeps charging.
    h.store
        .set_completed(completed_transaction(1, "U1", "CP-01", Some("0"), Some("5000")));
    h.store
        .push_snapshot(vec![active_transaction(2, "U2", "CP-02", Some("0"))]);
    h.reconciler.run_tick().await;

    assert_eq!(h.reconciler.cached_transactions(), 1);
    assert_eq!(h.push.sent_to("U1").len(), 2); // START + STOP
    assert_eq!(h.push.sent_to("U2").len(), 1); // START only
}
