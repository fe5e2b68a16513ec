// Mock implementations for testing
//
// Scriptable stand-ins for the external charge-point store, the push
// dispatcher, and the event journal, so reconciliation tests run without a
// database or delivery provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{
    BaseChargePointStore, BaseEventJournal, BasePushNotificationService, DeliverySummary,
};
use crate::domains::charging::models::{ChargingUser, MeterSample, Transaction};
use crate::domains::notifications::models::NewTransactionEvent;

// =============================================================================
// Test data builders
// =============================================================================

/// An open transaction as it would appear in the active snapshot.
pub fn active_transaction(
    transaction_pk: i32,
    id_tag: &str,
    charge_box_id: &str,
    start_value: Option<&str>,
) -> Transaction {
    Transaction {
        transaction_pk,
        connector_pk: 1,
        id_tag: id_tag.to_string(),
        charge_box_id: charge_box_id.to_string(),
        start_timestamp: Utc::now(),
        start_value: start_value.map(str::to_string),
        stop_timestamp: None,
        stop_value: None,
    }
}

/// A closed transaction as returned by the completed-record lookup.
pub fn completed_transaction(
    transaction_pk: i32,
    id_tag: &str,
    charge_box_id: &str,
    start_value: Option<&str>,
    stop_value: Option<&str>,
) -> Transaction {
    Transaction {
        stop_timestamp: Some(Utc::now()),
        stop_value: stop_value.map(str::to_string),
        ..active_transaction(transaction_pk, id_tag, charge_box_id, start_value)
    }
}

pub fn meter_sample(value: &str) -> MeterSample {
    MeterSample {
        value_timestamp: Utc::now(),
        value: Some(value.to_string()),
    }
}

fn test_user(id_tag: &str) -> ChargingUser {
    ChargingUser {
        user_pk: 1,
        id_tag: id_tag.to_string(),
        first_name: None,
        last_name: None,
        email: None,
        phone: None,
    }
}

// =============================================================================
// Mock Charge-Point Store
// =============================================================================

/// Scriptable store: queue one snapshot (or snapshot failure) per expected
/// tick, and seed completed records, meter samples, and users as needed.
/// An exhausted snapshot queue yields empty snapshots.
pub struct MockChargePointStore {
    snapshots: Arc<Mutex<VecDeque<Result<Vec<Transaction>, String>>>>,
    completed: Arc<Mutex<HashMap<i32, Transaction>>>,
    samples: Arc<Mutex<HashMap<i32, MeterSample>>>,
    users: Arc<Mutex<HashMap<String, ChargingUser>>>,
    fail_completed_fetch: Arc<Mutex<bool>>,
    fail_resolve_user: Arc<Mutex<bool>>,
    snapshot_calls: Arc<Mutex<usize>>,
}

impl MockChargePointStore {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(VecDeque::new())),
            completed: Arc::new(Mutex::new(HashMap::new())),
            samples: Arc::new(Mutex::new(HashMap::new())),
            users: Arc::new(Mutex::new(HashMap::new())),
            fail_completed_fetch: Arc::new(Mutex::new(false)),
            fail_resolve_user: Arc::new(Mutex::new(false)),
            snapshot_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_user(self, id_tag: &str) -> Self {
        self.users
            .lock()
            .unwrap()
            .insert(id_tag.to_string(), test_user(id_tag));
        self
    }

    /// Queue the active snapshot for the next unserved tick.
    pub fn push_snapshot(&self, transactions: Vec<Transaction>) {
        self.snapshots.lock().unwrap().push_back(Ok(transactions));
    }

    /// Queue a snapshot-fetch failure for the next unserved tick.
    pub fn push_snapshot_error(&self, message: &str) {
        self.snapshots
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn set_completed(&self, transaction: Transaction) {
        self.completed
            .lock()
            .unwrap()
            .insert(transaction.transaction_pk, transaction);
    }

    pub fn set_latest_sample(&self, transaction_pk: i32, sample: MeterSample) {
        self.samples.lock().unwrap().insert(transaction_pk, sample);
    }

    pub fn set_fail_completed_fetch(&self, fail: bool) {
        *self.fail_completed_fetch.lock().unwrap() = fail;
    }

    pub fn set_fail_resolve_user(&self, fail: bool) {
        *self.fail_resolve_user.lock().unwrap() = fail;
    }

    /// How many times the active snapshot was fetched.
    pub fn snapshot_calls(&self) -> usize {
        *self.snapshot_calls.lock().unwrap()
    }
}

impl Default for MockChargePointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseChargePointStore for MockChargePointStore {
    async fn fetch_active_transactions(&self) -> Result<Vec<Transaction>> {
        *self.snapshot_calls.lock().unwrap() += 1;

        let next = self.snapshots.lock().unwrap().pop_front();
        match next {
            Some(Ok(transactions)) => Ok(transactions),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_completed_transaction(
        &self,
        transaction_pk: i32,
    ) -> Result<Option<Transaction>> {
        if *self.fail_completed_fetch.lock().unwrap() {
            return Err(anyhow!("store unreachable"));
        }
        Ok(self.completed.lock().unwrap().get(&transaction_pk).cloned())
    }

    async fn fetch_latest_meter_sample(&self, transaction_pk: i32) -> Result<Option<MeterSample>> {
        Ok(self.samples.lock().unwrap().get(&transaction_pk).cloned())
    }

    async fn resolve_user(&self, id_tag: &str) -> Result<Option<ChargingUser>> {
        if *self.fail_resolve_user.lock().unwrap() {
            return Err(anyhow!("store unreachable"));
        }
        Ok(self.users.lock().unwrap().get(id_tag).cloned())
    }
}

// =============================================================================
// Mock Push Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub user_tag: String,
    pub title: String,
    pub body: String,
}

pub struct MockPushService {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    summary: Arc<Mutex<DeliverySummary>>,
    fail: Arc<Mutex<bool>>,
}

impl MockPushService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            summary: Arc::new(Mutex::new(DeliverySummary {
                delivered: 1,
                failed: 0,
            })),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_summary(self, summary: DeliverySummary) -> Self {
        *self.summary.lock().unwrap() = summary;
        self
    }

    /// Make every notify call return an error (dispatch not attempted).
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Every dispatched notification, in order.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, user_tag: &str) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_tag == user_tag)
            .cloned()
            .collect()
    }
}

impl Default for MockPushService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePushNotificationService for MockPushService {
    async fn notify_user(
        &self,
        user_tag: &str,
        title: &str,
        body: &str,
    ) -> Result<DeliverySummary> {
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("push service unavailable"));
        }

        self.sent.lock().unwrap().push(SentNotification {
            user_tag: user_tag.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });

        Ok(*self.summary.lock().unwrap())
    }
}

// =============================================================================
// Mock Event Journal
// =============================================================================

pub struct MockEventJournal {
    events: Arc<Mutex<Vec<NewTransactionEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockEventJournal {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn events(&self) -> Vec<NewTransactionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, transaction_pk: i32) -> Vec<NewTransactionEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.transaction_pk == transaction_pk)
            .cloned()
            .collect()
    }
}

impl Default for MockEventJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEventJournal for MockEventJournal {
    async fn append(&self, event: NewTransactionEvent) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("journal write failed"));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
