//! Adapter exposing the SteVe database behind the `BaseChargePointStore`
//! trait, with a bounded timeout on every query so a wedged external store
//! degrades into per-tick failures instead of stalling the poller.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;
use std::future::Future;

use crate::domains::charging::models::{ChargingUser, MeterSample, Transaction};
use crate::kernel::BaseChargePointStore;

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct SteveStore {
    pool: MySqlPool,
    query_timeout: Duration,
}

impl SteveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(pool: MySqlPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn bounded<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .with_context(|| format!("steve query timed out: {what}"))?
    }
}

#[async_trait]
impl BaseChargePointStore for SteveStore {
    async fn fetch_active_transactions(&self) -> Result<Vec<Transaction>> {
        self.bounded("active transactions", Transaction::find_active(&self.pool))
            .await
    }

    async fn fetch_completed_transaction(
        &self,
        transaction_pk: i32,
    ) -> Result<Option<Transaction>> {
        self.bounded(
            "completed transaction",
            Transaction::find_completed_by_pk(transaction_pk, &self.pool),
        )
        .await
    }

    async fn fetch_latest_meter_sample(&self, transaction_pk: i32) -> Result<Option<MeterSample>> {
        self.bounded(
            "latest meter sample",
            MeterSample::find_latest_for_transaction(transaction_pk, &self.pool),
        )
        .await
    }

    async fn resolve_user(&self, id_tag: &str) -> Result<Option<ChargingUser>> {
        self.bounded("user by tag", ChargingUser::find_by_tag(id_tag, &self.pool))
            .await
    }
}
