use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

/// One meter reading reported by a connector during a transaction.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct MeterSample {
    pub value_timestamp: DateTime<Utc>,
    pub value: Option<String>,
}

impl MeterSample {
    /// Most recent sample for a transaction. Progress detection only ever
    /// looks at the latest reading, not the full series.
    pub async fn find_latest_for_transaction(
        transaction_pk: i32,
        pool: &MySqlPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT
                cmv.valueTimestamp AS value_timestamp,
                cmv.value
             FROM connector_metervalue cmv
             WHERE cmv.transaction_pk = ?
             ORDER BY cmv.valueTimestamp DESC
             LIMIT 1",
        )
        .bind(transaction_pk)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}
