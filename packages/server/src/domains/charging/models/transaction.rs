use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

/// Charging-session transaction as recorded by SteVe.
///
/// A transaction is open while `stop_timestamp` is NULL; `stop_value` is
/// only written once the session closes. Meter values are strings in the
/// unit the charge point reports (Wh in practice).
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Transaction {
    pub transaction_pk: i32,
    pub connector_pk: i32,
    pub id_tag: String,
    pub charge_box_id: String,
    pub start_timestamp: DateTime<Utc>,
    pub start_value: Option<String>,
    pub stop_timestamp: Option<DateTime<Utc>>,
    pub stop_value: Option<String>,
}

const TRANSACTION_COLUMNS: &str = "
    t.transaction_pk,
    t.connector_pk,
    t.idTag AS id_tag,
    cb.charge_box_id,
    t.startTimestamp AS start_timestamp,
    t.startValue AS start_value,
    t.stopTimestamp AS stop_timestamp,
    t.stopValue AS stop_value";

impl Transaction {
    /// All open transactions (no stop timestamp yet), newest first.
    pub async fn find_active(pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TRANSACTION_COLUMNS}
             FROM transaction t
             JOIN connector c ON t.connector_pk = c.connector_pk
             JOIN charge_box cb ON c.charge_box_id = cb.charge_box_id
             WHERE t.stopTimestamp IS NULL
             ORDER BY t.startTimestamp DESC"
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// A closed transaction by primary key, if the stop record exists yet.
    pub async fn find_completed_by_pk(
        transaction_pk: i32,
        pool: &MySqlPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TRANSACTION_COLUMNS}
             FROM transaction t
             JOIN connector c ON t.connector_pk = c.connector_pk
             JOIN charge_box cb ON c.charge_box_id = cb.charge_box_id
             WHERE t.transaction_pk = ? AND t.stopTimestamp IS NOT NULL
             LIMIT 1"
        ))
        .bind(transaction_pk)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Recent transactions, open and closed, newest first.
    pub async fn find_recent(limit: i64, pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TRANSACTION_COLUMNS}
             FROM transaction t
             JOIN connector c ON t.connector_pk = c.connector_pk
             JOIN charge_box cb ON c.charge_box_id = cb.charge_box_id
             ORDER BY t.startTimestamp DESC
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Recent transactions for one charge point, newest first.
    pub async fn find_by_charge_point(
        charge_box_id: &str,
        limit: i64,
        pool: &MySqlPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {TRANSACTION_COLUMNS}
             FROM transaction t
             JOIN connector c ON t.connector_pk = c.connector_pk
             JOIN charge_box cb ON c.charge_box_id = cb.charge_box_id
             WHERE cb.charge_box_id = ?
             ORDER BY t.startTimestamp DESC
             LIMIT ?"
        ))
        .bind(charge_box_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
