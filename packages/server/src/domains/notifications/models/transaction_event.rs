use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

/// Lifecycle transition kinds recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Start,
    Stop,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "START",
            EventKind::Stop => "STOP",
        }
    }
}

/// A journal entry about to be appended. The payload blob captures the
/// energy/timing facts known at classification time.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransactionEvent {
    pub kind: EventKind,
    pub transaction_pk: i32,
    pub charge_box_id: String,
    pub id_tag: String,
    pub payload: serde_json::Value,
}

/// A journal row as stored. Append-only: never mutated or deleted by this
/// service.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct TransactionEvent {
    pub id: i64,
    pub transaction_id: i32,
    pub event_type: String,
    pub charge_point_id: String,
    pub user_tag: String,
    pub event_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TransactionEvent {
    /// Append one event row.
    pub async fn insert(event: &NewTransactionEvent, pool: &MySqlPool) -> Result<()> {
        sqlx::query(
            "INSERT INTO transaction_events
                 (transaction_id, event_type, charge_point_id, user_tag, event_data, created_at)
             VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
        )
        .bind(event.transaction_pk)
        .bind(event.kind.as_str())
        .bind(&event.charge_box_id)
        .bind(&event.id_tag)
        .bind(&event.payload)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Recent journal entries, newest first.
    pub async fn find_recent(limit: i64, pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, transaction_id, event_type, charge_point_id, user_tag, event_data, created_at
             FROM transaction_events
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
