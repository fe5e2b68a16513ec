use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

/// One row per delivery attempt, success or failure.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct NotificationLog {
    pub id: i64,
    pub device_token_id: i64,
    pub title: String,
    pub body: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

impl NotificationLog {
    /// Record one delivery attempt against a device token.
    pub async fn record(
        device_token_id: i64,
        title: &str,
        body: &str,
        delivered: bool,
        pool: &MySqlPool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO notifications_log (device_token_id, title, body, status)
             VALUES (?, ?, ?, ?)",
        )
        .bind(device_token_id)
        .bind(title)
        .bind(body)
        .bind(if delivered { "Sent" } else { "Failed" })
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Recent delivery attempts, newest first.
    pub async fn find_recent(limit: i64, pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, device_token_id, title, body, status, sent_at
             FROM notifications_log
             ORDER BY sent_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Recent delivery attempts across all of a user's devices, newest first.
    pub async fn find_recent_for_user(
        user_id: &str,
        limit: i64,
        pool: &MySqlPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT nl.id, nl.device_token_id, nl.title, nl.body, nl.status, nl.sent_at
             FROM notifications_log nl
             JOIN device_tokens dt ON nl.device_token_id = dt.id
             WHERE dt.user_id = ?
             ORDER BY nl.sent_at DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
