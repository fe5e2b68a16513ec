use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

/// FCM device registration token for one of a user's devices.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct DeviceToken {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub device_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Outcome of a token registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterAction {
    Created,
    Updated,
}

impl DeviceToken {
    /// Active tokens for a user, one per registered device.
    pub async fn find_active_for_user(user_id: &str, pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, user_id, token, device_name, is_active, created_at, last_used
             FROM device_tokens
             WHERE user_id = ? AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Register a token, touching `last_used` if it is already known.
    pub async fn register(
        user_id: &str,
        token: &str,
        device_name: Option<&str>,
        pool: &MySqlPool,
    ) -> Result<RegisterAction> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM device_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(pool)
                .await?;

        if existing.is_some() {
            sqlx::query("UPDATE device_tokens SET last_used = CURRENT_TIMESTAMP WHERE token = ?")
                .bind(token)
                .execute(pool)
                .await?;
            return Ok(RegisterAction::Updated);
        }

        sqlx::query("INSERT INTO device_tokens (user_id, token, device_name) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(token)
            .bind(device_name.unwrap_or("Unknown Device"))
            .execute(pool)
            .await?;

        Ok(RegisterAction::Created)
    }
}
