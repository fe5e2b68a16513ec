//! Push dispatcher: fans one notification out to every active device of a
//! user via FCM and records each attempt in the delivery log.
//!
//! Delivery is best-effort by design. A rejected or failed send only bumps
//! the `failed` counter; callers decide whether an unconfirmed delivery
//! matters. Log-write failures are logged here and swallowed, the log is
//! diagnostics, not state.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use fcm::FcmService;
use sqlx::MySqlPool;
use tracing::{debug, warn};

use crate::domains::notifications::models::{DeviceToken, NotificationLog};
use crate::kernel::{BasePushNotificationService, DeliverySummary};

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PushDispatcher {
    pool: MySqlPool,
    /// None when FCM_SERVER_KEY is not configured; every send then counts
    /// as failed.
    fcm: Option<FcmService>,
    send_timeout: Duration,
}

impl PushDispatcher {
    pub fn new(pool: MySqlPool, fcm: Option<FcmService>) -> Self {
        Self {
            pool,
            fcm,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    async fn send_to_token(&self, token: &str, title: &str, body: &str) -> bool {
        let Some(fcm) = &self.fcm else {
            warn!("FCM server key not configured, dropping notification");
            return false;
        };

        let payload = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        match tokio::time::timeout(
            self.send_timeout,
            fcm.send_push(token, title, body, payload),
        )
        .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "FCM send failed");
                false
            }
            Err(_) => {
                warn!("FCM send timed out");
                false
            }
        }
    }
}

#[async_trait]
impl BasePushNotificationService for PushDispatcher {
    async fn notify_user(
        &self,
        user_tag: &str,
        title: &str,
        body: &str,
    ) -> Result<DeliverySummary> {
        let tokens = DeviceToken::find_active_for_user(user_tag, &self.pool).await?;

        if tokens.is_empty() {
            debug!(user_tag = %user_tag, "no active device tokens for user");
            return Ok(DeliverySummary::default());
        }

        let mut summary = DeliverySummary::default();

        for device in &tokens {
            let delivered = self.send_to_token(&device.token, title, body).await;

            if delivered {
                summary.delivered += 1;
            } else {
                summary.failed += 1;
            }

            if let Err(e) =
                NotificationLog::record(device.id, title, body, delivered, &self.pool).await
            {
                warn!(device_token_id = device.id, error = %e, "failed to record delivery attempt");
            }
        }

        debug!(
            user_tag = %user_tag,
            delivered = summary.delivered,
            failed = summary.failed,
            "notification dispatched"
        );

        Ok(summary)
    }
}
