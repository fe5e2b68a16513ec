// Minimal client for the Firebase Cloud Messaging legacy HTTP API.
// https://firebase.google.com/docs/cloud-messaging/http-server-ref

pub mod models;

use reqwest::{header, Client};
use thiserror::Error;

use crate::models::{FcmMessage, FcmNotification, FcmResponse};

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

#[derive(Debug, Error)]
pub enum FcmError {
    #[error("FCM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("FCM returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("FCM rejected delivery: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct FcmOptions {
    pub server_key: String,
}

#[derive(Debug, Clone)]
pub struct FcmService {
    options: FcmOptions,
    client: Client,
}

impl FcmService {
    pub fn new(options: FcmOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Send one push notification to a device registration token.
    ///
    /// A 2xx response with `failure > 0` still counts as a rejection: the
    /// legacy API reports per-message errors (e.g. `NotRegistered`) in the
    /// body rather than the HTTP status.
    pub async fn send_push(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<FcmResponse, FcmError> {
        let message = FcmMessage {
            to: token.to_string(),
            notification: FcmNotification {
                title: title.to_string(),
                body: body.to_string(),
            },
            data,
        };

        let response = self
            .client
            .post(FCM_SEND_URL)
            .header(
                header::AUTHORIZATION,
                format!("key={}", self.options.server_key),
            )
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FcmError::Status(status));
        }

        let parsed = response.json::<FcmResponse>().await?;

        if parsed.failure > 0 {
            let reason = parsed
                .results
                .iter()
                .find_map(|r| r.error.clone())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(FcmError::Rejected(reason));
        }

        Ok(parsed)
    }
}
