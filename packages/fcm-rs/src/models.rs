use serde::{Deserialize, Serialize};

/// Message payload for the FCM legacy HTTP API.
#[derive(Debug, Serialize)]
pub struct FcmMessage {
    pub to: String,
    pub notification: FcmNotification,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

/// Response body returned by `https://fcm.googleapis.com/fcm/send`.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmResponse {
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub failure: u32,
    #[serde(default)]
    pub results: Vec<FcmResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FcmResult {
    pub message_id: Option<String>,
    pub error: Option<String>,
}
