use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domains::notifications::models::{
    device_token::RegisterAction, DeviceToken, NotificationLog, TransactionEvent,
};
use crate::server::app::AppState;
use crate::server::routes::charging::LimitQuery;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}

#[derive(Deserialize)]
pub struct RegisterTokenRequest {
    pub user_id: String,
    pub token: String,
    pub device_name: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterTokenResponse {
    pub success: bool,
    pub action: RegisterAction,
}

/// Register (or touch) an FCM device token for a user.
pub async fn register_token_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<RegisterTokenRequest>,
) -> ApiResult<RegisterTokenResponse> {
    if request.user_id.is_empty() || request.token.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "user_id and token are required" })),
        ));
    }

    DeviceToken::register(
        &request.user_id,
        &request.token,
        request.device_name.as_deref(),
        &state.db_pool,
    )
    .await
    .map(|action| {
        Json(RegisterTokenResponse {
            success: true,
            action,
        })
    })
    .map_err(internal_error)
}

#[derive(Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub success: bool,
    pub delivered: u32,
    pub failed: u32,
}

/// Manually push a notification to a user's devices, through the same
/// dispatcher the reconciliation loop uses.
pub async fn send_notification_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> ApiResult<SendNotificationResponse> {
    if request.user_id.is_empty() || request.title.is_empty() || request.body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "user_id, title and body are required" })),
        ));
    }

    state
        .push
        .notify_user(&request.user_id, &request.title, &request.body)
        .await
        .map(|summary| {
            Json(SendNotificationResponse {
                success: summary.confirmed(),
                delivered: summary.delivered,
                failed: summary.failed,
            })
        })
        .map_err(internal_error)
}

/// Recent delivery attempts.
pub async fn notification_logs_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<NotificationLog>> {
    NotificationLog::find_recent(query.limit.unwrap_or(100), &state.db_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Delivery attempts across one user's devices.
pub async fn user_notification_logs_handler(
    Extension(state): Extension<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<NotificationLog>> {
    NotificationLog::find_recent_for_user(&user_id, query.limit.unwrap_or(50), &state.db_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Recent journal entries (START/STOP transitions).
pub async fn transaction_events_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<TransactionEvent>> {
    TransactionEvent::find_recent(query.limit.unwrap_or(100), &state.db_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqlx::MySqlPool;

    use super::*;
    use crate::domains::sync::{SyncConfig, SyncScheduler};
    use crate::kernel::test_dependencies::{
        MockChargePointStore, MockEventJournal, MockPushService,
    };
    use crate::kernel::DeliverySummary;

    fn test_state(push: Arc<MockPushService>) -> AppState {
        // Lazy pools never connect unless a query runs; these handlers only
        // touch the push seam.
        let pool = MySqlPool::connect_lazy("mysql://test@localhost/test").unwrap();
        let scheduler = Arc::new(SyncScheduler::new(
            Arc::new(MockChargePointStore::new()),
            push.clone(),
            Arc::new(MockEventJournal::new()),
            SyncConfig::default(),
        ));
        AppState {
            steve_pool: pool.clone(),
            db_pool: pool,
            scheduler,
            push,
        }
    }

    #[tokio::test]
    async fn manual_send_goes_through_dispatcher_and_reports_summary() {
        let push = Arc::new(MockPushService::new().with_summary(DeliverySummary {
            delivered: 2,
            failed: 1,
        }));
        let state = test_state(push.clone());

        let response = send_notification_handler(
            Extension(state),
            Json(SendNotificationRequest {
                user_id: "TAG-1".into(),
                title: "Hello".into(),
                body: "World".into(),
            }),
        )
        .await
        .unwrap();

        assert!(response.success);
        assert_eq!(response.delivered, 2);
        assert_eq!(response.failed, 1);

        let sent = push.sent_to("TAG-1");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Hello");
    }

    #[tokio::test]
    async fn manual_send_requires_all_fields() {
        let state = test_state(Arc::new(MockPushService::new()));

        let (status, _) = send_notification_handler(
            Extension(state),
            Json(SendNotificationRequest {
                user_id: "TAG-1".into(),
                title: String::new(),
                body: "World".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn manual_send_surfaces_dispatch_failure_as_server_error() {
        let push = Arc::new(MockPushService::new());
        push.set_failing(true);
        let state = test_state(push);

        let (status, _) = send_notification_handler(
            Extension(state),
            Json(SendNotificationRequest {
                user_id: "TAG-1".into(),
                title: "Hello".into(),
                body: "World".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
