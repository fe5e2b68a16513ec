use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::domains::sync::SyncStatus;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct PollingActionResponse {
    changed: bool,
    status: SyncStatus,
}

/// Operational visibility into the reconciliation loop.
pub async fn polling_status_handler(Extension(state): Extension<AppState>) -> Json<SyncStatus> {
    Json(state.scheduler.status().await)
}

/// Start the reconciliation loop. Idempotent: starting an active loop is a
/// no-op reported as `changed: false`.
pub async fn polling_start_handler(
    Extension(state): Extension<AppState>,
) -> Json<PollingActionResponse> {
    let changed = state.scheduler.start().await;
    Json(PollingActionResponse {
        changed,
        status: state.scheduler.status().await,
    })
}

/// Stop the reconciliation loop. Idempotent; the in-flight tick finishes
/// before this returns.
pub async fn polling_stop_handler(
    Extension(state): Extension<AppState>,
) -> Json<PollingActionResponse> {
    let changed = state.scheduler.stop().await;
    Json(PollingActionResponse {
        changed,
        status: state.scheduler.status().await,
    })
}
