//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use sqlx::MySqlPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::sync::SyncScheduler;
use crate::kernel::BasePushNotificationService;
use crate::server::routes::{
    charge_point_by_id_handler, charge_point_transactions_handler, charge_points_handler,
    health_handler, notification_logs_handler, polling_start_handler, polling_status_handler,
    polling_stop_handler, register_token_handler, send_notification_handler,
    transaction_events_handler, transactions_active_handler, transactions_handler,
    user_by_tag_handler, user_notification_logs_handler, users_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// External SteVe store (read-only)
    pub steve_pool: MySqlPool,
    /// Local notifications store
    pub db_pool: MySqlPool,
    pub scheduler: Arc<SyncScheduler>,
    /// Same dispatcher the reconciliation loop uses; the manual send
    /// endpoint goes through it.
    pub push: Arc<dyn BasePushNotificationService>,
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/polling/status", get(polling_status_handler))
        .route("/polling/start", post(polling_start_handler))
        .route("/polling/stop", post(polling_stop_handler))
        .route("/charge-points", get(charge_points_handler))
        .route("/charge-points/:id", get(charge_point_by_id_handler))
        .route(
            "/charge-points/:id/transactions",
            get(charge_point_transactions_handler),
        )
        .route("/transactions", get(transactions_handler))
        .route("/transactions/active", get(transactions_active_handler))
        .route("/users", get(users_handler))
        .route("/users/:id_tag", get(user_by_tag_handler))
        .route("/notifications/register-token", post(register_token_handler))
        .route("/notifications/send", post(send_notification_handler))
        .route("/notifications/logs", get(notification_logs_handler))
        .route(
            "/notifications/logs/user/:user_id",
            get(user_notification_logs_handler),
        )
        .route("/events/transactions", get(transaction_events_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
