//! Read-only projections of the external SteVe store.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domains::charging::models::{ChargePoint, ChargingUser, Transaction};
use crate::server::app::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn internal_error(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}

fn not_found(what: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("{what} not found") })),
    )
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn charge_points_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Vec<ChargePoint>> {
    ChargePoint::find_all(&state.steve_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn charge_point_by_id_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ChargePoint> {
    match ChargePoint::find_by_id(&id, &state.steve_pool).await {
        Ok(Some(cp)) => Ok(Json(cp)),
        Ok(None) => Err(not_found("charge point")),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn charge_point_transactions_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Transaction>> {
    Transaction::find_by_charge_point(&id, query.limit.unwrap_or(50), &state.steve_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn transactions_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<Transaction>> {
    Transaction::find_recent(query.limit.unwrap_or(100), &state.steve_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn transactions_active_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Vec<Transaction>> {
    Transaction::find_active(&state.steve_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn users_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Vec<ChargingUser>> {
    ChargingUser::find_all(&state.steve_pool)
        .await
        .map(Json)
        .map_err(internal_error)
}

pub async fn user_by_tag_handler(
    Extension(state): Extension<AppState>,
    Path(id_tag): Path<String>,
) -> ApiResult<ChargingUser> {
    match ChargingUser::find_by_tag(&id_tag, &state.steve_pool).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(not_found("user")),
        Err(e) => Err(internal_error(e)),
    }
}
