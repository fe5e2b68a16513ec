use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

/// Charge-point registry row from SteVe's `charge_box` table.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct ChargePoint {
    pub charge_box_pk: i32,
    pub charge_box_id: String,
    pub charge_point_vendor: Option<String>,
    pub charge_point_model: Option<String>,
    pub fw_version: Option<String>,
    pub registration_status: String,
    pub last_heartbeat_timestamp: Option<DateTime<Utc>>,
}

const CHARGE_POINT_COLUMNS: &str = "
    charge_box_pk,
    charge_box_id,
    charge_point_vendor,
    charge_point_model,
    fw_version,
    registration_status,
    last_heartbeat_timestamp";

impl ChargePoint {
    pub async fn find_all(pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {CHARGE_POINT_COLUMNS} FROM charge_box"
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(charge_box_id: &str, pool: &MySqlPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {CHARGE_POINT_COLUMNS} FROM charge_box WHERE charge_box_id = ?"
        ))
        .bind(charge_box_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}
