use anyhow::Result;
use serde::Serialize;
use sqlx::MySqlPool;

/// SteVe user row, keyed by RFID tag. The tag is the correlation handle
/// between a transaction and a notifiable user.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct ChargingUser {
    pub user_pk: i32,
    pub id_tag: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

const USER_COLUMNS: &str = "
    user_pk,
    idTag AS id_tag,
    firstName AS first_name,
    lastName AS last_name,
    email,
    phone";

impl ChargingUser {
    /// Resolve the user behind a session tag. A tag with no user is a
    /// normal outcome (anonymous or unprovisioned card), not an error.
    pub async fn find_by_tag(id_tag: &str, pool: &MySqlPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE idTag = ?"
        ))
        .bind(id_tag)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_all(pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!("SELECT {USER_COLUMNS} FROM user"))
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}
