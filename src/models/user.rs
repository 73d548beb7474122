use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,

    pub full_name: Option<String>,
    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str = "id, email, full_name, avatar_url, created_at";
