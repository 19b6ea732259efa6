use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One auto-saved version of a user's Criador de Sonhos form. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DreamDraftRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub version: i32,
    pub current_step: i16,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DreamGoalRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub data: Value,
    pub completeness: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
