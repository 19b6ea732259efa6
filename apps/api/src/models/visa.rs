use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VisaAnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub questionnaire: Value,
    pub report: Value,
    pub top_visa: Option<String>,
    pub top_score: i32,
    pub created_at: DateTime<Utc>,
}
