use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ToolUsageEventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tool: String,
    pub created_at: DateTime<Utc>,
}
