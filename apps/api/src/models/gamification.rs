use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single points award. The ledger is append-only; totals are always summed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointsLedgerRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity: String,
    pub points: i32,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAchievementRow {
    pub user_id: Uuid,
    pub achievement_code: String,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRewardRow {
    pub user_id: Uuid,
    pub reward_code: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompetitionRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub prize: Option<String>,
}
