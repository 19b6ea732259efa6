use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gamification::achievements::{AchievementDef, ACHIEVEMENTS};
use crate::gamification::ledger::{
    login_days, record_daily_login, total_points, unlocked_achievements, DailyLoginOutcome,
};
use crate::gamification::levels::{level_for, LevelInfo};
use crate::gamification::points::current_streak;
use crate::gamification::rankings::{
    competition_leaderboard, leaderboard_size, list_competitions, load_leaderboard,
    CompetitionLeaderboard, CompetitionView, Leaderboard, RankingPeriod,
};
use crate::gamification::rewards::{
    check_claim, claimed_rewards, insert_claim, reward_views, RewardView,
};
use crate::models::gamification::{PointsLedgerRow, UserRewardRow};
use crate::models::user::load_user;
use crate::routes::UserIdQuery;
use crate::state::AppState;

const RECENT_ACTIVITY_LIMIT: i64 = 10;

#[derive(Serialize)]
pub struct GamificationProfile {
    pub user_id: Uuid,
    pub total_points: i64,
    pub level: LevelInfo,
    pub streak_days: u32,
    pub achievements_unlocked: usize,
    pub achievements_total: usize,
    pub recent_activity: Vec<PointsLedgerRow>,
}

#[derive(Serialize)]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: &'static AchievementDef,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct RankingQuery {
    #[serde(default)]
    pub period: RankingPeriod,
    pub limit: Option<u32>,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
    pub user_id: Option<Uuid>,
}

/// GET /api/v1/gamification/profile
pub async fn handle_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<GamificationProfile>, AppError> {
    let user = load_user(&state.db, params.user_id).await?;
    let points = total_points(&state.db, user.id).await?;
    let days = login_days(&state.db, user.id).await?;
    let unlocked = unlocked_achievements(&state.db, user.id).await?;

    let recent_activity = sqlx::query_as::<_, PointsLedgerRow>(
        "SELECT * FROM points_ledger WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user.id)
    .bind(RECENT_ACTIVITY_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(GamificationProfile {
        user_id: user.id,
        total_points: points,
        level: level_for(points),
        streak_days: current_streak(&days, Utc::now().date_naive()),
        achievements_unlocked: unlocked.len(),
        achievements_total: ACHIEVEMENTS.len(),
        recent_activity,
    }))
}

/// POST /api/v1/gamification/daily-login
pub async fn handle_daily_login(
    State(state): State<AppState>,
    Json(req): Json<UserIdQuery>,
) -> Result<Json<DailyLoginOutcome>, AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let outcome = record_daily_login(&state.db, user.id, Utc::now()).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/gamification/achievements
pub async fn handle_achievements(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<AchievementView>>, AppError> {
    let unlocked = unlocked_achievements(&state.db, params.user_id).await?;
    let views = ACHIEVEMENTS
        .iter()
        .map(|achievement| AchievementView {
            achievement,
            unlocked_at: unlocked
                .iter()
                .find(|u| u.achievement_code == achievement.code)
                .map(|u| u.unlocked_at),
        })
        .collect();
    Ok(Json(views))
}

/// GET /api/v1/gamification/rewards
pub async fn handle_rewards(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<RewardView>>, AppError> {
    let level = level_for(total_points(&state.db, params.user_id).await?).level;
    let claimed = claimed_rewards(&state.db, params.user_id).await?;
    Ok(Json(reward_views(level, &claimed)))
}

/// POST /api/v1/gamification/rewards/:code/claim
pub async fn handle_claim_reward(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<UserIdQuery>,
) -> Result<Json<UserRewardRow>, AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let level = level_for(total_points(&state.db, user.id).await?).level;
    let claimed = claimed_rewards(&state.db, user.id).await?;
    let reward = check_claim(&code, level, &claimed)?;
    Ok(Json(insert_claim(&state.db, user.id, reward).await?))
}

/// GET /api/v1/rankings
pub async fn handle_rankings(
    State(state): State<AppState>,
    Query(params): Query<RankingQuery>,
) -> Result<Json<Leaderboard>, AppError> {
    let board = load_leaderboard(
        &state.db,
        params.period,
        leaderboard_size(params.limit),
        params.user_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(board))
}

/// GET /api/v1/competitions
pub async fn handle_competitions(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompetitionView>>, AppError> {
    Ok(Json(list_competitions(&state.db, Utc::now()).await?))
}

/// GET /api/v1/competitions/:id/leaderboard
pub async fn handle_competition_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<CompetitionLeaderboard>, AppError> {
    let board = competition_leaderboard(
        &state.db,
        id,
        leaderboard_size(params.limit),
        params.user_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(board))
}
