//! One aggregated view of a user's account for the SPA home screen.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::dreams::service::list_dreams;
use crate::errors::AppError;
use crate::gamification::achievements::ACHIEVEMENTS;
use crate::gamification::ledger::{total_points, unlocked_achievements};
use crate::gamification::levels::{level_for, LevelInfo};
use crate::models::user::load_user;
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::usage::handlers::{usage_summary, UsageSummary};
use crate::visa::analysis::{latest_analysis, report_of};
use crate::visa::matcher::VisaMatch;

#[derive(Debug, Serialize)]
pub struct LatestDream {
    pub id: Uuid,
    pub title: String,
    pub completeness: f64,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user_id: Uuid,
    pub dreams_count: usize,
    pub latest_dream: Option<LatestDream>,
    pub top_visa_match: Option<VisaMatch>,
    pub total_points: i64,
    pub level: LevelInfo,
    pub achievements_unlocked: usize,
    pub achievements_total: usize,
    pub usage: UsageSummary,
}

pub async fn build_dashboard(state: &AppState, user_id: Uuid) -> Result<Dashboard, AppError> {
    let user = load_user(&state.db, user_id).await?;

    let dreams = list_dreams(&state.db, user.id).await?;
    let latest_dream = dreams.first().map(|d| LatestDream {
        id: d.id,
        title: d.title.clone(),
        completeness: d.completeness,
    });

    let top_visa_match = match latest_analysis(&state.db, user.id).await? {
        Some(row) => report_of(&row)?.top_match,
        None => None,
    };

    let points = total_points(&state.db, user.id).await?;
    let unlocked = unlocked_achievements(&state.db, user.id).await?;
    let usage = usage_summary(state, user.id).await?;

    Ok(Dashboard {
        user_id: user.id,
        dreams_count: dreams.len(),
        latest_dream,
        top_visa_match,
        total_points: points,
        level: level_for(points),
        achievements_unlocked: unlocked.len(),
        achievements_total: ACHIEVEMENTS.len(),
        usage,
    })
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(build_dashboard(&state, params.user_id).await?))
}
