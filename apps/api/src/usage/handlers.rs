use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::usage::charts::{build_activity_chart, chart_days, load_activity, window_start, ActivityChart};
use crate::usage::limits::{resolve_plan, Tier, ToolKind};
use crate::usage::tracker::{snapshot, UsageDecision};

#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub tier: Tier,
    pub pro_trial_ends_at: Option<DateTime<Utc>>,
    pub month: String,
    pub tools: Vec<UsageDecision>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub user_id: Uuid,
    pub days: Option<u32>,
}

/// Builds the current-month summary for every tool.
pub async fn usage_summary(state: &AppState, user_id: Uuid) -> Result<UsageSummary, AppError> {
    let now = Utc::now();
    let plan = resolve_plan(&state.db, user_id, now).await?;
    let mut tools = Vec::with_capacity(ToolKind::ALL.len());
    for tool in ToolKind::ALL {
        let used = state.usage.current(user_id, tool, now).await?;
        tools.push(snapshot(tool, used, plan.limit(tool)));
    }
    Ok(UsageSummary {
        tier: plan.effective_tier,
        pro_trial_ends_at: plan.pro_trial_ends_at,
        month: now.format("%Y-%m").to_string(),
        tools,
    })
}

/// GET /api/v1/usage
pub async fn handle_usage_summary(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UsageSummary>, AppError> {
    Ok(Json(usage_summary(&state, params.user_id).await?))
}

/// GET /api/v1/usage/activity
pub async fn handle_activity_chart(
    State(state): State<AppState>,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<ActivityChart>, AppError> {
    let days = chart_days(params.days)?;
    let today = Utc::now().date_naive();
    let start = window_start(today, days);
    let since = start.and_time(NaiveTime::MIN).and_utc();

    let (events, points) = load_activity(&state.db, params.user_id, since).await?;
    Ok(Json(build_activity_chart(&events, &points, today, days)))
}
