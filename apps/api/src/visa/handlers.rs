use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gamification::ledger::{try_award, AwardOutcome};
use crate::gamification::points::ActivityKind;
use crate::models::user::load_user;
use crate::models::visa::VisaAnalysisRow;
use crate::routes::UserIdQuery;
use crate::state::AppState;
use crate::usage::limits::ToolKind;
use crate::usage::tracker::{reserve, settle};
use crate::visa::analysis::{analysis_history, get_analysis, save_analysis};
use crate::visa::catalog::{find_visa, VisaDef, VISAS};
use crate::visa::matcher::VisaMatchReport;
use crate::visa::questionnaire::VisaQuestionnaire;

#[derive(Deserialize)]
pub struct VisaMatchRequest {
    pub user_id: Uuid,
    pub questionnaire: VisaQuestionnaire,
}

#[derive(Serialize)]
pub struct VisaMatchResponse {
    pub analysis: VisaAnalysisRow,
    pub report: VisaMatchReport,
    pub award: Option<AwardOutcome>,
}

/// GET /api/v1/visas
pub async fn handle_catalog() -> Json<&'static [VisaDef]> {
    Json(VISAS)
}

/// GET /api/v1/visas/:code
pub async fn handle_visa(Path(code): Path<String>) -> Result<Json<&'static VisaDef>, AppError> {
    find_visa(&code)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Visa '{code}' not found")))
}

/// POST /api/v1/visa-match/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Json(questionnaire): Json<VisaQuestionnaire>,
) -> Result<Json<VisaMatchReport>, AppError> {
    Ok(Json(state.visa_matcher.evaluate(&questionnaire).await?))
}

/// POST /api/v1/visa-match
pub async fn handle_match(
    State(state): State<AppState>,
    Json(req): Json<VisaMatchRequest>,
) -> Result<(StatusCode, Json<VisaMatchResponse>), AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let report = state.visa_matcher.evaluate(&req.questionnaire).await?;

    let now = Utc::now();
    reserve(&state.db, &state.usage, user.id, ToolKind::VisaMatch, now).await?;
    let saved = save_analysis(&state.db, user.id, &req.questionnaire, &report).await;
    let analysis = settle(&state.db, &state.usage, user.id, ToolKind::VisaMatch, now, saved).await?;

    let award = try_award(
        &state.db,
        user.id,
        ActivityKind::VisaMatchCompleted,
        Some(analysis.id),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(VisaMatchResponse {
            analysis,
            report,
            award,
        }),
    ))
}

/// GET /api/v1/visa-match/history
pub async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<VisaAnalysisRow>>, AppError> {
    Ok(Json(analysis_history(&state.db, params.user_id).await?))
}

/// GET /api/v1/visa-match/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<VisaAnalysisRow>, AppError> {
    Ok(Json(get_analysis(&state.db, params.user_id, id).await?))
}
