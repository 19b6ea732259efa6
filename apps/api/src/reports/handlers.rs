use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gamification::ledger::{try_award, AwardOutcome};
use crate::gamification::points::ActivityKind;
use crate::models::report::ReportRow;
use crate::models::user::load_user;
use crate::reports::chat::{chat, ChatReply, ChatRequest};
use crate::reports::generator::{
    generate_report, get_report, list_reports, GenerateReportRequest, GeneratedReport,
};
use crate::routes::UserIdQuery;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ReportResponse {
    #[serde(flatten)]
    pub generated: GeneratedReport,
    pub award: Option<AwardOutcome>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub reply: ChatReply,
    pub award: Option<AwardOutcome>,
}

/// POST /api/v1/reports
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let generated = generate_report(&state.db, &state.usage, &state.llm, &req).await?;
    let award = try_award(
        &state.db,
        user.id,
        ActivityKind::ReportGenerated,
        Some(generated.report.id),
    )
    .await;
    Ok((StatusCode::CREATED, Json(ReportResponse { generated, award })))
}

/// GET /api/v1/reports
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<ReportRow>>, AppError> {
    Ok(Json(list_reports(&state.db, params.user_id).await?))
}

/// GET /api/v1/reports/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ReportRow>, AppError> {
    Ok(Json(get_report(&state.db, params.user_id, id).await?))
}

/// POST /api/v1/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let reply = chat(&state.db, &state.usage, &state.llm, &req).await?;
    let award = try_award(&state.db, user.id, ActivityKind::ChatMessage, None).await;
    Ok(Json(ChatResponse { reply, award }))
}
