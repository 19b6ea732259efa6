use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dreams::service::get_dream;
use crate::errors::AppError;
use crate::gamification::ledger::{try_award, AwardOutcome};
use crate::gamification::points::ActivityKind;
use crate::models::report::PdfExportRow;
use crate::models::user::load_user;
use crate::pdf::export::{
    download_export, download_filename, export_pdf, get_export, list_exports, PdfExportOutcome,
    PDF_CONTENT_TYPE,
};
use crate::routes::UserIdQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub user_id: Uuid,
    pub dream_id: Uuid,
}

#[derive(Serialize)]
pub struct ExportResponse {
    #[serde(flatten)]
    pub outcome: PdfExportOutcome,
    pub award: Option<AwardOutcome>,
}

/// POST /api/v1/pdf
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<(StatusCode, Json<ExportResponse>), AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let outcome = export_pdf(
        &state.db,
        &state.usage,
        &state.s3,
        &state.config.s3_bucket,
        user.id,
        req.dream_id,
    )
    .await?;
    let award = try_award(
        &state.db,
        user.id,
        ActivityKind::PdfExported,
        Some(outcome.export.id),
    )
    .await;
    Ok((StatusCode::CREATED, Json(ExportResponse { outcome, award })))
}

/// GET /api/v1/pdf
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<PdfExportRow>>, AppError> {
    Ok(Json(list_exports(&state.db, params.user_id).await?))
}

/// GET /api/v1/pdf/:id/download
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Response, AppError> {
    let export = get_export(&state.db, params.user_id, id).await?;
    // The dream may have been deleted since; fall back to a generic name.
    let filename = match get_dream(&state.db, params.user_id, export.dream_id).await {
        Ok(dream) => download_filename(&dream.title),
        Err(AppError::NotFound(_)) => download_filename(""),
        Err(e) => return Err(e),
    };
    let body = download_export(&state.s3, &state.config.s3_bucket, &export).await?;

    Ok((
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}
