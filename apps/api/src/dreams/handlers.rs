use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dreams::completeness::{compute_completeness, CompletenessReport};
use crate::dreams::drafts::{
    draft_history, latest_draft, save_draft, DraftVersionSummary, SaveDraftOutcome,
};
use crate::dreams::form::{DreamForm, FormStep};
use crate::dreams::service::{
    delete_dream, form_of, get_dream, list_dreams, submit_dream, update_dream,
};
use crate::dreams::validation::{validate_form, FormValidationResult};
use crate::errors::AppError;
use crate::gamification::ledger::{try_award, AwardOutcome};
use crate::gamification::points::ActivityKind;
use crate::models::dream::{DreamDraftRow, DreamGoalRow};
use crate::models::user::load_user;
use crate::routes::UserIdQuery;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub form: DreamForm,
    pub step: Option<FormStep>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    #[serde(flatten)]
    pub validation: FormValidationResult,
    pub completeness: CompletenessReport,
}

#[derive(Deserialize)]
pub struct SaveDraftRequest {
    pub user_id: Uuid,
    pub current_step: i16,
    #[serde(default)]
    pub form: DreamForm,
}

#[derive(Serialize)]
pub struct SaveDraftResponse {
    #[serde(flatten)]
    pub outcome: SaveDraftOutcome,
    pub completeness: CompletenessReport,
}

#[derive(Serialize)]
pub struct DraftResponse {
    pub draft: DreamDraftRow,
    pub completeness: CompletenessReport,
}

#[derive(Deserialize)]
pub struct DreamRequest {
    pub user_id: Uuid,
    pub form: DreamForm,
}

#[derive(Serialize)]
pub struct DreamResponse {
    pub dream: DreamGoalRow,
    pub completeness: CompletenessReport,
    /// Absent when the points award failed; the dream itself was saved.
    pub award: Option<AwardOutcome>,
}

/// Step indexes accepted on auto-save, one per wizard step.
fn parse_current_step(current_step: i16) -> Result<FormStep, AppError> {
    usize::try_from(current_step)
        .ok()
        .and_then(FormStep::from_index)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "current_step must be between 0 and {}, got {current_step}",
                FormStep::ALL.len() - 1
            ))
        })
}

/// POST /api/v1/dreams/validate
pub async fn handle_validate(Json(req): Json<ValidateRequest>) -> Json<ValidateResponse> {
    let validation = validate_form(&req.form, req.step, Utc::now().date_naive());
    Json(ValidateResponse {
        validation,
        completeness: compute_completeness(&req.form),
    })
}

/// GET /api/v1/dreams/draft
pub async fn handle_get_draft(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DraftResponse>, AppError> {
    let draft = latest_draft(&state.db, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No draft for user {}", params.user_id)))?;
    let form: DreamForm = serde_json::from_value(draft.data.clone())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt draft {}: {e}", draft.id)))?;
    Ok(Json(DraftResponse {
        completeness: compute_completeness(&form),
        draft,
    }))
}

/// PUT /api/v1/dreams/draft
pub async fn handle_save_draft(
    State(state): State<AppState>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<SaveDraftResponse>, AppError> {
    parse_current_step(req.current_step)?;
    let outcome = save_draft(&state.db, req.user_id, req.current_step, &req.form).await?;
    Ok(Json(SaveDraftResponse {
        outcome,
        completeness: compute_completeness(&req.form),
    }))
}

/// GET /api/v1/dreams/draft/history
pub async fn handle_draft_history(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<DraftVersionSummary>>, AppError> {
    Ok(Json(draft_history(&state.db, params.user_id).await?))
}

/// POST /api/v1/dreams
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<DreamRequest>,
) -> Result<(StatusCode, Json<DreamResponse>), AppError> {
    let user = load_user(&state.db, req.user_id).await?;
    let dream = submit_dream(&state.db, user.id, &req.form, Utc::now().date_naive()).await?;
    let award = try_award(&state.db, user.id, ActivityKind::DreamCreated, Some(dream.id)).await;
    Ok((
        StatusCode::CREATED,
        Json(DreamResponse {
            completeness: compute_completeness(&req.form),
            dream,
            award,
        }),
    ))
}

/// GET /api/v1/dreams
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<DreamGoalRow>>, AppError> {
    Ok(Json(list_dreams(&state.db, params.user_id).await?))
}

/// GET /api/v1/dreams/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DreamResponse>, AppError> {
    let dream = get_dream(&state.db, params.user_id, id).await?;
    let form = form_of(&dream)?;
    Ok(Json(DreamResponse {
        completeness: compute_completeness(&form),
        dream,
        award: None,
    }))
}

/// PUT /api/v1/dreams/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DreamRequest>,
) -> Result<Json<DreamResponse>, AppError> {
    let dream = update_dream(&state.db, req.user_id, id, &req.form, Utc::now().date_naive()).await?;
    let award = try_award(&state.db, req.user_id, ActivityKind::DreamUpdated, Some(dream.id)).await;
    Ok(Json(DreamResponse {
        completeness: compute_completeness(&req.form),
        dream,
        award,
    }))
}

/// DELETE /api/v1/dreams/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    delete_dream(&state.db, params.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_step_bounds() {
        assert_eq!(parse_current_step(0).unwrap(), FormStep::Personal);
        assert_eq!(parse_current_step(4).unwrap(), FormStep::Family);
        assert!(matches!(parse_current_step(5), Err(AppError::Validation(_))));
        assert!(matches!(parse_current_step(-1), Err(AppError::Validation(_))));
    }
}
