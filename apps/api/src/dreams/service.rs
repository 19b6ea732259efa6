//! Dream goal CRUD. Every query is scoped by `user_id`; a row owned by another
//! user is indistinguishable from a missing one.

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::dreams::completeness::compute_completeness;
use crate::dreams::form::DreamForm;
use crate::dreams::validation::validate_form;
use crate::errors::AppError;
use crate::models::dream::DreamGoalRow;

/// Rejects the form with 422 and the full error list when any rule fails.
fn ensure_valid(form: &DreamForm, today: NaiveDate) -> Result<(), AppError> {
    let result = validate_form(form, None, today);
    if !result.valid {
        return Err(AppError::UnprocessableEntity(
            serde_json::to_string(&result.errors).unwrap_or_default(),
        ));
    }
    Ok(())
}

/// Decodes the stored form payload of a goal row.
pub fn form_of(row: &DreamGoalRow) -> Result<DreamForm, AppError> {
    serde_json::from_value(row.data.clone())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt dream payload {}: {e}", row.id)))
}

pub async fn submit_dream(
    pool: &PgPool,
    user_id: Uuid,
    form: &DreamForm,
    today: NaiveDate,
) -> Result<DreamGoalRow, AppError> {
    ensure_valid(form, today)?;

    let completeness = compute_completeness(form).overall_score;
    let data = serde_json::to_value(form)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize form: {e}")))?;

    let row = sqlx::query_as::<_, DreamGoalRow>(
        r#"
        INSERT INTO dream_goals (id, user_id, title, data, completeness)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(form.title())
    .bind(&data)
    .bind(completeness)
    .fetch_one(pool)
    .await?;

    info!("Created dream goal {} for user {user_id}", row.id);
    Ok(row)
}

pub async fn list_dreams(pool: &PgPool, user_id: Uuid) -> Result<Vec<DreamGoalRow>, AppError> {
    Ok(sqlx::query_as::<_, DreamGoalRow>(
        "SELECT * FROM dream_goals WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_dream(
    pool: &PgPool,
    user_id: Uuid,
    dream_id: Uuid,
) -> Result<DreamGoalRow, AppError> {
    sqlx::query_as::<_, DreamGoalRow>("SELECT * FROM dream_goals WHERE id = $1 AND user_id = $2")
        .bind(dream_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Dream {dream_id} not found")))
}

pub async fn update_dream(
    pool: &PgPool,
    user_id: Uuid,
    dream_id: Uuid,
    form: &DreamForm,
    today: NaiveDate,
) -> Result<DreamGoalRow, AppError> {
    ensure_valid(form, today)?;

    let completeness = compute_completeness(form).overall_score;
    let data = serde_json::to_value(form)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize form: {e}")))?;

    sqlx::query_as::<_, DreamGoalRow>(
        r#"
        UPDATE dream_goals
        SET title = $1, data = $2, completeness = $3, updated_at = NOW()
        WHERE id = $4 AND user_id = $5
        RETURNING *
        "#,
    )
    .bind(form.title())
    .bind(&data)
    .bind(completeness)
    .bind(dream_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Dream {dream_id} not found")))
}

pub async fn delete_dream(pool: &PgPool, user_id: Uuid, dream_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM dream_goals WHERE id = $1 AND user_id = $2")
        .bind(dream_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Dream {dream_id} not found")));
    }
    info!("Deleted dream goal {dream_id} for user {user_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_ensure_valid_rejects_with_field_list() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let err = ensure_valid(&DreamForm::default(), today).unwrap_err();
        match err {
            AppError::UnprocessableEntity(body) => {
                let errors: serde_json::Value = serde_json::from_str(&body).unwrap();
                assert!(errors.as_array().unwrap().len() >= 10);
            }
            other => panic!("expected 422, got {other:?}"),
        }
    }

    #[test]
    fn test_form_of_rejects_corrupt_payload() {
        let row = DreamGoalRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "x".into(),
            data: serde_json::json!({"personal": 5}),
            completeness: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(form_of(&row), Err(AppError::Internal(_))));
    }
}
