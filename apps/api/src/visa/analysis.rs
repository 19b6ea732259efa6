use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::visa::VisaAnalysisRow;
use crate::visa::matcher::VisaMatchReport;
use crate::visa::questionnaire::VisaQuestionnaire;

const HISTORY_LIMIT: i64 = 50;

pub async fn save_analysis(
    pool: &PgPool,
    user_id: Uuid,
    questionnaire: &VisaQuestionnaire,
    report: &VisaMatchReport,
) -> Result<VisaAnalysisRow, AppError> {
    let questionnaire_json = serde_json::to_value(questionnaire)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize questionnaire: {e}")))?;
    let report_json = serde_json::to_value(report)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize visa report: {e}")))?;

    let row = sqlx::query_as::<_, VisaAnalysisRow>(
        r#"
        INSERT INTO visa_analyses (id, user_id, questionnaire, report, top_visa, top_score)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&questionnaire_json)
    .bind(&report_json)
    .bind(report.top_visa())
    .bind(report.top_score() as i32)
    .fetch_one(pool)
    .await?;

    info!(
        "Saved visa analysis {} for user {user_id} (top: {:?})",
        row.id, row.top_visa
    );
    Ok(row)
}

pub async fn analysis_history(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<VisaAnalysisRow>, AppError> {
    Ok(sqlx::query_as::<_, VisaAnalysisRow>(
        "SELECT * FROM visa_analyses WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?)
}

pub async fn get_analysis(
    pool: &PgPool,
    user_id: Uuid,
    analysis_id: Uuid,
) -> Result<VisaAnalysisRow, AppError> {
    sqlx::query_as::<_, VisaAnalysisRow>(
        "SELECT * FROM visa_analyses WHERE id = $1 AND user_id = $2",
    )
    .bind(analysis_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Visa analysis {analysis_id} not found")))
}

pub async fn latest_analysis(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<VisaAnalysisRow>, AppError> {
    Ok(sqlx::query_as::<_, VisaAnalysisRow>(
        "SELECT * FROM visa_analyses WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// Decodes the stored matcher output of an analysis row.
pub fn report_of(row: &VisaAnalysisRow) -> Result<VisaMatchReport, AppError> {
    serde_json::from_value(row.report.clone()).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Corrupt visa report {}: {e}", row.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_report_of_rejects_corrupt_payload() {
        let row = VisaAnalysisRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            questionnaire: json!({}),
            report: json!({"matches": "nope"}),
            top_visa: None,
            top_score: 0,
            created_at: Utc::now(),
        };
        assert!(matches!(report_of(&row), Err(AppError::Internal(_))));
    }
}
