//! AI narrative reports.
//!
//! Pipeline: quota -> dream + visa analysis -> prompt -> LLM (validated, retried)
//! -> persist. Quota is refunded when generation or persistence fails.

use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dreams::form::DreamForm;
use crate::dreams::service::{form_of, get_dream};
use crate::errors::AppError;
use crate::llm_client::prompts::{language_instruction, IMMIGRATION_DISCLAIMER};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::report::ReportRow;
use crate::reports::prompts::{REPORT_PROMPT_TEMPLATE, REPORT_SYSTEM};
use crate::usage::limits::ToolKind;
use crate::usage::tracker::{reserve, settle, UsageDecision, UsageTracker};
use crate::visa::analysis::{get_analysis, latest_analysis, report_of};
use crate::visa::matcher::VisaMatchReport;

/// Extra attempts after the first when the model returns unusable output.
pub const MAX_REPORT_RETRIES: u32 = 2;
pub const MAX_SECTIONS: usize = 12;
pub const DEFAULT_LANGUAGE: &str = "pt-BR";
pub const SUPPORTED_LANGUAGES: &[&str] = &["pt-BR", "en", "es"];
/// Visas included in prompts and printed reports.
pub const TOP_VISAS_IN_CONTEXT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportContent {
    pub title: String,
    pub summary: String,
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateReportRequest {
    pub user_id: Uuid,
    pub dream_id: Uuid,
    pub analysis_id: Option<Uuid>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedReport {
    pub report: ReportRow,
    pub usage: UsageDecision,
}

pub fn resolve_language(requested: Option<&str>) -> Result<&'static str, AppError> {
    match requested.map(str::trim).filter(|l| !l.is_empty()) {
        None => Ok(DEFAULT_LANGUAGE),
        Some(lang) => SUPPORTED_LANGUAGES
            .iter()
            .copied()
            .find(|l| l.eq_ignore_ascii_case(lang))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Unsupported language '{lang}'. Supported: {}",
                    SUPPORTED_LANGUAGES.join(", ")
                ))
            }),
    }
}

/// Rejects structurally valid JSON that is still unusable as a report.
pub fn validate_report_content(content: &ReportContent) -> Result<(), String> {
    if content.title.trim().is_empty() {
        return Err("title is blank".to_string());
    }
    if content.sections.is_empty() || content.sections.len() > MAX_SECTIONS {
        return Err(format!(
            "expected 1 to {MAX_SECTIONS} sections, got {}",
            content.sections.len()
        ));
    }
    if let Some(i) = content
        .sections
        .iter()
        .position(|s| s.heading.trim().is_empty() || s.body.trim().is_empty())
    {
        return Err(format!("section {i} has a blank heading or body"));
    }
    Ok(())
}

/// Compact view of an analysis for prompts: top visas with score and gaps.
pub fn analysis_context(report: &VisaMatchReport) -> serde_json::Value {
    let matches: Vec<_> = report
        .matches
        .iter()
        .take(TOP_VISAS_IN_CONTEXT)
        .map(|m| {
            json!({
                "visa": m.name,
                "code": m.code,
                "score": m.score,
                "eligibility": m.eligibility,
                "gaps": m.gaps.iter().map(|g| g.label.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "top_match": report.top_visa(),
        "matches": matches,
    })
}

pub fn build_report_prompt(
    form: &DreamForm,
    analysis: Option<&VisaMatchReport>,
    language: &str,
) -> Result<String, AppError> {
    let dream_json = serde_json::to_string_pretty(form)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize dream: {e}")))?;
    let analysis_json = match analysis {
        Some(report) => serde_json::to_string_pretty(&analysis_context(report))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize analysis: {e}")))?,
        None => "null".to_string(),
    };

    Ok(REPORT_PROMPT_TEMPLATE
        .replace("{language_instruction}", &language_instruction(language))
        .replace("{disclaimer}", IMMIGRATION_DISCLAIMER)
        .replace("{dream_json}", &dream_json)
        .replace("{analysis_json}", &analysis_json))
}

/// Runs `attempt` until it yields a usable report. Transport and API errors
/// fail fast; unparseable or invalid output is retried up to
/// `MAX_REPORT_RETRIES` times.
async fn retry_report<F, Fut>(mut attempt: F) -> Result<ReportContent, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ReportContent, LlmError>>,
{
    for n in 0..=MAX_REPORT_RETRIES {
        let problem = match attempt().await {
            Ok(content) => match validate_report_content(&content) {
                Ok(()) => return Ok(content),
                Err(problem) => problem,
            },
            Err(LlmError::Parse(e)) => format!("unparseable JSON: {e}"),
            Err(e) => return Err(AppError::Llm(format!("Report LLM call failed: {e}"))),
        };

        warn!(
            "Report attempt {}/{} rejected: {problem}",
            n + 1,
            MAX_REPORT_RETRIES + 1
        );
    }

    Err(AppError::Llm(format!(
        "Report generation failed after {} attempts: model output never passed validation",
        MAX_REPORT_RETRIES + 1
    )))
}

async fn call_llm_with_retry(llm: &LlmClient, prompt: &str) -> Result<ReportContent, AppError> {
    retry_report(|| llm.call_json::<ReportContent>(prompt, REPORT_SYSTEM)).await
}

async fn insert_report(
    pool: &PgPool,
    user_id: Uuid,
    dream_id: Uuid,
    analysis_id: Option<Uuid>,
    language: &str,
    content: &ReportContent,
) -> Result<ReportRow, AppError> {
    let content_json = serde_json::to_value(content)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize report: {e}")))?;
    Ok(sqlx::query_as::<_, ReportRow>(
        r#"
        INSERT INTO reports (id, user_id, dream_id, analysis_id, language, content)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(dream_id)
    .bind(analysis_id)
    .bind(language)
    .bind(&content_json)
    .fetch_one(pool)
    .await?)
}

pub async fn generate_report(
    pool: &PgPool,
    tracker: &UsageTracker,
    llm: &LlmClient,
    req: &GenerateReportRequest,
) -> Result<GeneratedReport, AppError> {
    let language = resolve_language(req.language.as_deref())?;
    let dream = get_dream(pool, req.user_id, req.dream_id).await?;
    let form = form_of(&dream)?;

    let analysis = match req.analysis_id {
        Some(id) => Some(get_analysis(pool, req.user_id, id).await?),
        None => latest_analysis(pool, req.user_id).await?,
    };
    let visa_report = analysis.as_ref().map(report_of).transpose()?;
    let prompt = build_report_prompt(&form, visa_report.as_ref(), language)?;

    let now = Utc::now();
    let usage = reserve(pool, tracker, req.user_id, ToolKind::AiReport, now).await?;

    let result = async {
        let content = call_llm_with_retry(llm, &prompt).await?;
        insert_report(
            pool,
            req.user_id,
            dream.id,
            analysis.as_ref().map(|a| a.id),
            language,
            &content,
        )
        .await
    }
    .await;

    let report = settle(pool, tracker, req.user_id, ToolKind::AiReport, now, result).await?;
    info!(
        "Generated report {} for user {} (dream {}, {language})",
        report.id, req.user_id, dream.id
    );
    Ok(GeneratedReport { report, usage })
}

pub async fn list_reports(pool: &PgPool, user_id: Uuid) -> Result<Vec<ReportRow>, AppError> {
    Ok(sqlx::query_as::<_, ReportRow>(
        "SELECT * FROM reports WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_report(
    pool: &PgPool,
    user_id: Uuid,
    report_id: Uuid,
) -> Result<ReportRow, AppError> {
    sqlx::query_as::<_, ReportRow>("SELECT * FROM reports WHERE id = $1 AND user_id = $2")
        .bind(report_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {report_id} not found")))
}

/// Latest report for a dream, if any. Used by the PDF export.
pub async fn latest_report_for_dream(
    pool: &PgPool,
    user_id: Uuid,
    dream_id: Uuid,
) -> Result<Option<ReportRow>, AppError> {
    Ok(sqlx::query_as::<_, ReportRow>(
        r#"
        SELECT * FROM reports
        WHERE user_id = $1 AND dream_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(dream_id)
    .fetch_optional(pool)
    .await?)
}

pub fn content_of(row: &ReportRow) -> Result<ReportContent, AppError> {
    serde_json::from_value(row.content.clone())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt report {}: {e}", row.id)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::dreams::fixtures::complete_form;
    use crate::visa::catalog::VISAS;
    use crate::visa::matcher::rank_visas;
    use crate::visa::questionnaire::sample;

    fn content(sections: usize) -> ReportContent {
        ReportContent {
            title: "Seu plano para a Flórida".into(),
            summary: "Resumo".into(),
            sections: (0..sections)
                .map(|i| ReportSection {
                    heading: format!("Seção {i}"),
                    body: "Texto".into(),
                })
                .collect(),
            next_steps: vec!["Fazer o VisaMatch".into()],
        }
    }

    #[test]
    fn test_valid_report_passes() {
        assert!(validate_report_content(&content(4)).is_ok());
    }

    #[test]
    fn test_section_count_bounds() {
        assert!(validate_report_content(&content(0)).is_err());
        assert!(validate_report_content(&content(MAX_SECTIONS)).is_ok());
        assert!(validate_report_content(&content(MAX_SECTIONS + 1)).is_err());
    }

    #[test]
    fn test_blank_title_or_body_rejected() {
        let mut c = content(2);
        c.title = "  ".into();
        assert!(validate_report_content(&c).is_err());

        let mut c = content(2);
        c.sections[1].body = String::new();
        assert!(validate_report_content(&c).unwrap_err().contains("section 1"));
    }

    #[test]
    fn test_next_steps_default_to_empty() {
        let c: ReportContent = serde_json::from_value(json!({
            "title": "T",
            "summary": "S",
            "sections": [{"heading": "H", "body": "B"}]
        }))
        .unwrap();
        assert!(c.next_steps.is_empty());
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(resolve_language(None).unwrap(), "pt-BR");
        assert_eq!(resolve_language(Some("  ")).unwrap(), "pt-BR");
        assert_eq!(resolve_language(Some("EN")).unwrap(), "en");
        assert!(matches!(
            resolve_language(Some("klingon")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_prompt_fills_every_placeholder() {
        let report = rank_visas(VISAS, &sample(), "rules");
        let prompt = build_report_prompt(&complete_form(), Some(&report), "pt-BR").unwrap();
        assert!(prompt.contains("Ana Souza"));
        assert!(prompt.contains("Brazilian Portuguese"));
        assert!(!prompt.contains("{dream_json}"));
        assert!(!prompt.contains("{analysis_json}"));
    }

    #[test]
    fn test_prompt_without_analysis_says_null() {
        let prompt = build_report_prompt(&complete_form(), None, "en").unwrap();
        assert!(prompt.contains("VISA ANALYSIS"));
        assert!(prompt.contains("\nnull\n"));
    }

    #[test]
    fn test_analysis_context_keeps_top_five() {
        let report = rank_visas(VISAS, &sample(), "rules");
        let ctx = analysis_context(&report);
        assert_eq!(ctx["matches"].as_array().unwrap().len(), TOP_VISAS_IN_CONTEXT);
    }

    /// Replays scripted LLM results and counts the calls.
    fn scripted(
        results: Vec<Result<ReportContent, LlmError>>,
    ) -> (
        Arc<AtomicU32>,
        impl FnMut() -> std::future::Ready<Result<ReportContent, LlmError>>,
    ) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut results = results.into_iter();
        let attempt = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(results.next().unwrap_or(Err(LlmError::EmptyContent)))
        };
        (calls, attempt)
    }

    fn parse_error() -> LlmError {
        LlmError::Parse(serde_json::from_str::<ReportContent>("not json").unwrap_err())
    }

    #[tokio::test]
    async fn test_valid_on_third_attempt_succeeds() {
        let (calls, attempt) = scripted(vec![Err(parse_error()), Ok(content(0)), Ok(content(3))]);
        let report = retry_report(attempt).await.unwrap();
        assert_eq!(report.sections.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_output_gives_up_after_retries() {
        let (calls, attempt) = scripted(vec![Ok(content(0)), Err(parse_error()), Ok(content(0))]);
        let err = retry_report(attempt).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_REPORT_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_api_error_fails_fast() {
        let (calls, attempt) = scripted(vec![
            Err(LlmError::Api {
                status: 400,
                message: "bad request".into(),
            }),
            Ok(content(2)),
        ]);
        let err = retry_report(attempt).await.unwrap_err();
        assert!(err.to_string().contains("bad request"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
