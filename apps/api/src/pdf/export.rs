//! PDF export of a dream plan: gather, render off the async executor, upload
//! to S3 and record the export. Each export consumes one `pdf_export` unit.

use std::future::Future;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dreams::service::{form_of, get_dream};
use crate::errors::AppError;
use crate::gamification::achievements::ACHIEVEMENTS;
use crate::gamification::ledger::{total_points, unlocked_achievements};
use crate::gamification::levels::level_for;
use crate::models::report::PdfExportRow;
use crate::pdf::document::{build_document, ExportContext, ProgressSummary};
use crate::pdf::render::render_document;
use crate::reports::generator::{content_of, latest_report_for_dream};
use crate::usage::limits::ToolKind;
use crate::usage::tracker::{reserve, settle, UsageDecision, UsageTracker};
use crate::visa::analysis::{latest_analysis, report_of};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize)]
pub struct PdfExportOutcome {
    pub export: PdfExportRow,
    pub usage: UsageDecision,
}

pub fn export_key(user_id: Uuid, export_id: Uuid) -> String {
    format!("pdf-exports/{user_id}/{export_id}.pdf")
}

/// `Trabalhar nos EUA (FL)` becomes `lifeway-trabalhar-nos-eua-fl.pdf`.
pub fn download_filename(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        let c = match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
            'é' | 'ê' | 'è' | 'É' | 'Ê' | 'È' => 'e',
            'í' | 'ì' | 'Í' | 'Ì' => 'i',
            'ó' | 'ô' | 'õ' | 'ò' | 'Ó' | 'Ô' | 'Õ' | 'Ò' => 'o',
            'ú' | 'ü' | 'ù' | 'Ú' | 'Ü' | 'Ù' => 'u',
            'ç' | 'Ç' => 'c',
            c => c.to_ascii_lowercase(),
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "lifeway-plano.pdf".to_string()
    } else {
        format!("lifeway-{slug}.pdf")
    }
}

async fn load_progress(pool: &PgPool, user_id: Uuid) -> Result<ProgressSummary, AppError> {
    let points = total_points(pool, user_id).await?;
    let unlocked = unlocked_achievements(pool, user_id).await?;
    Ok(ProgressSummary {
        total_points: points,
        level: level_for(points),
        achievements_unlocked: unlocked.len(),
        achievements_total: ACHIEVEMENTS.len(),
    })
}

/// Everything printed in the export. The report is tied to the dream; the
/// visa analysis is the user's latest.
pub async fn gather_context(
    pool: &PgPool,
    user_id: Uuid,
    dream_id: Uuid,
) -> Result<ExportContext, AppError> {
    let dream = get_dream(pool, user_id, dream_id).await?;
    let form = form_of(&dream)?;

    let analysis = latest_analysis(pool, user_id)
        .await?
        .as_ref()
        .map(report_of)
        .transpose()?;
    let report = latest_report_for_dream(pool, user_id, dream_id)
        .await?
        .as_ref()
        .map(content_of)
        .transpose()?;
    let progress = load_progress(pool, user_id).await?;

    Ok(ExportContext {
        title: dream.title,
        form,
        analysis,
        report,
        progress: Some(progress),
        generated_on: Utc::now().date_naive(),
    })
}

async fn insert_export(
    pool: &PgPool,
    export_id: Uuid,
    user_id: Uuid,
    dream_id: Uuid,
    s3_key: &str,
    size_bytes: usize,
    page_count: usize,
) -> Result<PdfExportRow, AppError> {
    Ok(sqlx::query_as::<_, PdfExportRow>(
        r#"
        INSERT INTO pdf_exports (id, user_id, dream_id, s3_key, size_bytes, page_count)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(export_id)
    .bind(user_id)
    .bind(dream_id)
    .bind(s3_key)
    .bind(size_bytes as i64)
    .bind(page_count as i32)
    .fetch_one(pool)
    .await?)
}

/// Runs `undo` when `result` is an error. A failing undo is logged and the
/// original error is returned.
async fn undo_on_error<T, F, Fut>(result: Result<T, AppError>, undo: F) -> Result<T, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    if result.is_err() {
        if let Err(e) = undo().await {
            warn!("Cleanup after failed PDF export did not complete: {e}");
        }
    }
    result
}

async fn delete_object(s3: &S3Client, bucket: &str, key: &str) -> Result<(), AppError> {
    s3.delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;
    info!("Removed orphaned PDF export s3://{bucket}/{key}");
    Ok(())
}

pub async fn export_pdf(
    pool: &PgPool,
    tracker: &UsageTracker,
    s3: &S3Client,
    bucket: &str,
    user_id: Uuid,
    dream_id: Uuid,
) -> Result<PdfExportOutcome, AppError> {
    let ctx = gather_context(pool, user_id, dream_id).await?;

    let now = Utc::now();
    let usage = reserve(pool, tracker, user_id, ToolKind::PdfExport, now).await?;

    let result = async {
        // Layout and lopdf serialization are CPU-bound.
        let (bytes, page_count) = tokio::task::spawn_blocking(move || {
            render_document(&build_document(&ctx))
        })
        .await
        .map_err(|e| AppError::Pdf(format!("render task failed: {e}")))??;

        let export_id = Uuid::new_v4();
        let s3_key = export_key(user_id, export_id);
        let size_bytes = bytes.len();
        s3.put_object()
            .bucket(bucket)
            .key(&s3_key)
            .body(ByteStream::from(bytes))
            .content_type(PDF_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded PDF export to s3://{bucket}/{s3_key} ({size_bytes} bytes, {page_count} pages)");

        let inserted =
            insert_export(pool, export_id, user_id, dream_id, &s3_key, size_bytes, page_count)
                .await;
        undo_on_error(inserted, || delete_object(s3, bucket, &s3_key)).await
    }
    .await;

    let export = settle(pool, tracker, user_id, ToolKind::PdfExport, now, result).await?;
    Ok(PdfExportOutcome { export, usage })
}

pub async fn list_exports(pool: &PgPool, user_id: Uuid) -> Result<Vec<PdfExportRow>, AppError> {
    Ok(sqlx::query_as::<_, PdfExportRow>(
        "SELECT * FROM pdf_exports WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_export(
    pool: &PgPool,
    user_id: Uuid,
    export_id: Uuid,
) -> Result<PdfExportRow, AppError> {
    sqlx::query_as::<_, PdfExportRow>("SELECT * FROM pdf_exports WHERE id = $1 AND user_id = $2")
        .bind(export_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("PDF export {export_id} not found")))
}

/// Fetches a stored export's bytes from S3.
pub async fn download_export(
    s3: &S3Client,
    bucket: &str,
    export: &PdfExportRow,
) -> Result<Bytes, AppError> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(&export.s3_key)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 download failed: {e}")))?;
    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::Storage(format!("S3 body read failed: {e}")))?;
    Ok(data.into_bytes())
}
