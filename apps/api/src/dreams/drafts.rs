//! Draft persistence for the form wizard.
//!
//! Every auto-save is an append-only INSERT with the next version number. The
//! client debounces keystrokes; the server drops saves that change nothing so
//! repeated flushes of the same state do not grow the history.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::lock_user;
use crate::dreams::form::DreamForm;
use crate::models::dream::DreamDraftRow;

#[derive(Debug, Clone, Serialize)]
pub struct SaveDraftOutcome {
    pub version: i32,
    /// False when the payload matched the latest version and nothing was written.
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DraftVersionSummary {
    pub version: i32,
    pub current_step: i16,
    pub created_at: DateTime<Utc>,
}

/// True when `latest` already holds exactly this step and payload.
pub fn is_unchanged(latest: &DreamDraftRow, current_step: i16, data: &Value) -> bool {
    latest.current_step == current_step && &latest.data == data
}

pub const DRAFT_LOCK_SCOPE: &str = "dream_draft";

/// Appends a version unless it matches the latest one. Saves for the same
/// user are serialized, so versions stay gapless and unique.
pub async fn save_draft(
    pool: &PgPool,
    user_id: Uuid,
    current_step: i16,
    form: &DreamForm,
) -> Result<SaveDraftOutcome> {
    let data = serde_json::to_value(form)?;

    let mut tx = pool.begin().await?;
    lock_user(&mut tx, DRAFT_LOCK_SCOPE, user_id).await?;

    let latest = sqlx::query_as::<_, DreamDraftRow>(
        "SELECT * FROM dream_drafts WHERE user_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(latest) = &latest {
        if is_unchanged(latest, current_step, &data) {
            debug!("Draft for user {user_id} unchanged at version {}", latest.version);
            tx.commit().await?;
            return Ok(SaveDraftOutcome {
                version: latest.version,
                saved: false,
            });
        }
    }

    let version = next_version(latest.as_ref());
    sqlx::query(
        r#"
        INSERT INTO dream_drafts (id, user_id, version, current_step, data)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(version)
    .bind(current_step)
    .bind(&data)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Saved dream draft version {version} (step {current_step}) for user {user_id}");

    Ok(SaveDraftOutcome {
        version,
        saved: true,
    })
}

pub fn next_version(latest: Option<&DreamDraftRow>) -> i32 {
    latest.map_or(1, |row| row.version + 1)
}

/// Most recent draft version for a user.
pub async fn latest_draft(pool: &PgPool, user_id: Uuid) -> Result<Option<DreamDraftRow>> {
    Ok(sqlx::query_as::<_, DreamDraftRow>(
        "SELECT * FROM dream_drafts WHERE user_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

/// All draft versions, oldest first, without payloads.
pub async fn draft_history(pool: &PgPool, user_id: Uuid) -> Result<Vec<DraftVersionSummary>> {
    Ok(sqlx::query_as::<_, DraftVersionSummary>(
        "SELECT version, current_step, created_at FROM dream_drafts WHERE user_id = $1 ORDER BY version ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}
