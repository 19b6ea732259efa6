//! Monthly usage counters in Redis and the usage event log in Postgres.
//!
//! Counter key: `usage:{user_id}:{tool}:{YYYY-MM}`. `INCR` is atomic, so two
//! concurrent requests can never both take the last unit of quota.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::usage::limits::{resolve_plan, ToolKind};

/// Counters outlive their month by a few days so late refunds still land.
const KEY_TTL_SECS: i64 = 40 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageDecision {
    pub tool: ToolKind,
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

pub fn usage_key(user_id: Uuid, tool: ToolKind, now: DateTime<Utc>) -> String {
    format!("usage:{user_id}:{tool}:{}", now.format("%Y-%m"))
}

/// Interprets the counter value after an `INCR`. `Err(limit)` means the use
/// must be rolled back.
pub fn evaluate_consumption(
    tool: ToolKind,
    count_after_incr: i64,
    limit: Option<u32>,
) -> Result<UsageDecision, u32> {
    let used = u32::try_from(count_after_incr.max(0)).unwrap_or(u32::MAX);
    match limit {
        Some(limit) if used > limit => Err(limit),
        Some(limit) => Ok(UsageDecision {
            tool,
            used,
            limit: Some(limit),
            remaining: Some(limit - used),
        }),
        None => Ok(UsageDecision {
            tool,
            used,
            limit: None,
            remaining: None,
        }),
    }
}

/// Summary view of a counter that is not being consumed.
pub fn snapshot(tool: ToolKind, used: u32, limit: Option<u32>) -> UsageDecision {
    UsageDecision {
        tool,
        used,
        limit,
        remaining: limit.map(|l| l.saturating_sub(used)),
    }
}

#[derive(Clone)]
pub struct UsageTracker {
    client: redis::Client,
}

impl UsageTracker {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, AppError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Takes one unit of quota. Over the limit the increment is undone and the
    /// call fails with `LimitExceeded`.
    pub async fn consume(
        &self,
        user_id: Uuid,
        tool: ToolKind,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<UsageDecision, AppError> {
        let key = usage_key(user_id, tool, now);
        let mut conn = self.connection().await?;

        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, KEY_TTL_SECS).await?;
        }

        match evaluate_consumption(tool, count, limit) {
            Ok(decision) => {
                debug!("Usage {key} -> {count} (limit {limit:?})");
                Ok(decision)
            }
            Err(limit) => {
                let _: i64 = conn.decr(&key, 1).await?;
                info!("User {user_id} hit monthly {tool} limit of {limit}");
                Err(AppError::LimitExceeded { tool, limit })
            }
        }
    }

    /// Gives back one unit after a downstream failure. Never goes below zero.
    pub async fn refund(
        &self,
        user_id: Uuid,
        tool: ToolKind,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let key = usage_key(user_id, tool, now);
        let mut conn = self.connection().await?;
        let count: i64 = conn.decr(&key, 1).await?;
        if count < 0 {
            let _: () = conn.set(&key, 0).await?;
        }
        Ok(())
    }

    /// Current month's count without consuming.
    pub async fn current(
        &self,
        user_id: Uuid,
        tool: ToolKind,
        now: DateTime<Utc>,
    ) -> Result<u32, AppError> {
        let key = usage_key(user_id, tool, now);
        let mut conn = self.connection().await?;
        let count: Option<i64> = conn.get(&key).await?;
        Ok(count
            .map(|c| u32::try_from(c.max(0)).unwrap_or(u32::MAX))
            .unwrap_or(0))
    }
}

/// Appends a usage event for charts and achievement counts.
pub async fn record_event(pool: &PgPool, user_id: Uuid, tool: ToolKind) -> Result<(), AppError> {
    sqlx::query("INSERT INTO tool_usage_events (id, user_id, tool) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(tool.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolves the user's plan and takes one unit of `tool` quota.
pub async fn reserve(
    pool: &PgPool,
    tracker: &UsageTracker,
    user_id: Uuid,
    tool: ToolKind,
    now: DateTime<Utc>,
) -> Result<UsageDecision, AppError> {
    let plan = resolve_plan(pool, user_id, now).await?;
    tracker.consume(user_id, tool, plan.limit(tool), now).await
}

/// Where a settled reservation is booked.
#[async_trait]
pub trait UsageBook: Send + Sync {
    async fn record(&self, user_id: Uuid, tool: ToolKind) -> Result<(), AppError>;
    async fn refund(&self, user_id: Uuid, tool: ToolKind, now: DateTime<Utc>)
        -> Result<(), AppError>;
}

/// Events in Postgres, counters in Redis.
pub struct StoredUsage<'a> {
    pub pool: &'a PgPool,
    pub tracker: &'a UsageTracker,
}

#[async_trait]
impl UsageBook for StoredUsage<'_> {
    async fn record(&self, user_id: Uuid, tool: ToolKind) -> Result<(), AppError> {
        record_event(self.pool, user_id, tool).await
    }

    async fn refund(
        &self,
        user_id: Uuid,
        tool: ToolKind,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.tracker.refund(user_id, tool, now).await
    }
}

/// Closes a reservation: logs the event on success, refunds the quota on failure.
/// Bookkeeping failures are logged and never mask the operation's own result.
pub async fn settle_with<T>(
    book: &dyn UsageBook,
    user_id: Uuid,
    tool: ToolKind,
    now: DateTime<Utc>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            if let Err(e) = book.record(user_id, tool).await {
                warn!("Failed to record {tool} usage event for user {user_id}: {e}");
            }
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = book.refund(user_id, tool, now).await {
                warn!("Failed to refund {tool} quota for user {user_id}: {e}");
            }
            Err(err)
        }
    }
}

pub async fn settle<T>(
    pool: &PgPool,
    tracker: &UsageTracker,
    user_id: Uuid,
    tool: ToolKind,
    now: DateTime<Utc>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    settle_with(&StoredUsage { pool, tracker }, user_id, tool, now, result).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_usage_key_is_monthly() {
        let user = Uuid::nil();
        let jan = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            usage_key(user, ToolKind::PdfExport, jan),
            format!("usage:{user}:pdf_export:2025-01")
        );
        assert_ne!(
            usage_key(user, ToolKind::PdfExport, jan),
            usage_key(user, ToolKind::PdfExport, feb)
        );
    }

    #[test]
    fn test_consumption_within_limit() {
        let d = evaluate_consumption(ToolKind::PdfExport, 2, Some(2)).unwrap();
        assert_eq!(d.used, 2);
        assert_eq!(d.remaining, Some(0));
    }

    #[test]
    fn test_consumption_over_limit_is_denied() {
        assert_eq!(evaluate_consumption(ToolKind::PdfExport, 3, Some(2)), Err(2));
    }

    #[test]
    fn test_unlimited_never_denied() {
        let d = evaluate_consumption(ToolKind::VisaMatch, 10_000, None).unwrap();
        assert_eq!(d.limit, None);
        assert_eq!(d.remaining, None);
    }

    #[test]
    fn test_snapshot_saturates() {
        assert_eq!(snapshot(ToolKind::Chat, 25, Some(20)).remaining, Some(0));
        assert_eq!(snapshot(ToolKind::Chat, 5, Some(20)).remaining, Some(15));
    }

    #[derive(Default)]
    struct CountingBook {
        recorded: Mutex<Vec<ToolKind>>,
        refunded: Mutex<Vec<ToolKind>>,
        fail_refund: bool,
    }

    #[async_trait]
    impl UsageBook for CountingBook {
        async fn record(&self, _user_id: Uuid, tool: ToolKind) -> Result<(), AppError> {
            self.recorded.lock().unwrap().push(tool);
            Ok(())
        }

        async fn refund(
            &self,
            _user_id: Uuid,
            tool: ToolKind,
            _now: DateTime<Utc>,
        ) -> Result<(), AppError> {
            self.refunded.lock().unwrap().push(tool);
            if self.fail_refund {
                return Err(AppError::Internal(anyhow::anyhow!("redis down")));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_records_event_without_refund() {
        let book = CountingBook::default();
        let out = settle_with(&book, Uuid::nil(), ToolKind::AiReport, Utc::now(), Ok(7)).await;
        assert_eq!(out.unwrap(), 7);
        assert_eq!(*book.recorded.lock().unwrap(), vec![ToolKind::AiReport]);
        assert!(book.refunded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_refunds_quota() {
        let book = CountingBook::default();
        let out: Result<(), AppError> = settle_with(
            &book,
            Uuid::nil(),
            ToolKind::PdfExport,
            Utc::now(),
            Err(AppError::Storage("S3 upload failed".into())),
        )
        .await;
        assert!(matches!(out, Err(AppError::Storage(_))));
        assert_eq!(*book.refunded.lock().unwrap(), vec![ToolKind::PdfExport]);
        assert!(book.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refund_failure_keeps_original_error() {
        let book = CountingBook {
            fail_refund: true,
            ..Default::default()
        };
        let out: Result<(), AppError> = settle_with(
            &book,
            Uuid::nil(),
            ToolKind::Chat,
            Utc::now(),
            Err(AppError::Llm("timeout".into())),
        )
        .await;
        assert!(matches!(out, Err(AppError::Llm(_))));
    }
}
