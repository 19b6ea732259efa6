use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::usage::ToolUsageEventRow;
use crate::usage::limits::ToolKind;

pub const DEFAULT_CHART_DAYS: u32 = 30;
pub const MAX_CHART_DAYS: u32 = 90;

#[derive(Debug, Clone, Serialize)]
pub struct ToolSeries {
    pub tool: ToolKind,
    /// One count per label, zero-filled.
    pub counts: Vec<u32>,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityChart {
    pub labels: Vec<NaiveDate>,
    pub series: Vec<ToolSeries>,
    pub points: Vec<i64>,
    pub total_points: i64,
}

pub fn chart_days(requested: Option<u32>) -> Result<u32, AppError> {
    match requested {
        None => Ok(DEFAULT_CHART_DAYS),
        Some(d) if (1..=MAX_CHART_DAYS).contains(&d) => Ok(d),
        Some(d) => Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_CHART_DAYS}, got {d}"
        ))),
    }
}

/// First day of a `days`-long window ending on `end` (inclusive).
pub fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    end - Duration::days(i64::from(days.max(1)) - 1)
}

/// Buckets events and daily point sums into a zero-filled daily chart that
/// ends on `end`. Anything outside the window is ignored.
pub fn build_activity_chart(
    events: &[(NaiveDate, ToolKind)],
    points: &[(NaiveDate, i64)],
    end: NaiveDate,
    days: u32,
) -> ActivityChart {
    let start = window_start(end, days);
    let labels: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
    let index: HashMap<NaiveDate, usize> =
        labels.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut counts: HashMap<ToolKind, Vec<u32>> = ToolKind::ALL
        .into_iter()
        .map(|t| (t, vec![0; labels.len()]))
        .collect();
    for (day, tool) in events {
        if let (Some(&i), Some(bucket)) = (index.get(day), counts.get_mut(tool)) {
            bucket[i] += 1;
        }
    }

    let mut point_series = vec![0_i64; labels.len()];
    for (day, value) in points {
        if let Some(&i) = index.get(day) {
            point_series[i] += value;
        }
    }

    let series = ToolKind::ALL
        .into_iter()
        .map(|tool| {
            let counts = counts.remove(&tool).unwrap_or_default();
            let total = counts.iter().sum();
            ToolSeries {
                tool,
                counts,
                total,
            }
        })
        .collect();

    ActivityChart {
        total_points: point_series.iter().sum(),
        labels,
        series,
        points: point_series,
    }
}

/// Loads the raw activity for a user since `since` (UTC midnight of the first day).
pub async fn load_activity(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<(Vec<(NaiveDate, ToolKind)>, Vec<(NaiveDate, i64)>), AppError> {
    let rows = sqlx::query_as::<_, ToolUsageEventRow>(
        "SELECT * FROM tool_usage_events WHERE user_id = $1 AND created_at >= $2",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    let events = rows
        .into_iter()
        .filter_map(|row| match ToolKind::parse(&row.tool) {
            Some(tool) => Some((row.created_at.date_naive(), tool)),
            None => {
                debug!("Skipping usage event with unknown tool '{}'", row.tool);
                None
            }
        })
        .collect();

    let points: Vec<(NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day, SUM(points)::BIGINT AS points
        FROM points_ledger
        WHERE user_id = $1 AND created_at >= $2
        GROUP BY day
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok((events, points))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn test_chart_days_bounds() {
        assert_eq!(chart_days(None).unwrap(), 30);
        assert_eq!(chart_days(Some(90)).unwrap(), 90);
        assert!(chart_days(Some(0)).is_err());
        assert!(chart_days(Some(91)).is_err());
    }

    #[test]
    fn test_empty_activity_is_zero_filled() {
        let chart = build_activity_chart(&[], &[], d(10), 7);
        assert_eq!(chart.labels.len(), 7);
        assert_eq!(chart.labels[0], d(4));
        assert_eq!(chart.labels[6], d(10));
        assert_eq!(chart.series.len(), ToolKind::ALL.len());
        assert!(chart.series.iter().all(|s| s.total == 0 && s.counts.len() == 7));
        assert_eq!(chart.total_points, 0);
    }

    #[test]
    fn test_events_land_in_their_day() {
        let events = vec![
            (d(10), ToolKind::PdfExport),
            (d(10), ToolKind::PdfExport),
            (d(8), ToolKind::Chat),
        ];
        let chart = build_activity_chart(&events, &[(d(9), 40), (d(10), 12)], d(10), 3);
        let pdf = chart
            .series
            .iter()
            .find(|s| s.tool == ToolKind::PdfExport)
            .unwrap();
        assert_eq!(pdf.counts, vec![0, 0, 2]);
        assert_eq!(pdf.total, 2);
        let chat = chart.series.iter().find(|s| s.tool == ToolKind::Chat).unwrap();
        assert_eq!(chat.counts, vec![1, 0, 0]);
        assert_eq!(chart.points, vec![0, 40, 12]);
        assert_eq!(chart.total_points, 52);
    }

    #[test]
    fn test_events_outside_window_ignored() {
        let events = vec![(d(1), ToolKind::AiReport), (d(11), ToolKind::AiReport)];
        let chart = build_activity_chart(&events, &[(d(1), 100)], d(10), 5);
        assert!(chart.series.iter().all(|s| s.total == 0));
        assert_eq!(chart.total_points, 0);
    }

    #[test]
    fn test_window_crosses_month_boundary() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let chart = build_activity_chart(&[], &[], end, 4);
        assert_eq!(
            chart.labels.first().copied(),
            NaiveDate::from_ymd_opt(2025, 2, 27)
        );
    }
}
