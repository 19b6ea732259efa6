use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::gamification::CompetitionRow;

pub const DEFAULT_LEADERBOARD_SIZE: u32 = 20;
pub const MAX_LEADERBOARD_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPeriod {
    Weekly,
    Monthly,
    #[default]
    AllTime,
}

impl RankingPeriod {
    /// Start of the window containing `now`. `None` means no lower bound.
    pub fn window_start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        match self {
            RankingPeriod::Weekly => {
                let monday =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                Some(monday.and_time(NaiveTime::MIN).and_utc())
            }
            RankingPeriod::Monthly => Utc
                .with_ymd_and_hms(today.year(), today.month(), 1, 0, 0, 0)
                .single(),
            RankingPeriod::AllTime => None,
        }
    }
}

/// Raw aggregate from the ledger, before ranks are assigned.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PointsTotal {
    pub user_id: Uuid,
    pub email: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub display_name: String,
    pub points: i64,
}

#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub period: RankingPeriod,
    pub since: Option<DateTime<Utc>>,
    pub entries: Vec<RankingEntry>,
    pub me: Option<RankingEntry>,
}

/// `ana.souza@example.com` becomes `an***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{visible}***@{domain}")
        }
        None => "***".to_string(),
    }
}

/// Standard competition ranking: ties share a rank and the next rank skips
/// (1, 2, 2, 4). `totals` must already be sorted by points descending.
pub fn assign_ranks(totals: &[PointsTotal], first_rank: u32) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = Vec::with_capacity(totals.len());
    for (i, total) in totals.iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.points == total.points => prev.rank,
            _ => first_rank + i as u32,
        };
        entries.push(RankingEntry {
            rank,
            user_id: total.user_id,
            display_name: mask_email(&total.email),
            points: total.points,
        });
    }
    entries
}

pub fn leaderboard_size(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE)
}

/// Top `limit` users by points earned in `[since, until)`.
pub async fn top_totals(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: u32,
) -> Result<Vec<PointsTotal>, AppError> {
    Ok(sqlx::query_as::<_, PointsTotal>(
        r#"
        SELECT u.id AS user_id, u.email, SUM(p.points)::BIGINT AS points
        FROM points_ledger p
        JOIN users u ON u.id = p.user_id
        WHERE ($1::timestamptz IS NULL OR p.created_at >= $1)
          AND ($2::timestamptz IS NULL OR p.created_at < $2)
        GROUP BY u.id, u.email
        HAVING SUM(p.points) > 0
        ORDER BY points DESC, u.id ASC
        LIMIT $3
        "#,
    )
    .bind(since)
    .bind(until)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?)
}

/// The user's own standing in the same window, with competition rank.
pub async fn user_position(
    pool: &PgPool,
    user_id: Uuid,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<Option<RankingEntry>, AppError> {
    let row: Option<(String, i64, i64)> = sqlx::query_as(
        r#"
        WITH totals AS (
            SELECT p.user_id, SUM(p.points)::BIGINT AS points
            FROM points_ledger p
            WHERE ($2::timestamptz IS NULL OR p.created_at >= $2)
              AND ($3::timestamptz IS NULL OR p.created_at < $3)
            GROUP BY p.user_id
        )
        SELECT u.email, t.points,
               (SELECT COUNT(*) FROM totals o WHERE o.points > t.points) + 1 AS rank
        FROM totals t
        JOIN users u ON u.id = t.user_id
        WHERE t.user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(until)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(email, points, rank)| RankingEntry {
        rank: u32::try_from(rank).unwrap_or(u32::MAX),
        user_id,
        display_name: mask_email(&email),
        points,
    }))
}

pub async fn load_leaderboard(
    pool: &PgPool,
    period: RankingPeriod,
    limit: u32,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<Leaderboard, AppError> {
    let since = period.window_start(now);
    let totals = top_totals(pool, since, None, limit).await?;
    let me = match user_id {
        Some(id) => user_position(pool, id, since, None).await?,
        None => None,
    };
    Ok(Leaderboard {
        period,
        since,
        entries: assign_ranks(&totals, 1),
        me,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Upcoming,
    Active,
    Finished,
}

impl CompetitionStatus {
    pub fn at(competition: &CompetitionRow, now: DateTime<Utc>) -> Self {
        if now < competition.starts_at {
            CompetitionStatus::Upcoming
        } else if now < competition.ends_at {
            CompetitionStatus::Active
        } else {
            CompetitionStatus::Finished
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompetitionView {
    #[serde(flatten)]
    pub competition: CompetitionRow,
    pub status: CompetitionStatus,
}

#[derive(Debug, Serialize)]
pub struct CompetitionLeaderboard {
    pub competition: CompetitionView,
    pub entries: Vec<RankingEntry>,
    pub me: Option<RankingEntry>,
}

pub async fn list_competitions(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<CompetitionView>, AppError> {
    let rows = sqlx::query_as::<_, CompetitionRow>(
        "SELECT * FROM competitions ORDER BY starts_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|competition| CompetitionView {
            status: CompetitionStatus::at(&competition, now),
            competition,
        })
        .collect())
}

/// Ranks points earned inside the competition window. Upcoming competitions
/// have an empty board.
pub async fn competition_leaderboard(
    pool: &PgPool,
    competition_id: Uuid,
    limit: u32,
    user_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<CompetitionLeaderboard, AppError> {
    let competition =
        sqlx::query_as::<_, CompetitionRow>("SELECT * FROM competitions WHERE id = $1")
            .bind(competition_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Competition {competition_id} not found")))?;

    let status = CompetitionStatus::at(&competition, now);
    let (entries, me) = if status == CompetitionStatus::Upcoming {
        (Vec::new(), None)
    } else {
        let since = Some(competition.starts_at);
        let until = Some(competition.ends_at);
        let totals = top_totals(pool, since, until, limit).await?;
        let me = match user_id {
            Some(id) => user_position(pool, id, since, until).await?,
            None => None,
        };
        (assign_ranks(&totals, 1), me)
    };

    Ok(CompetitionLeaderboard {
        competition: CompetitionView {
            competition,
            status,
        },
        entries,
        me,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(email: &str, points: i64) -> PointsTotal {
        PointsTotal {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            points,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_competition_ranking_with_ties() {
        let totals = [
            total("a@x.com", 500),
            total("b@x.com", 300),
            total("c@x.com", 300),
            total("d@x.com", 100),
        ];
        let ranks: Vec<u32> = assign_ranks(&totals, 1).iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_ranking_empty() {
        assert!(assign_ranks(&[], 1).is_empty());
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("ana.souza@example.com"), "an***@example.com");
        assert_eq!(mask_email("a@b.co"), "a***@b.co");
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn test_weekly_window_starts_monday() {
        // 2025-05-15 is a Thursday
        let start = RankingPeriod::Weekly.window_start(at(2025, 5, 15, 18)).unwrap();
        assert_eq!(start, at(2025, 5, 12, 0));
    }

    #[test]
    fn test_weekly_window_on_monday_is_same_day() {
        let start = RankingPeriod::Weekly.window_start(at(2025, 5, 12, 9)).unwrap();
        assert_eq!(start, at(2025, 5, 12, 0));
    }

    #[test]
    fn test_monthly_and_all_time_windows() {
        assert_eq!(
            RankingPeriod::Monthly.window_start(at(2025, 5, 15, 18)),
            Some(at(2025, 5, 1, 0))
        );
        assert_eq!(RankingPeriod::AllTime.window_start(at(2025, 5, 15, 18)), None);
    }

    #[test]
    fn test_leaderboard_size_clamped() {
        assert_eq!(leaderboard_size(None), DEFAULT_LEADERBOARD_SIZE);
        assert_eq!(leaderboard_size(Some(0)), 1);
        assert_eq!(leaderboard_size(Some(5_000)), MAX_LEADERBOARD_SIZE);
    }

    #[test]
    fn test_competition_status() {
        let competition = CompetitionRow {
            id: Uuid::new_v4(),
            title: "Maio".to_string(),
            description: None,
            starts_at: at(2025, 5, 1, 0),
            ends_at: at(2025, 6, 1, 0),
            prize: None,
        };
        assert_eq!(
            CompetitionStatus::at(&competition, at(2025, 4, 30, 23)),
            CompetitionStatus::Upcoming
        );
        assert_eq!(
            CompetitionStatus::at(&competition, at(2025, 5, 1, 0)),
            CompetitionStatus::Active
        );
        assert_eq!(
            CompetitionStatus::at(&competition, at(2025, 6, 1, 0)),
            CompetitionStatus::Finished
        );
    }
}
