//! Points ledger: awards, stats and achievement unlocks.
//!
//! The ledger is append-only. Totals are always `SUM(points)`, never a stored
//! counter, so a replayed or partial award can be audited row by row.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::lock_user;
use crate::errors::AppError;
use crate::gamification::achievements::{evaluate_unlocks, AchievementDef, UserStats};
use crate::gamification::levels::{level_for, LevelInfo};
use crate::gamification::points::{current_streak, streak_bonus, ActivityKind};
use crate::models::gamification::UserAchievementRow;
use crate::usage::limits::ToolKind;

#[derive(Debug, Clone, Serialize)]
pub struct UnlockedAchievement {
    pub code: &'static str,
    pub title: &'static str,
    pub bonus_points: i32,
}

impl From<&'static AchievementDef> for UnlockedAchievement {
    fn from(def: &'static AchievementDef) -> Self {
        Self {
            code: def.code,
            title: def.title,
            bonus_points: def.bonus_points,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AwardOutcome {
    pub activity: ActivityKind,
    pub points_awarded: i32,
    pub total_points: i64,
    pub level: LevelInfo,
    pub leveled_up: bool,
    pub new_achievements: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyLoginOutcome {
    pub already_awarded: bool,
    pub streak_days: u32,
    pub award: Option<AwardOutcome>,
}

pub async fn total_points(pool: &PgPool, user_id: Uuid) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT COALESCE(SUM(points), 0)::BIGINT FROM points_ledger WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?)
}

/// Distinct UTC days with a daily-login award, newest first.
pub async fn login_days(pool: &PgPool, user_id: Uuid) -> Result<Vec<NaiveDate>, AppError> {
    Ok(sqlx::query_scalar(
        r#"
        SELECT DISTINCT (created_at AT TIME ZONE 'UTC')::date AS day
        FROM points_ledger
        WHERE user_id = $1 AND activity = 'daily_login'
        ORDER BY day DESC
        LIMIT 400
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn unlocked_achievements(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<UserAchievementRow>, AppError> {
    Ok(sqlx::query_as::<_, UserAchievementRow>(
        "SELECT * FROM user_achievements WHERE user_id = $1 ORDER BY unlocked_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Gathers every number the achievement criteria look at.
pub async fn load_stats(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<UserStats, AppError> {
    let total_points = total_points(pool, user_id).await?;

    let dreams_created: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM dream_goals WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    let usage_rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT tool, COUNT(*) FROM tool_usage_events WHERE user_id = $1 GROUP BY tool",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    let tool_usage = usage_rows
        .into_iter()
        .filter_map(|(tool, count)| {
            ToolKind::parse(&tool).map(|t| (t, u32::try_from(count).unwrap_or(u32::MAX)))
        })
        .collect();

    let best_visa_score: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(top_score), 0) FROM visa_analyses WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let days = login_days(pool, user_id).await?;

    Ok(UserStats {
        total_points,
        dreams_created: u32::try_from(dreams_created).unwrap_or(u32::MAX),
        tool_usage,
        current_streak: current_streak(&days, today),
        best_visa_score: u32::try_from(best_visa_score).unwrap_or(0),
    })
}

async fn insert_entry(
    pool: &PgPool,
    user_id: Uuid,
    activity: ActivityKind,
    points: i32,
    reference_id: Option<Uuid>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO points_ledger (id, user_id, activity, points, reference_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(activity.as_str())
    .bind(points)
    .bind(reference_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Unlocks whatever the current stats now satisfy and books each bonus.
async fn unlock_achievements(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<UnlockedAchievement>, AppError> {
    let stats = load_stats(pool, user_id, today).await?;
    let have: HashSet<String> = unlocked_achievements(pool, user_id)
        .await?
        .into_iter()
        .map(|row| row.achievement_code)
        .collect();

    let mut unlocked = Vec::new();
    for def in evaluate_unlocks(&stats, &have) {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_achievements (user_id, achievement_code)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(def.code)
        .execute(pool)
        .await?
        .rows_affected();

        // Lost a race with a concurrent award; the winner books the bonus.
        if inserted == 0 {
            continue;
        }
        insert_entry(pool, user_id, ActivityKind::AchievementBonus, def.bonus_points, None).await?;
        info!("User {user_id} unlocked achievement {}", def.code);
        unlocked.push(UnlockedAchievement::from(def));
    }
    Ok(unlocked)
}

async fn finish_award(
    pool: &PgPool,
    user_id: Uuid,
    activity: ActivityKind,
    points_awarded: i32,
    total_before: i64,
    today: NaiveDate,
) -> Result<AwardOutcome, AppError> {
    let new_achievements = unlock_achievements(pool, user_id, today).await?;
    let total_after = total_points(pool, user_id).await?;
    let level = level_for(total_after);
    let leveled_up = level.level > level_for(total_before).level;
    if leveled_up {
        info!("User {user_id} reached level {} ({})", level.level, level.title);
    }
    Ok(AwardOutcome {
        activity,
        points_awarded,
        total_points: total_after,
        level,
        leveled_up,
        new_achievements,
    })
}

/// Books the fixed award for `activity`, then evaluates achievements.
pub async fn award_points(
    pool: &PgPool,
    user_id: Uuid,
    activity: ActivityKind,
    reference_id: Option<Uuid>,
) -> Result<AwardOutcome, AppError> {
    let total_before = total_points(pool, user_id).await?;
    let points = activity.base_points();
    insert_entry(pool, user_id, activity, points, reference_id).await?;
    info!("Awarded {points} points to user {user_id} for {}", activity.as_str());
    finish_award(pool, user_id, activity, points, total_before, Utc::now().date_naive()).await
}

/// Awards points as a side effect of another operation. Failures are logged,
/// never propagated: the primary operation already succeeded.
pub async fn try_award(
    pool: &PgPool,
    user_id: Uuid,
    activity: ActivityKind,
    reference_id: Option<Uuid>,
) -> Option<AwardOutcome> {
    match award_points(pool, user_id, activity, reference_id).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!("Failed to award {} to user {user_id}: {e}", activity.as_str());
            None
        }
    }
}

pub const DAILY_LOGIN_LOCK_SCOPE: &str = "daily_login";

/// Awards the daily login at most once per UTC day, with the streak bonus.
pub async fn record_daily_login(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DailyLoginOutcome, AppError> {
    let today = now.date_naive();
    let day_start = today.and_time(NaiveTime::MIN).and_utc();
    let total_before = total_points(pool, user_id).await?;

    let mut days = login_days(pool, user_id).await?;
    days.push(today);
    let streak_days = current_streak(&days, today);
    let points = ActivityKind::DailyLogin.base_points() + streak_bonus(streak_days);

    // Concurrent logins for the same user queue on the lock, so only the
    // first one of the day sees no row.
    let mut tx = pool.begin().await?;
    lock_user(&mut tx, DAILY_LOGIN_LOCK_SCOPE, user_id).await?;

    let already_awarded: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM points_ledger
            WHERE user_id = $1 AND activity = 'daily_login' AND created_at >= $2
        )
        "#,
    )
    .bind(user_id)
    .bind(day_start)
    .fetch_one(&mut *tx)
    .await?;

    if already_awarded {
        tx.commit().await?;
        return Ok(DailyLoginOutcome {
            already_awarded: true,
            streak_days,
            award: None,
        });
    }

    sqlx::query(
        r#"
        INSERT INTO points_ledger (id, user_id, activity, points)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(ActivityKind::DailyLogin.as_str())
    .bind(points)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Daily login for user {user_id}: streak {streak_days}, {points} points");
    let award = finish_award(
        pool,
        user_id,
        ActivityKind::DailyLogin,
        points,
        total_before,
        today,
    )
    .await?;

    Ok(DailyLoginOutcome {
        already_awarded: false,
        streak_days,
        award: Some(award),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::achievements::find_achievement;

    #[test]
    fn test_unlocked_achievement_from_def() {
        let def = find_achievement("first_pdf").unwrap();
        let view = UnlockedAchievement::from(def);
        assert_eq!(view.code, "first_pdf");
        assert_eq!(view.bonus_points, def.bonus_points);
    }

    #[test]
    fn test_award_outcome_serializes_activity_as_snake_case() {
        let outcome = AwardOutcome {
            activity: ActivityKind::PdfExported,
            points_awarded: 40,
            total_points: 140,
            level: level_for(140),
            leveled_up: true,
            new_achievements: vec![],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["activity"], "pdf_exported");
        assert_eq!(json["level"]["level"], 2);
    }

    #[test]
    fn test_daily_login_lock_is_separate_from_draft_lock() {
        use crate::db::advisory_key;
        use crate::dreams::drafts::DRAFT_LOCK_SCOPE;

        let user = Uuid::from_u128(7);
        assert_ne!(
            advisory_key(DAILY_LOGIN_LOCK_SCOPE, user),
            advisory_key(DRAFT_LOCK_SCOPE, user)
        );
    }
}
