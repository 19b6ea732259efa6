use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Everything that earns points. Stored in `points_ledger.activity` as snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DailyLogin,
    DreamCreated,
    DreamUpdated,
    VisaMatchCompleted,
    ReportGenerated,
    PdfExported,
    ChatMessage,
    AchievementBonus,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::DailyLogin => "daily_login",
            ActivityKind::DreamCreated => "dream_created",
            ActivityKind::DreamUpdated => "dream_updated",
            ActivityKind::VisaMatchCompleted => "visa_match_completed",
            ActivityKind::ReportGenerated => "report_generated",
            ActivityKind::PdfExported => "pdf_exported",
            ActivityKind::ChatMessage => "chat_message",
            ActivityKind::AchievementBonus => "achievement_bonus",
        }
    }

    /// Fixed award for the activity. Achievement bonuses carry their own amount.
    pub fn base_points(self) -> i32 {
        match self {
            ActivityKind::DailyLogin => 10,
            ActivityKind::DreamCreated => 100,
            ActivityKind::DreamUpdated => 10,
            ActivityKind::VisaMatchCompleted => 75,
            ActivityKind::ReportGenerated => 50,
            ActivityKind::PdfExported => 40,
            ActivityKind::ChatMessage => 2,
            ActivityKind::AchievementBonus => 0,
        }
    }
}

const STREAK_BONUS_PER_DAY: i32 = 5;
const STREAK_BONUS_MAX_DAYS: u32 = 6;

/// Extra login points for a streak: nothing on day one, then +5 per day, capped at +30.
pub fn streak_bonus(streak_days: u32) -> i32 {
    let days = streak_days.saturating_sub(1).min(STREAK_BONUS_MAX_DAYS);
    STREAK_BONUS_PER_DAY * days as i32
}

/// Consecutive login days ending today, or ending yesterday if the user has
/// not logged in yet today. Input order and duplicates do not matter.
pub fn current_streak(login_days: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = login_days.iter().copied().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let mut expected = match days.first() {
        Some(&d) if d == today => today,
        Some(&d) if d == today - Duration::days(1) => d,
        _ => return 0,
    };

    let mut streak = 0;
    for day in days {
        if day != expected {
            break;
        }
        streak += 1;
        expected = day - Duration::days(1);
    }
    streak
}
