//! PRO/FREE monthly limits per tool, plus the reward bonuses that raise them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gamification::rewards::{active_pro_trial, bonus_quota, claimed_rewards};
use crate::models::gamification::UserRewardRow;
use crate::models::user::load_user;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    PdfExport,
    AiReport,
    Chat,
    VisaMatch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::PdfExport,
        ToolKind::AiReport,
        ToolKind::Chat,
        ToolKind::VisaMatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::PdfExport => "pdf_export",
            ToolKind::AiReport => "ai_report",
            ToolKind::Chat => "chat",
            ToolKind::VisaMatch => "visa_match",
        }
    }

    pub fn parse(s: &str) -> Option<ToolKind> {
        ToolKind::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    /// Unknown tier strings fall back to FREE.
    pub fn from_db(s: &str) -> Tier {
        if s.eq_ignore_ascii_case("pro") {
            Tier::Pro
        } else {
            Tier::Free
        }
    }
}

/// Base monthly limit. `None` means unlimited.
pub fn base_monthly_limit(tier: Tier, tool: ToolKind) -> Option<u32> {
    match (tier, tool) {
        (_, ToolKind::VisaMatch) => None,
        (Tier::Free, ToolKind::PdfExport) => Some(2),
        (Tier::Free, ToolKind::AiReport) => Some(1),
        (Tier::Free, ToolKind::Chat) => Some(20),
        (Tier::Pro, ToolKind::PdfExport) => Some(30),
        (Tier::Pro, ToolKind::AiReport) => Some(15),
        (Tier::Pro, ToolKind::Chat) => Some(300),
    }
}

/// The limits that apply to one user right now.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub base_tier: Tier,
    pub effective_tier: Tier,
    pub pro_trial_ends_at: Option<DateTime<Utc>>,
    pub bonuses: HashMap<ToolKind, u32>,
}

impl Plan {
    pub fn from_parts(base_tier: Tier, claimed: &[UserRewardRow], now: DateTime<Utc>) -> Plan {
        let pro_trial_ends_at = active_pro_trial(claimed, now);
        let effective_tier = match (base_tier, pro_trial_ends_at) {
            (Tier::Free, Some(_)) => Tier::Pro,
            (tier, _) => tier,
        };
        let bonuses = ToolKind::ALL
            .into_iter()
            .map(|tool| (tool, bonus_quota(tool, claimed)))
            .filter(|(_, amount)| *amount > 0)
            .collect();
        Plan {
            base_tier,
            effective_tier,
            pro_trial_ends_at,
            bonuses,
        }
    }

    pub fn limit(&self, tool: ToolKind) -> Option<u32> {
        let bonus = self.bonuses.get(&tool).copied().unwrap_or(0);
        base_monthly_limit(self.effective_tier, tool).map(|base| base.saturating_add(bonus))
    }
}

pub async fn resolve_plan(
    pool: &PgPool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Plan, AppError> {
    let user = load_user(pool, user_id).await?;
    let claimed = claimed_rewards(pool, user_id).await?;
    Ok(Plan::from_parts(Tier::from_db(&user.tier), &claimed, now))
}
