use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::gamification::UserRewardRow;
use crate::usage::limits::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardEffect {
    /// Extra monthly quota for a tool, for as long as the reward is held.
    BonusQuota { tool: ToolKind, amount: u32 },
    /// PRO limits for `days` days from the claim.
    ProTrial { days: i64 },
    ConsultationDiscount { percent: u32 },
}

#[derive(Debug, Serialize)]
pub struct RewardDef {
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub min_level: u32,
    pub effect: RewardEffect,
}

pub static REWARDS: &[RewardDef] = &[
    RewardDef {
        code: "extra_pdf",
        title: "PDF Extra",
        description: "Uma exportação de PDF a mais por mês",
        min_level: 3,
        effect: RewardEffect::BonusQuota { tool: ToolKind::PdfExport, amount: 1 },
    },
    RewardDef {
        code: "extra_report",
        title: "Relatório Extra",
        description: "Um relatório com IA a mais por mês",
        min_level: 4,
        effect: RewardEffect::BonusQuota { tool: ToolKind::AiReport, amount: 1 },
    },
    RewardDef {
        code: "chat_boost",
        title: "Conversa Estendida",
        description: "Vinte perguntas extras ao assistente por mês",
        min_level: 5,
        effect: RewardEffect::BonusQuota { tool: ToolKind::Chat, amount: 20 },
    },
    RewardDef {
        code: "pro_trial",
        title: "Teste PRO",
        description: "Sete dias de recursos PRO",
        min_level: 6,
        effect: RewardEffect::ProTrial { days: 7 },
    },
    RewardDef {
        code: "consultation_discount",
        title: "Desconto em Consultoria",
        description: "15% de desconto em uma consultoria de imigração",
        min_level: 8,
        effect: RewardEffect::ConsultationDiscount { percent: 15 },
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    Locked,
    Available,
    Claimed,
}

#[derive(Debug, Serialize)]
pub struct RewardView {
    #[serde(flatten)]
    pub reward: &'static RewardDef,
    pub status: RewardStatus,
    pub claimed_at: Option<DateTime<Utc>>,
}

pub fn find_reward(code: &str) -> Option<&'static RewardDef> {
    REWARDS.iter().find(|r| r.code == code)
}

pub fn reward_views(level: u32, claimed: &[UserRewardRow]) -> Vec<RewardView> {
    REWARDS
        .iter()
        .map(|reward| {
            let claimed_at = claimed
                .iter()
                .find(|c| c.reward_code == reward.code)
                .map(|c| c.claimed_at);
            let status = match (claimed_at, level >= reward.min_level) {
                (Some(_), _) => RewardStatus::Claimed,
                (None, true) => RewardStatus::Available,
                (None, false) => RewardStatus::Locked,
            };
            RewardView {
                reward,
                status,
                claimed_at,
            }
        })
        .collect()
}

/// Checks whether `code` can be claimed now.
pub fn check_claim(
    code: &str,
    level: u32,
    claimed: &[UserRewardRow],
) -> Result<&'static RewardDef, AppError> {
    let reward =
        find_reward(code).ok_or_else(|| AppError::NotFound(format!("Reward '{code}' not found")))?;
    if claimed.iter().any(|c| c.reward_code == code) {
        return Err(AppError::Conflict(format!("Reward '{code}' already claimed")));
    }
    if level < reward.min_level {
        return Err(AppError::UnprocessableEntity(format!(
            "Reward '{code}' requires level {} (current level {level})",
            reward.min_level
        )));
    }
    Ok(reward)
}

/// Sum of bonus quota granted to `tool` by claimed rewards.
pub fn bonus_quota(tool: ToolKind, claimed: &[UserRewardRow]) -> u32 {
    claimed
        .iter()
        .filter_map(|c| find_reward(&c.reward_code))
        .map(|r| match r.effect {
            RewardEffect::BonusQuota { tool: t, amount } if t == tool => amount,
            _ => 0,
        })
        .sum()
}

/// End of the PRO trial if one is running at `now`.
pub fn active_pro_trial(claimed: &[UserRewardRow], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    claimed
        .iter()
        .filter_map(|c| match find_reward(&c.reward_code)?.effect {
            RewardEffect::ProTrial { days } => Some(c.claimed_at + Duration::days(days)),
            _ => None,
        })
        .filter(|ends_at| *ends_at > now)
        .max()
}

pub async fn claimed_rewards(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserRewardRow>, AppError> {
    Ok(sqlx::query_as::<_, UserRewardRow>(
        "SELECT * FROM user_rewards WHERE user_id = $1 ORDER BY claimed_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// Records a claim after `check_claim` passed. A concurrent duplicate claim
/// loses on the primary key and is reported as a conflict.
pub async fn insert_claim(
    pool: &PgPool,
    user_id: Uuid,
    reward: &'static RewardDef,
) -> Result<UserRewardRow, AppError> {
    let row = sqlx::query_as::<_, UserRewardRow>(
        r#"
        INSERT INTO user_rewards (user_id, reward_code)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(reward.code)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Reward '{}' already claimed", reward.code)))?;

    info!("User {user_id} claimed reward {}", reward.code);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(code: &str, claimed_at: DateTime<Utc>) -> UserRewardRow {
        UserRewardRow {
            user_id: Uuid::nil(),
            reward_code: code.to_string(),
            claimed_at,
        }
    }

    #[test]
    fn test_views_reflect_level_and_claims() {
        let views = reward_views(4, &[claim("extra_pdf", Utc::now())]);
        let status = |code: &str| {
            views
                .iter()
                .find(|v| v.reward.code == code)
                .map(|v| v.status)
                .unwrap()
        };
        assert_eq!(status("extra_pdf"), RewardStatus::Claimed);
        assert_eq!(status("extra_report"), RewardStatus::Available);
        assert_eq!(status("chat_boost"), RewardStatus::Locked);
    }

    #[test]
    fn test_claim_requires_level() {
        let err = check_claim("pro_trial", 5, &[]).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        assert!(check_claim("pro_trial", 6, &[]).is_ok());
    }

    #[test]
    fn test_claim_twice_conflicts() {
        let err = check_claim("extra_pdf", 9, &[claim("extra_pdf", Utc::now())]).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_unknown_reward_is_not_found() {
        assert!(matches!(
            check_claim("free_greencard", 10, &[]),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_bonus_quota_only_for_matching_tool() {
        let now = Utc::now();
        let claimed = [claim("extra_pdf", now), claim("chat_boost", now), claim("pro_trial", now)];
        assert_eq!(bonus_quota(ToolKind::PdfExport, &claimed), 1);
        assert_eq!(bonus_quota(ToolKind::Chat, &claimed), 20);
        assert_eq!(bonus_quota(ToolKind::AiReport, &claimed), 0);
    }

    #[test]
    fn test_pro_trial_window() {
        let now = Utc::now();
        let started = now - Duration::days(3);
        assert_eq!(
            active_pro_trial(&[claim("pro_trial", started)], now),
            Some(started + Duration::days(7))
        );
        assert_eq!(
            active_pro_trial(&[claim("pro_trial", now - Duration::days(8))], now),
            None
        );
        assert_eq!(active_pro_trial(&[claim("extra_pdf", now)], now), None);
    }
}
