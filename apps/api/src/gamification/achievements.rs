//! Achievement catalog and unlock evaluation.
//!
//! Unlocking is cascading: bonus points from one achievement can push the user
//! over a points-based achievement, so evaluation repeats until nothing new
//! unlocks. The catalog is finite, so this always terminates.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::usage::limits::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementCriterion {
    DreamsCreated { count: u32 },
    ToolUsage { tool: ToolKind, count: u32 },
    StreakDays { days: u32 },
    TotalPoints { points: i64 },
    BestVisaScore { score: u32 },
}

#[derive(Debug, Serialize)]
pub struct AchievementDef {
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub criterion: AchievementCriterion,
    pub bonus_points: i32,
}

pub static ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        code: "first_dream",
        title: "Primeiro Sonho",
        description: "Criou seu primeiro plano no Criador de Sonhos",
        criterion: AchievementCriterion::DreamsCreated { count: 1 },
        bonus_points: 25,
    },
    AchievementDef {
        code: "dream_architect",
        title: "Arquiteto de Sonhos",
        description: "Criou três planos de imigração",
        criterion: AchievementCriterion::DreamsCreated { count: 3 },
        bonus_points: 50,
    },
    AchievementDef {
        code: "first_visa_match",
        title: "Primeiro Match",
        description: "Completou o questionário VisaMatch",
        criterion: AchievementCriterion::ToolUsage { tool: ToolKind::VisaMatch, count: 1 },
        bonus_points: 25,
    },
    AchievementDef {
        code: "visa_analyst",
        title: "Analista de Vistos",
        description: "Completou cinco análises VisaMatch",
        criterion: AchievementCriterion::ToolUsage { tool: ToolKind::VisaMatch, count: 5 },
        bonus_points: 50,
    },
    AchievementDef {
        code: "first_pdf",
        title: "Plano no Papel",
        description: "Exportou seu primeiro PDF",
        criterion: AchievementCriterion::ToolUsage { tool: ToolKind::PdfExport, count: 1 },
        bonus_points: 25,
    },
    AchievementDef {
        code: "pdf_collector",
        title: "Colecionador de Planos",
        description: "Exportou dez PDFs",
        criterion: AchievementCriterion::ToolUsage { tool: ToolKind::PdfExport, count: 10 },
        bonus_points: 75,
    },
    AchievementDef {
        code: "first_report",
        title: "Visão de Futuro",
        description: "Gerou seu primeiro relatório com IA",
        criterion: AchievementCriterion::ToolUsage { tool: ToolKind::AiReport, count: 1 },
        bonus_points: 25,
    },
    AchievementDef {
        code: "curious_mind",
        title: "Mente Curiosa",
        description: "Enviou 25 perguntas ao assistente",
        criterion: AchievementCriterion::ToolUsage { tool: ToolKind::Chat, count: 25 },
        bonus_points: 40,
    },
    AchievementDef {
        code: "streak_7",
        title: "Semana Focada",
        description: "Entrou sete dias seguidos",
        criterion: AchievementCriterion::StreakDays { days: 7 },
        bonus_points: 70,
    },
    AchievementDef {
        code: "streak_30",
        title: "Disciplina de Ferro",
        description: "Entrou trinta dias seguidos",
        criterion: AchievementCriterion::StreakDays { days: 30 },
        bonus_points: 300,
    },
    AchievementDef {
        code: "points_1000",
        title: "Mil Pontos",
        description: "Acumulou 1000 pontos",
        criterion: AchievementCriterion::TotalPoints { points: 1_000 },
        bonus_points: 100,
    },
    AchievementDef {
        code: "strong_match",
        title: "Perfil Competitivo",
        description: "Obteve 80 ou mais em um visto no VisaMatch",
        criterion: AchievementCriterion::BestVisaScore { score: 80 },
        bonus_points: 50,
    },
];

/// Everything achievement criteria look at.
#[derive(Debug, Clone, Default)]
pub struct UserStats {
    pub total_points: i64,
    pub dreams_created: u32,
    pub tool_usage: HashMap<ToolKind, u32>,
    pub current_streak: u32,
    pub best_visa_score: u32,
}

impl AchievementCriterion {
    pub fn is_met(&self, stats: &UserStats) -> bool {
        match *self {
            AchievementCriterion::DreamsCreated { count } => stats.dreams_created >= count,
            AchievementCriterion::ToolUsage { tool, count } => {
                stats.tool_usage.get(&tool).copied().unwrap_or(0) >= count
            }
            AchievementCriterion::StreakDays { days } => stats.current_streak >= days,
            AchievementCriterion::TotalPoints { points } => stats.total_points >= points,
            AchievementCriterion::BestVisaScore { score } => stats.best_visa_score >= score,
        }
    }
}

#[cfg(test)]
pub fn find_achievement(code: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.code == code)
}

/// Returns achievements that become unlocked given `stats`, in catalog order
/// within each cascade round. `unlocked` holds codes the user already has.
pub fn evaluate_unlocks(
    stats: &UserStats,
    unlocked: &HashSet<String>,
) -> Vec<&'static AchievementDef> {
    let mut stats = stats.clone();
    let mut have: HashSet<&str> = unlocked.iter().map(String::as_str).collect();
    let mut newly = Vec::new();

    loop {
        let round: Vec<&'static AchievementDef> = ACHIEVEMENTS
            .iter()
            .filter(|a| !have.contains(a.code) && a.criterion.is_met(&stats))
            .collect();
        if round.is_empty() {
            break;
        }
        for achievement in round {
            have.insert(achievement.code);
            stats.total_points += i64::from(achievement.bonus_points);
            newly.push(achievement);
        }
    }
    newly
}
