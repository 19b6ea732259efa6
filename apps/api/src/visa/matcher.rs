//! Visa matching: pluggable, trait-based matcher from questionnaire to ranked visas.
//!
//! `AppState` holds an `Arc<dyn VisaMatcher>`. The default backend is
//! `RuleBasedMatcher`, which scores every catalog visa deterministically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::visa::catalog::{VisaDef, VISAS};
use crate::visa::questionnaire::VisaQuestionnaire;

pub const STRONG_THRESHOLD: f64 = 0.8;
pub const PARTIAL_THRESHOLD: f64 = 0.4;
/// Score ceiling when any required criterion is below `PARTIAL_THRESHOLD`.
pub const REQUIRED_GAP_CAP: u32 = 35;
pub const HIGH_ELIGIBILITY: u32 = 70;
pub const MEDIUM_ELIGIBILITY: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    High,
    Medium,
    Low,
}

impl Eligibility {
    pub fn from_score(score: u32) -> Self {
        if score >= HIGH_ELIGIBILITY {
            Eligibility::High
        } else if score >= MEDIUM_ELIGIBILITY {
            Eligibility::Medium
        } else {
            Eligibility::Low
        }
    }

    pub fn label_pt(self) -> &'static str {
        match self {
            Eligibility::High => "alta",
            Eligibility::Medium => "média",
            Eligibility::Low => "baixa",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionResult {
    pub key: String,
    pub label: String,
    pub strength: f64,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionGap {
    pub key: String,
    pub label: String,
    pub strength: f64,
    pub required: bool,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisaMatch {
    pub code: String,
    pub name: String,
    pub score: u32,
    pub eligibility: Eligibility,
    pub met: Vec<CriterionResult>,     // strength >= 0.8
    pub partial: Vec<CriterionResult>, // 0.4 - 0.79
    pub gaps: Vec<CriterionGap>,       // strength < 0.4
}

/// Full matcher output, persisted as the `report` of an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisaMatchReport {
    pub matches: Vec<VisaMatch>,
    pub top_match: Option<VisaMatch>,
    pub matcher_backend: String,
}

impl VisaMatchReport {
    pub fn top_visa(&self) -> Option<&str> {
        self.top_match.as_ref().map(|m| m.code.as_str())
    }

    pub fn top_score(&self) -> u32 {
        self.top_match.as_ref().map(|m| m.score).unwrap_or(0)
    }
}

/// Implement this to swap matching backends without touching handlers.
#[async_trait]
pub trait VisaMatcher: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn evaluate(&self, questionnaire: &VisaQuestionnaire)
        -> Result<VisaMatchReport, AppError>;
}

pub struct RuleBasedMatcher;

#[async_trait]
impl VisaMatcher for RuleBasedMatcher {
    fn backend(&self) -> &'static str {
        "rules"
    }

    async fn evaluate(
        &self,
        questionnaire: &VisaQuestionnaire,
    ) -> Result<VisaMatchReport, AppError> {
        questionnaire.validate()?;
        Ok(rank_visas(VISAS, questionnaire, self.backend()))
    }
}

/// score = round(sum(strength x weight) / sum(weight) x 100), capped when a
/// required criterion is a gap.
pub fn score_visa(visa: &VisaDef, q: &VisaQuestionnaire) -> VisaMatch {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut required_gap = false;
    let mut met = Vec::new();
    let mut partial = Vec::new();
    let mut gaps = Vec::new();

    for criterion in visa.criteria {
        let strength = (criterion.evaluate)(q).clamp(0.0, 1.0);
        weighted += strength * criterion.weight;
        total_weight += criterion.weight;

        if strength >= STRONG_THRESHOLD {
            met.push(CriterionResult {
                key: criterion.key.to_string(),
                label: criterion.label.to_string(),
                strength,
                required: criterion.required,
            });
        } else if strength >= PARTIAL_THRESHOLD {
            partial.push(CriterionResult {
                key: criterion.key.to_string(),
                label: criterion.label.to_string(),
                strength,
                required: criterion.required,
            });
        } else {
            required_gap |= criterion.required;
            gaps.push(CriterionGap {
                key: criterion.key.to_string(),
                label: criterion.label.to_string(),
                strength,
                required: criterion.required,
                suggestion: criterion.suggestion.to_string(),
            });
        }
    }

    let raw = if total_weight > 0.0 {
        (weighted / total_weight * 100.0).round() as u32
    } else {
        0
    };
    let score = if required_gap {
        raw.min(REQUIRED_GAP_CAP)
    } else {
        raw
    };

    VisaMatch {
        code: visa.code.to_string(),
        name: visa.name.to_string(),
        score,
        eligibility: Eligibility::from_score(score),
        met,
        partial,
        gaps,
    }
}

/// Scores every visa, sorts by score descending then code, and picks the top
/// match among those with at least medium eligibility.
pub fn rank_visas(visas: &[VisaDef], q: &VisaQuestionnaire, backend: &str) -> VisaMatchReport {
    let mut matches: Vec<VisaMatch> = visas.iter().map(|v| score_visa(v, q)).collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.code.cmp(&b.code)));

    let top_match = matches
        .iter()
        .find(|m| m.score >= MEDIUM_ELIGIBILITY)
        .cloned();

    VisaMatchReport {
        matches,
        top_match,
        matcher_backend: backend.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dreams::form::{EnglishLevel, PrimaryObjective};
    use crate::visa::catalog::find_visa;
    use crate::visa::questionnaire::{sample, Education};

    fn score_of(report: &VisaMatchReport, code: &str) -> u32 {
        report
            .matches
            .iter()
            .find(|m| m.code == code)
            .map(|m| m.score)
            .unwrap()
    }

    #[test]
    fn test_eligibility_bands() {
        assert_eq!(Eligibility::from_score(70), Eligibility::High);
        assert_eq!(Eligibility::from_score(69), Eligibility::Medium);
        assert_eq!(Eligibility::from_score(40), Eligibility::Medium);
        assert_eq!(Eligibility::from_score(39), Eligibility::Low);
    }

    #[test]
    fn test_required_gap_caps_score() {
        // Strong everywhere except the required job offer.
        let mut q = sample();
        q.years_experience = 10;
        q.english_level = EnglishLevel::Fluent;
        let eb3 = score_visa(find_visa("EB-3").unwrap(), &q);
        // uncapped: (0*3 + 1*2 + 1*1) / 6 = 50
        assert_eq!(eb3.score, REQUIRED_GAP_CAP);
        assert_eq!(eb3.eligibility, Eligibility::Low);
        assert_eq!(eb3.gaps.len(), 1);
        assert!(eb3.gaps[0].required);
    }

    #[test]
    fn test_weighted_score_rounds() {
        // H-1B: job offer 1*3, bachelor 1*3, english intermediate 1*1 -> 100
        let mut q = sample();
        q.has_job_offer = true;
        let h1b = score_visa(find_visa("H-1B").unwrap(), &q);
        assert_eq!(h1b.score, 100);
        assert_eq!(h1b.met.len(), 3);

        // basic english -> 0.5 -> (3 + 3 + 0.5) / 7 = 92.86 -> 93
        q.english_level = EnglishLevel::Basic;
        let h1b = score_visa(find_visa("H-1B").unwrap(), &q);
        assert_eq!(h1b.score, 93);
        assert_eq!(h1b.partial.len(), 1);
    }

    #[test]
    fn test_matches_sorted_with_code_tiebreak() {
        let report = rank_visas(VISAS, &sample(), "rules");
        for pair in report.matches.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].code <= pair[1].code)
            );
        }
        assert_eq!(report.matches.len(), VISAS.len());
    }

    #[test]
    fn test_no_top_match_below_medium() {
        let mut q = sample();
        q.education = Education::HighSchool;
        q.years_experience = 0;
        q.english_level = EnglishLevel::Basic;
        q.objective = PrimaryObjective::Family;
        let report = rank_visas(VISAS, &q, "rules");
        assert!(report.matches.iter().all(|m| m.score < MEDIUM_ELIGIBILITY));
        assert!(report.top_match.is_none());
        assert_eq!(report.top_score(), 0);
    }

    #[test]
    fn test_investor_profile_tops_with_eb5() {
        let mut q = sample();
        q.objective = PrimaryObjective::Invest;
        q.investment_usd = 900_000.0;
        let report = rank_visas(VISAS, &q, "rules");
        assert_eq!(report.top_visa(), Some("EB-5"));
        assert_eq!(score_of(&report, "EB-5"), 100);
    }

    #[tokio::test]
    async fn test_rule_based_matcher_validates_input() {
        let mut q = sample();
        q.investment_usd = -1.0;
        let err = RuleBasedMatcher.evaluate(&q).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rule_based_matcher_reports_backend() {
        let report = RuleBasedMatcher.evaluate(&sample()).await.unwrap();
        assert_eq!(report.matcher_backend, "rules");
    }
}
