use serde::{Deserialize, Serialize};

use crate::dreams::form::{DreamForm, FormStep};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Complete,
    Partial,
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompleteness {
    pub step: FormStep,
    pub answered: usize,
    pub total: usize,
    pub score: f64,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    /// Weighted share of answered required fields, in 0.0..=1.0.
    pub overall_score: f64,
    pub steps: Vec<StepCompleteness>,
    /// First step that is not complete; `None` once the form is full.
    pub next_step: Option<FormStep>,
}

const STEP_WEIGHTS: &[(FormStep, f64)] = &[
    (FormStep::Personal, 0.25),
    (FormStep::Goals, 0.30),
    (FormStep::Timeline, 0.15),
    (FormStep::Finances, 0.15),
    (FormStep::Family, 0.15),
];

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Answered vs total required fields for one step. Optional fields
/// (`target_state`, `monthly_income_usd`) are left out so a form that passes
/// validation is always complete.
fn answered_fields(form: &DreamForm, step: FormStep) -> (usize, usize) {
    let flags: Vec<bool> = match step {
        FormStep::Personal => {
            let p = &form.personal;
            vec![
                has_text(&p.full_name),
                has_text(&p.email),
                p.birth_date.is_some(),
                has_text(&p.current_country),
                has_text(&p.profession),
            ]
        }
        FormStep::Goals => {
            let g = &form.goals;
            vec![
                g.primary_objective.is_some(),
                has_text(&g.dream_description),
                g.motivations.iter().any(|m| !m.trim().is_empty()),
            ]
        }
        FormStep::Timeline => {
            let t = &form.timeline;
            vec![t.target_move_date.is_some(), t.urgency.is_some()]
        }
        FormStep::Finances => {
            let f = &form.finances;
            vec![
                f.available_budget_usd.is_some(),
                f.has_us_sponsor.is_some(),
            ]
        }
        FormStep::Family => {
            let f = &form.family;
            vec![
                f.marital_status.is_some(),
                f.dependents.is_some(),
                f.english_level.is_some(),
            ]
        }
    };
    (flags.iter().filter(|&&f| f).count(), flags.len())
}

pub fn compute_completeness(form: &DreamForm) -> CompletenessReport {
    let mut steps = Vec::with_capacity(STEP_WEIGHTS.len());
    let mut weighted_sum = 0.0;

    for &(step, weight) in STEP_WEIGHTS {
        let (answered, total) = answered_fields(form, step);
        let score = if total == 0 {
            0.0
        } else {
            answered as f64 / total as f64
        };
        let status = match answered {
            0 => StepStatus::Empty,
            n if n == total => StepStatus::Complete,
            _ => StepStatus::Partial,
        };
        weighted_sum += score * weight;
        steps.push(StepCompleteness {
            step,
            answered,
            total,
            score,
            status,
        });
    }

    let total_weight: f64 = STEP_WEIGHTS.iter().map(|(_, w)| w).sum();
    let overall_score = if total_weight > 0.0 {
        (weighted_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let next_step = steps
        .iter()
        .find(|s| s.status != StepStatus::Complete)
        .map(|s| s.step);

    CompletenessReport {
        overall_score,
        steps,
        next_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::dreams::fixtures::complete_form;
    use crate::dreams::validation::validate_form;

    #[test]
    fn test_empty_form_scores_zero() {
        let r = compute_completeness(&DreamForm::default());
        assert_eq!(r.overall_score, 0.0);
        assert!(r.steps.iter().all(|s| s.status == StepStatus::Empty));
        assert_eq!(r.next_step, Some(FormStep::Personal));
    }

    #[test]
    fn test_complete_form_scores_one() {
        let r = compute_completeness(&complete_form());
        assert!((r.overall_score - 1.0).abs() < 1e-9);
        assert_eq!(r.next_step, None);
    }

    #[test]
    fn test_personal_only_is_quarter() {
        let mut form = DreamForm::default();
        form.personal = complete_form().personal;
        let r = compute_completeness(&form);
        assert!((r.overall_score - 0.25).abs() < 1e-9, "was {}", r.overall_score);
        assert_eq!(r.next_step, Some(FormStep::Goals));
    }

    #[test]
    fn test_partial_step_status() {
        let mut form = complete_form();
        form.finances.has_us_sponsor = None;
        let r = compute_completeness(&form);
        let finances = &r.steps[FormStep::Finances.index()];
        assert_eq!(finances.status, StepStatus::Partial);
        assert_eq!((finances.answered, finances.total), (1, 2));
        assert_eq!(r.next_step, Some(FormStep::Finances));
        // 1.0 - 0.15 / 2
        assert!((r.overall_score - 0.925).abs() < 1e-9);
    }

    #[test]
    fn test_optional_fields_do_not_block_completion() {
        let mut form = complete_form();
        form.goals.target_state = None;
        form.finances.monthly_income_usd = None;
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(validate_form(&form, None, today).valid);

        let r = compute_completeness(&form);
        assert!((r.overall_score - 1.0).abs() < 1e-9);
        assert_eq!(r.next_step, None);
        assert!(r.steps.iter().all(|s| s.status == StepStatus::Complete));
    }

    #[test]
    fn test_blank_strings_are_not_answers() {
        let mut form = DreamForm::default();
        form.personal.full_name = Some("  ".into());
        form.goals.motivations = vec![String::new()];
        assert_eq!(compute_completeness(&form).overall_score, 0.0);
    }
}
