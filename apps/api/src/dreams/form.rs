//! Criador de Sonhos form data.
//!
//! Every field is optional so a half-filled draft deserializes cleanly; the
//! validation pass decides what is actually required.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The five wizard steps, in the order the client renders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    Personal,
    Goals,
    Timeline,
    Finances,
    Family,
}

impl FormStep {
    pub const ALL: [FormStep; 5] = [
        FormStep::Personal,
        FormStep::Goals,
        FormStep::Timeline,
        FormStep::Finances,
        FormStep::Family,
    ];

    pub fn index(self) -> usize {
        match self {
            FormStep::Personal => 0,
            FormStep::Goals => 1,
            FormStep::Timeline => 2,
            FormStep::Finances => 3,
            FormStep::Family => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<FormStep> {
        FormStep::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormStep::Personal => "personal",
            FormStep::Goals => "goals",
            FormStep::Timeline => "timeline",
            FormStep::Finances => "finances",
            FormStep::Family => "family",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryObjective {
    Work,
    Study,
    Invest,
    Family,
    Entrepreneurship,
}

impl PrimaryObjective {
    pub fn label_pt(self) -> &'static str {
        match self {
            PrimaryObjective::Work => "Trabalhar",
            PrimaryObjective::Study => "Estudar",
            PrimaryObjective::Invest => "Investir",
            PrimaryObjective::Family => "Reunir a família",
            PrimaryObjective::Entrepreneurship => "Empreender",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
    StableUnion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnglishLevel {
    Basic,
    Intermediate,
    Advanced,
    Fluent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalStep {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub current_country: Option<String>,
    pub profession: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsStep {
    pub primary_objective: Option<PrimaryObjective>,
    /// Two-letter US state code (e.g. `FL`).
    pub target_state: Option<String>,
    pub dream_description: Option<String>,
    pub motivations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineStep {
    pub target_move_date: Option<NaiveDate>,
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancesStep {
    pub available_budget_usd: Option<f64>,
    pub monthly_income_usd: Option<f64>,
    pub has_us_sponsor: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyStep {
    pub marital_status: Option<MaritalStatus>,
    pub dependents: Option<u32>,
    pub english_level: Option<EnglishLevel>,
}

/// Full form payload, as the client sends it on auto-save and submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DreamForm {
    pub personal: PersonalStep,
    pub goals: GoalsStep,
    pub timeline: TimelineStep,
    pub finances: FinancesStep,
    pub family: FamilyStep,
}

impl DreamForm {
    /// Human-readable goal title, e.g. "Trabalhar nos EUA (FL)".
    pub fn title(&self) -> String {
        let objective = self
            .goals
            .primary_objective
            .map(PrimaryObjective::label_pt)
            .unwrap_or("Meu sonho");
        match self
            .goals
            .target_state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(state) => format!("{objective} nos EUA ({})", state.to_uppercase()),
            None => format!("{objective} nos EUA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_deserializes() {
        let form: DreamForm =
            serde_json::from_str(r#"{"personal": {"full_name": "Ana Souza"}}"#).unwrap();
        assert_eq!(form.personal.full_name.as_deref(), Some("Ana Souza"));
        assert!(form.goals.motivations.is_empty());
        assert_eq!(form.family, FamilyStep::default());
    }

    #[test]
    fn test_title_with_state() {
        let mut form = DreamForm::default();
        form.goals.primary_objective = Some(PrimaryObjective::Work);
        form.goals.target_state = Some("fl".to_string());
        assert_eq!(form.title(), "Trabalhar nos EUA (FL)");
    }

    #[test]
    fn test_title_without_objective() {
        assert_eq!(DreamForm::default().title(), "Meu sonho nos EUA");
    }

    #[test]
    fn test_step_index_round_trip_bounds() {
        assert_eq!(FormStep::from_index(4), Some(FormStep::Family));
        assert_eq!(FormStep::from_index(5), None);
        assert_eq!(FormStep::Goals.index(), 1);
    }

    #[test]
    fn test_english_level_ordering() {
        assert!(EnglishLevel::Fluent > EnglishLevel::Intermediate);
        assert!(EnglishLevel::Basic < EnglishLevel::Advanced);
    }
}
