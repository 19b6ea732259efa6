use serde::{Deserialize, Serialize};

use crate::dreams::form::{EnglishLevel, PrimaryObjective};
use crate::errors::AppError;

const MAX_YEARS_EXPERIENCE: u32 = 60;
const MAX_INVESTMENT_USD: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Education {
    HighSchool,
    Bachelor,
    Master,
    Doctorate,
}

/// VisaMatch answers. Yes/no questions default to "no" when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisaQuestionnaire {
    pub objective: PrimaryObjective,
    pub education: Education,
    #[serde(default)]
    pub years_experience: u32,
    #[serde(default)]
    pub has_job_offer: bool,
    #[serde(default)]
    pub has_extraordinary_ability: bool,
    #[serde(default)]
    pub investment_usd: f64,
    #[serde(default)]
    pub owns_business: bool,
    #[serde(default)]
    pub multinational_employee: bool,
    #[serde(default)]
    pub us_citizen_relative: bool,
    #[serde(default)]
    pub treaty_country: bool,
    #[serde(default)]
    pub accepted_to_us_school: bool,
    pub english_level: EnglishLevel,
}

impl VisaQuestionnaire {
    /// Range checks serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.years_experience > MAX_YEARS_EXPERIENCE {
            return Err(AppError::Validation(format!(
                "years_experience must be at most {MAX_YEARS_EXPERIENCE}"
            )));
        }
        if !self.investment_usd.is_finite()
            || !(0.0..=MAX_INVESTMENT_USD).contains(&self.investment_usd)
        {
            return Err(AppError::Validation(
                "investment_usd must be between 0 and 1000000000".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample() -> VisaQuestionnaire {
    VisaQuestionnaire {
        objective: PrimaryObjective::Work,
        education: Education::Bachelor,
        years_experience: 4,
        has_job_offer: false,
        has_extraordinary_ability: false,
        investment_usd: 0.0,
        owns_business: false,
        multinational_employee: false,
        us_citizen_relative: false,
        treaty_country: false,
        accepted_to_us_school: false,
        english_level: EnglishLevel::Intermediate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_payload_defaults_flags() {
        let q: VisaQuestionnaire = serde_json::from_value(serde_json::json!({
            "objective": "study",
            "education": "high_school",
            "english_level": "basic"
        }))
        .unwrap();
        assert_eq!(q.years_experience, 0);
        assert!(!q.accepted_to_us_school);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_education_ordering() {
        assert!(Education::Doctorate > Education::Master);
        assert!(Education::Bachelor > Education::HighSchool);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut q = sample();
        q.years_experience = 61;
        assert!(matches!(q.validate(), Err(AppError::Validation(_))));

        let mut q = sample();
        q.investment_usd = -5.0;
        assert!(matches!(q.validate(), Err(AppError::Validation(_))));

        let mut q = sample();
        q.investment_usd = f64::NAN;
        assert!(q.validate().is_err());
    }
}
