pub mod completeness;
pub mod drafts;
pub mod form;
pub mod handlers;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use crate::dreams::form::{
        DreamForm, EnglishLevel, FamilyStep, FinancesStep, GoalsStep, MaritalStatus,
        PersonalStep, PrimaryObjective, TimelineStep, Urgency,
    };

    /// A form that passes every validation rule.
    pub fn complete_form() -> DreamForm {
        DreamForm {
            personal: PersonalStep {
                full_name: Some("Ana Souza".into()),
                email: Some("ana@example.com".into()),
                birth_date: NaiveDate::from_ymd_opt(1990, 3, 10),
                current_country: Some("Brasil".into()),
                profession: Some("Engenheira de software".into()),
            },
            goals: GoalsStep {
                primary_objective: Some(PrimaryObjective::Work),
                target_state: Some("FL".into()),
                dream_description: Some(
                    "Trabalhar com tecnologia em Miami e criar meus filhos lá".into(),
                ),
                motivations: vec!["Carreira".into(), "Segurança".into()],
            },
            timeline: TimelineStep {
                target_move_date: NaiveDate::from_ymd_opt(2034, 1, 15),
                urgency: Some(Urgency::Medium),
            },
            finances: FinancesStep {
                available_budget_usd: Some(50_000.0),
                monthly_income_usd: Some(4_000.0),
                has_us_sponsor: Some(false),
            },
            family: FamilyStep {
                marital_status: Some(MaritalStatus::Married),
                dependents: Some(2),
                english_level: Some(EnglishLevel::Advanced),
            },
        }
    }
}
