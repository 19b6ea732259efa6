//! Field rules for the Criador de Sonhos wizard.
//!
//! Rules run per step so the client can block "next" on the current step only,
//! and all together on submit.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dreams::form::{DreamForm, FormStep};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub step: FormStep,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 120;
const DESCRIPTION_MIN_CHARS: usize = 20;
const DESCRIPTION_MAX_CHARS: usize = 2000;
const MIN_AGE: u32 = 18;
const MAX_AGE: u32 = 100;
const MAX_YEARS_AHEAD: i32 = 15;
const MAX_BUDGET_USD: f64 = 1_000_000_000.0;
const MAX_DEPENDENTS: u32 = 20;

pub const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

struct Collector {
    step: FormStep,
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            step: self.step,
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn require_text(&mut self, field: &str, value: Option<&str>, label: &str) -> Option<String> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v.to_string()),
            None => {
                self.push(field, format!("{label} é obrigatório"));
                None
            }
        }
    }
}

/// Validates the whole form, or a single step when `step` is given.
/// `today` is injected so date rules are deterministic.
pub fn validate_form(
    form: &DreamForm,
    step: Option<FormStep>,
    today: NaiveDate,
) -> FormValidationResult {
    let steps: Vec<FormStep> = match step {
        Some(s) => vec![s],
        None => FormStep::ALL.to_vec(),
    };

    let mut errors = Vec::new();
    for step in steps {
        let mut c = Collector {
            step,
            errors: Vec::new(),
        };
        match step {
            FormStep::Personal => validate_personal(form, today, &mut c),
            FormStep::Goals => validate_goals(form, &mut c),
            FormStep::Timeline => validate_timeline(form, today, &mut c),
            FormStep::Finances => validate_finances(form, &mut c),
            FormStep::Family => validate_family(form, &mut c),
        }
        errors.extend(c.errors);
    }

    FormValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

fn validate_personal(form: &DreamForm, today: NaiveDate, c: &mut Collector) {
    let p = &form.personal;

    if let Some(name) = c.require_text("full_name", p.full_name.as_deref(), "Nome completo") {
        let len = name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
            c.push(
                "full_name",
                format!("Nome deve ter entre {NAME_MIN_CHARS} e {NAME_MAX_CHARS} caracteres"),
            );
        }
    }

    if let Some(email) = c.require_text("email", p.email.as_deref(), "E-mail") {
        if !is_valid_email(&email) {
            c.push("email", "E-mail inválido");
        }
    }

    match p.birth_date {
        None => c.push("birth_date", "Data de nascimento é obrigatória"),
        Some(birth) => match age_on(birth, today) {
            Some(age) if (MIN_AGE..=MAX_AGE).contains(&age) => {}
            _ => c.push(
                "birth_date",
                format!("Idade deve estar entre {MIN_AGE} e {MAX_AGE} anos"),
            ),
        },
    }

    c.require_text("current_country", p.current_country.as_deref(), "País atual");
    c.require_text("profession", p.profession.as_deref(), "Profissão");
}

fn validate_goals(form: &DreamForm, c: &mut Collector) {
    let g = &form.goals;

    if g.primary_objective.is_none() {
        c.push("primary_objective", "Selecione o objetivo principal");
    }

    if let Some(state) = g
        .target_state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let upper = state.to_uppercase();
        if !US_STATE_CODES.contains(&upper.as_str()) {
            c.push("target_state", format!("Estado '{state}' não reconhecido"));
        }
    }

    if let Some(description) =
        c.require_text("dream_description", g.dream_description.as_deref(), "Descrição do sonho")
    {
        let len = description.chars().count();
        if len < DESCRIPTION_MIN_CHARS {
            c.push(
                "dream_description",
                format!("Descreva seu sonho com pelo menos {DESCRIPTION_MIN_CHARS} caracteres"),
            );
        } else if len > DESCRIPTION_MAX_CHARS {
            c.push(
                "dream_description",
                format!("Descrição limitada a {DESCRIPTION_MAX_CHARS} caracteres"),
            );
        }
    }

    if !g.motivations.iter().any(|m| !m.trim().is_empty()) {
        c.push("motivations", "Informe ao menos uma motivação");
    }
}

fn validate_timeline(form: &DreamForm, today: NaiveDate, c: &mut Collector) {
    let t = &form.timeline;

    match t.target_move_date {
        None => c.push("target_move_date", "Data prevista da mudança é obrigatória"),
        Some(date) if date <= today => {
            c.push("target_move_date", "A data prevista deve estar no futuro")
        }
        Some(date) => {
            let limit = today
                .with_year(today.year() + MAX_YEARS_AHEAD)
                // 29 Feb has no counterpart in a non-leap target year
                .or_else(|| NaiveDate::from_ymd_opt(today.year() + MAX_YEARS_AHEAD, 2, 28));
            if limit.is_some_and(|limit| date > limit) {
                c.push(
                    "target_move_date",
                    format!("A data prevista deve estar nos próximos {MAX_YEARS_AHEAD} anos"),
                );
            }
        }
    }

    if t.urgency.is_none() {
        c.push("urgency", "Selecione a urgência");
    }
}

fn validate_finances(form: &DreamForm, c: &mut Collector) {
    let f = &form.finances;

    match f.available_budget_usd {
        None => c.push("available_budget_usd", "Orçamento disponível é obrigatório"),
        Some(b) if !b.is_finite() || !(0.0..=MAX_BUDGET_USD).contains(&b) => {
            c.push("available_budget_usd", "Orçamento fora do intervalo permitido")
        }
        Some(_) => {}
    }

    if let Some(income) = f.monthly_income_usd {
        if !income.is_finite() || income < 0.0 {
            c.push("monthly_income_usd", "Renda mensal não pode ser negativa");
        }
    }

    if f.has_us_sponsor.is_none() {
        c.push("has_us_sponsor", "Informe se possui patrocinador nos EUA");
    }
}

fn validate_family(form: &DreamForm, c: &mut Collector) {
    let f = &form.family;

    if f.marital_status.is_none() {
        c.push("marital_status", "Selecione o estado civil");
    }
    match f.dependents {
        None => c.push("dependents", "Informe o número de dependentes"),
        Some(d) if d > MAX_DEPENDENTS => c.push(
            "dependents",
            format!("Número de dependentes limitado a {MAX_DEPENDENTS}"),
        ),
        Some(_) => {}
    }
    if f.english_level.is_none() {
        c.push("english_level", "Selecione o nível de inglês");
    }
}

/// Structural e-mail check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.len() < 3 {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Full years between `birth` and `today`, or `None` if `birth` is in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
