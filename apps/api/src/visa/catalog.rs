//! Visa catalog. Each visa is a list of weighted criteria; a criterion maps the
//! questionnaire to a strength in `0.0..=1.0`.

use serde::Serialize;

use crate::dreams::form::{EnglishLevel, PrimaryObjective};
use crate::visa::questionnaire::{Education, VisaQuestionnaire};

pub const EB5_MIN_INVESTMENT_USD: f64 = 800_000.0;
pub const E2_MIN_INVESTMENT_USD: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisaCategory {
    Immigrant,
    NonImmigrant,
}

#[derive(Serialize)]
pub struct CriterionDef {
    pub key: &'static str,
    pub label: &'static str,
    pub weight: f64,
    /// A weak required criterion caps the whole visa score.
    pub required: bool,
    /// Shown when the criterion ends up as a gap.
    pub suggestion: &'static str,
    #[serde(skip)]
    pub evaluate: fn(&VisaQuestionnaire) -> f64,
}

#[derive(Serialize)]
pub struct VisaDef {
    pub code: &'static str,
    pub name: &'static str,
    pub category: VisaCategory,
    pub description: &'static str,
    pub criteria: &'static [CriterionDef],
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn experience(q: &VisaQuestionnaire, years: u32) -> f64 {
    (f64::from(q.years_experience) / f64::from(years)).min(1.0)
}

/// Full strength at `min`, half strength one level below.
fn education_at_least(q: &VisaQuestionnaire, min: Education) -> f64 {
    if q.education >= min {
        1.0
    } else if (q.education as u8) + 1 == min as u8 {
        0.5
    } else {
        0.0
    }
}

fn english_at_least(q: &VisaQuestionnaire, min: EnglishLevel) -> f64 {
    if q.english_level >= min {
        1.0
    } else if (q.english_level as u8) + 1 == min as u8 {
        0.5
    } else {
        0.1
    }
}

fn investment(q: &VisaQuestionnaire, min: f64) -> f64 {
    (q.investment_usd / min).clamp(0.0, 1.0)
}

fn objective_in(q: &VisaQuestionnaire, objectives: &[PrimaryObjective]) -> f64 {
    if objectives.contains(&q.objective) {
        1.0
    } else {
        0.3
    }
}

/// Master's, or a bachelor's plus five years of progressive experience.
fn advanced_degree(q: &VisaQuestionnaire) -> f64 {
    match q.education {
        Education::Master | Education::Doctorate => 1.0,
        Education::Bachelor if q.years_experience >= 5 => 1.0,
        Education::Bachelor => 0.5,
        Education::HighSchool => 0.0,
    }
}

pub static VISAS: &[VisaDef] = &[
    VisaDef {
        code: "EB-1A",
        name: "EB-1A (Habilidade Extraordinária)",
        category: VisaCategory::Immigrant,
        description: "Green card para quem tem reconhecimento nacional ou internacional na sua área",
        criteria: &[
            CriterionDef {
                key: "extraordinary_ability",
                label: "Habilidade extraordinária comprovada",
                weight: 3.0,
                required: true,
                suggestion: "Reúna prêmios, publicações e cobertura de imprensa sobre seu trabalho",
                evaluate: |q| flag(q.has_extraordinary_ability),
            },
            CriterionDef {
                key: "experience",
                label: "Dez anos de experiência",
                weight: 2.0,
                required: false,
                suggestion: "Documente sua trajetória profissional com cartas de referência",
                evaluate: |q| experience(q, 10),
            },
            CriterionDef {
                key: "education",
                label: "Doutorado",
                weight: 1.0,
                required: false,
                suggestion: "Uma pós-graduação fortalece o caso",
                evaluate: |q| education_at_least(q, Education::Doctorate),
            },
        ],
    },
    VisaDef {
        code: "EB-2 NIW",
        name: "EB-2 NIW (Interesse Nacional)",
        category: VisaCategory::Immigrant,
        description: "Green card sem oferta de emprego para profissionais com formação avançada",
        criteria: &[
            CriterionDef {
                key: "advanced_degree",
                label: "Mestrado, ou graduação e cinco anos de experiência",
                weight: 3.0,
                required: true,
                suggestion: "Considere um mestrado ou acumule cinco anos de experiência após a graduação",
                evaluate: advanced_degree,
            },
            CriterionDef {
                key: "experience",
                label: "Cinco anos de experiência",
                weight: 2.0,
                required: false,
                suggestion: "Documente projetos de impacto na sua área",
                evaluate: |q| experience(q, 5),
            },
            CriterionDef {
                key: "english",
                label: "Inglês avançado",
                weight: 1.0,
                required: false,
                suggestion: "Invista em inglês para entrevistas e documentação",
                evaluate: |q| english_at_least(q, EnglishLevel::Advanced),
            },
            CriterionDef {
                key: "objective",
                label: "Objetivo profissional",
                weight: 1.0,
                required: false,
                suggestion: "O NIW exige um plano de atuação profissional nos EUA",
                evaluate: |q| {
                    objective_in(q, &[PrimaryObjective::Work, PrimaryObjective::Entrepreneurship])
                },
            },
        ],
    },
    VisaDef {
        code: "EB-3",
        name: "EB-3 (Trabalhador Qualificado)",
        category: VisaCategory::Immigrant,
        description: "Green card patrocinado por um empregador americano",
        criteria: &[
            CriterionDef {
                key: "job_offer",
                label: "Oferta de emprego permanente",
                weight: 3.0,
                required: true,
                suggestion: "Busque empregadores dispostos a patrocinar o processo PERM",
                evaluate: |q| flag(q.has_job_offer),
            },
            CriterionDef {
                key: "experience",
                label: "Dois anos de experiência",
                weight: 2.0,
                required: false,
                suggestion: "Acumule ao menos dois anos de experiência na função",
                evaluate: |q| experience(q, 2),
            },
            CriterionDef {
                key: "english",
                label: "Inglês intermediário",
                weight: 1.0,
                required: false,
                suggestion: "Melhore o inglês para a rotina de trabalho",
                evaluate: |q| english_at_least(q, EnglishLevel::Intermediate),
            },
        ],
    },
    VisaDef {
        code: "EB-5",
        name: "EB-5 (Investidor)",
        category: VisaCategory::Immigrant,
        description: "Green card por investimento mínimo de US$ 800 mil em área prioritária",
        criteria: &[
            CriterionDef {
                key: "investment",
                label: "Investimento de US$ 800 mil",
                weight: 4.0,
                required: true,
                suggestion: "O EB-5 exige ao menos US$ 800 mil de origem comprovada",
                evaluate: |q| investment(q, EB5_MIN_INVESTMENT_USD),
            },
            CriterionDef {
                key: "objective",
                label: "Objetivo de investir",
                weight: 1.0,
                required: false,
                suggestion: "Defina um plano de investimento",
                evaluate: |q| objective_in(q, &[PrimaryObjective::Invest]),
            },
        ],
    },
    VisaDef {
        code: "H-1B",
        name: "H-1B (Ocupação Especializada)",
        category: VisaCategory::NonImmigrant,
        description: "Visto de trabalho temporário para cargos que exigem graduação",
        criteria: &[
            CriterionDef {
                key: "job_offer",
                label: "Oferta de emprego",
                weight: 3.0,
                required: true,
                suggestion: "Encontre um empregador disposto a participar do sorteio H-1B",
                evaluate: |q| flag(q.has_job_offer),
            },
            CriterionDef {
                key: "education",
                label: "Graduação",
                weight: 3.0,
                required: true,
                suggestion: "O H-1B exige diploma de graduação ou equivalência",
                evaluate: |q| education_at_least(q, Education::Bachelor),
            },
            CriterionDef {
                key: "english",
                label: "Inglês intermediário",
                weight: 1.0,
                required: false,
                suggestion: "Melhore o inglês para as entrevistas",
                evaluate: |q| english_at_least(q, EnglishLevel::Intermediate),
            },
        ],
    },
    VisaDef {
        code: "L-1",
        name: "L-1 (Transferência Intraempresa)",
        category: VisaCategory::NonImmigrant,
        description: "Transferência para a filial americana de uma multinacional",
        criteria: &[
            CriterionDef {
                key: "multinational_employee",
                label: "Funcionário de multinacional",
                weight: 4.0,
                required: true,
                suggestion: "Trabalhe ao menos um ano em empresa com operação nos EUA",
                evaluate: |q| flag(q.multinational_employee),
            },
            CriterionDef {
                key: "experience",
                label: "Um ano de experiência",
                weight: 1.0,
                required: false,
                suggestion: "O L-1 exige um ano contínuo na empresa",
                evaluate: |q| experience(q, 1),
            },
            CriterionDef {
                key: "objective",
                label: "Objetivo profissional",
                weight: 1.0,
                required: false,
                suggestion: "O L-1 é voltado a quem vai trabalhar na filial",
                evaluate: |q| objective_in(q, &[PrimaryObjective::Work]),
            },
        ],
    },
    VisaDef {
        code: "O-1",
        name: "O-1 (Habilidade Extraordinária)",
        category: VisaCategory::NonImmigrant,
        description: "Visto temporário para profissionais de destaque",
        criteria: &[
            CriterionDef {
                key: "extraordinary_ability",
                label: "Habilidade extraordinária comprovada",
                weight: 4.0,
                required: true,
                suggestion: "Reúna evidências de destaque: prêmios, mídia, salário acima da média",
                evaluate: |q| flag(q.has_extraordinary_ability),
            },
            CriterionDef {
                key: "experience",
                label: "Três anos de experiência",
                weight: 1.0,
                required: false,
                suggestion: "Construa um portfólio consistente",
                evaluate: |q| experience(q, 3),
            },
            CriterionDef {
                key: "job_offer",
                label: "Empregador ou agente nos EUA",
                weight: 1.0,
                required: false,
                suggestion: "O O-1 precisa de um empregador ou agente americano",
                evaluate: |q| flag(q.has_job_offer),
            },
        ],
    },
    VisaDef {
        code: "E-2",
        name: "E-2 (Investidor de Tratado)",
        category: VisaCategory::NonImmigrant,
        description: "Visto para cidadãos de países com tratado que investem em negócio próprio",
        criteria: &[
            CriterionDef {
                key: "treaty_country",
                label: "Cidadania de país com tratado",
                weight: 3.0,
                required: true,
                suggestion: "Verifique se você tem cidadania de um país com tratado E-2",
                evaluate: |q| flag(q.treaty_country),
            },
            CriterionDef {
                key: "investment",
                label: "Investimento substancial",
                weight: 3.0,
                required: true,
                suggestion: "Planeje um investimento de ao menos US$ 100 mil",
                evaluate: |q| investment(q, E2_MIN_INVESTMENT_USD),
            },
            CriterionDef {
                key: "owns_business",
                label: "Experiência como empresário",
                weight: 2.0,
                required: false,
                suggestion: "Experiência prévia com negócio próprio fortalece o caso",
                evaluate: |q| flag(q.owns_business),
            },
            CriterionDef {
                key: "objective",
                label: "Objetivo de empreender",
                weight: 1.0,
                required: false,
                suggestion: "Prepare um plano de negócios",
                evaluate: |q| {
                    objective_in(q, &[PrimaryObjective::Invest, PrimaryObjective::Entrepreneurship])
                },
            },
        ],
    },
    VisaDef {
        code: "F-1",
        name: "F-1 (Estudante)",
        category: VisaCategory::NonImmigrant,
        description: "Visto de estudante para cursos acadêmicos",
        criteria: &[
            CriterionDef {
                key: "accepted_to_us_school",
                label: "Aceite em instituição americana",
                weight: 4.0,
                required: true,
                suggestion: "Candidate-se a instituições certificadas pelo SEVP",
                evaluate: |q| flag(q.accepted_to_us_school),
            },
            CriterionDef {
                key: "english",
                label: "Inglês intermediário",
                weight: 2.0,
                required: false,
                suggestion: "Prepare-se para o TOEFL ou IELTS",
                evaluate: |q| english_at_least(q, EnglishLevel::Intermediate),
            },
            CriterionDef {
                key: "objective",
                label: "Objetivo de estudar",
                weight: 1.0,
                required: false,
                suggestion: "O F-1 exige intenção de estudo",
                evaluate: |q| objective_in(q, &[PrimaryObjective::Study]),
            },
        ],
    },
    VisaDef {
        code: "FAMILY",
        name: "Green Card por Família",
        category: VisaCategory::Immigrant,
        description: "Green card patrocinado por cidadão ou residente americano da família",
        criteria: &[
            CriterionDef {
                key: "us_citizen_relative",
                label: "Parente cidadão americano",
                weight: 4.0,
                required: true,
                suggestion: "Este caminho exige um parente próximo cidadão ou residente",
                evaluate: |q| flag(q.us_citizen_relative),
            },
            CriterionDef {
                key: "objective",
                label: "Objetivo de reunir a família",
                weight: 1.0,
                required: false,
                suggestion: "Confirme o vínculo familiar com documentação",
                evaluate: |q| objective_in(q, &[PrimaryObjective::Family]),
            },
        ],
    },
];

pub fn find_visa(code: &str) -> Option<&'static VisaDef> {
    VISAS.iter().find(|v| v.code.eq_ignore_ascii_case(code))
}
