//! Assembles the exported plan from the dream form, the latest visa analysis,
//! the latest report and the user's progress. Empty sections are left out.

use chrono::NaiveDate;

use crate::dreams::form::{DreamForm, EnglishLevel, MaritalStatus, Urgency};
use crate::gamification::levels::LevelInfo;
use crate::reports::generator::{ReportContent, TOP_VISAS_IN_CONTEXT};
use crate::visa::matcher::VisaMatchReport;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(String),
    Subheading(String),
    KeyValue { key: String, value: String },
    Bullet(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub title: String,
    pub subtitle: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone)]
pub struct ProgressSummary {
    pub total_points: i64,
    pub level: LevelInfo,
    pub achievements_unlocked: usize,
    pub achievements_total: usize,
}

/// Everything the exporter knows about one dream.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub title: String,
    pub form: DreamForm,
    pub analysis: Option<VisaMatchReport>,
    pub report: Option<ReportContent>,
    pub progress: Option<ProgressSummary>,
    pub generated_on: NaiveDate,
}

fn kv(key: &str, value: impl Into<String>) -> Block {
    Block::KeyValue {
        key: key.to_string(),
        value: value.into(),
    }
}

/// Pushes a key/value block only when the value is present and non-blank.
fn push_kv(blocks: &mut Vec<Block>, key: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        blocks.push(kv(key, value.trim()));
    }
}

fn section(heading: &str, blocks: Vec<Block>) -> Option<Section> {
    (!blocks.is_empty()).then(|| Section {
        heading: heading.to_string(),
        blocks,
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `50000.0` becomes `US$ 50.000`.
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round().abs() as u64;
    let digits = rounded.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{sign}US$ {grouped}")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Sim"
    } else {
        "Não"
    }
}

fn urgency_pt(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Low => "Baixa",
        Urgency::Medium => "Média",
        Urgency::High => "Alta",
    }
}

fn marital_status_pt(status: MaritalStatus) -> &'static str {
    match status {
        MaritalStatus::Single => "Solteiro(a)",
        MaritalStatus::Married => "Casado(a)",
        MaritalStatus::Divorced => "Divorciado(a)",
        MaritalStatus::Widowed => "Viúvo(a)",
        MaritalStatus::StableUnion => "União estável",
    }
}

fn english_level_pt(level: EnglishLevel) -> &'static str {
    match level {
        EnglishLevel::Basic => "Básico",
        EnglishLevel::Intermediate => "Intermediário",
        EnglishLevel::Advanced => "Avançado",
        EnglishLevel::Fluent => "Fluente",
    }
}

fn profile_section(form: &DreamForm) -> Option<Section> {
    let p = &form.personal;
    let mut blocks = Vec::new();
    push_kv(&mut blocks, "Nome", p.full_name.clone());
    push_kv(&mut blocks, "E-mail", p.email.clone());
    push_kv(&mut blocks, "Data de nascimento", p.birth_date.map(format_date));
    push_kv(&mut blocks, "País atual", p.current_country.clone());
    push_kv(&mut blocks, "Profissão", p.profession.clone());
    section("Perfil", blocks)
}

fn goals_section(form: &DreamForm) -> Option<Section> {
    let g = &form.goals;
    let mut blocks = Vec::new();
    push_kv(
        &mut blocks,
        "Objetivo principal",
        g.primary_objective.map(|o| o.label_pt().to_string()),
    );
    push_kv(
        &mut blocks,
        "Estado de destino",
        g.target_state.as_deref().map(str::to_uppercase),
    );
    if let Some(description) = g.dream_description.as_deref().filter(|d| !d.trim().is_empty()) {
        blocks.push(Block::Paragraph(description.trim().to_string()));
    }
    blocks.extend(
        g.motivations
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(|m| Block::Bullet(m.to_string())),
    );
    section("Objetivos", blocks)
}

fn timeline_section(form: &DreamForm) -> Option<Section> {
    let t = &form.timeline;
    let mut blocks = Vec::new();
    push_kv(&mut blocks, "Data prevista da mudança", t.target_move_date.map(format_date));
    push_kv(&mut blocks, "Urgência", t.urgency.map(|u| urgency_pt(u).to_string()));
    section("Cronograma", blocks)
}

fn finances_section(form: &DreamForm) -> Option<Section> {
    let f = &form.finances;
    let mut blocks = Vec::new();
    push_kv(&mut blocks, "Orçamento disponível", f.available_budget_usd.map(format_usd));
    push_kv(&mut blocks, "Renda mensal", f.monthly_income_usd.map(format_usd));
    push_kv(
        &mut blocks,
        "Patrocinador nos EUA",
        f.has_us_sponsor.map(|s| yes_no(s).to_string()),
    );
    section("Finanças", blocks)
}

fn family_section(form: &DreamForm) -> Option<Section> {
    let f = &form.family;
    let mut blocks = Vec::new();
    push_kv(
        &mut blocks,
        "Estado civil",
        f.marital_status.map(|s| marital_status_pt(s).to_string()),
    );
    push_kv(&mut blocks, "Dependentes", f.dependents.map(|d| d.to_string()));
    push_kv(
        &mut blocks,
        "Nível de inglês",
        f.english_level.map(|l| english_level_pt(l).to_string()),
    );
    section("Família", blocks)
}

fn visa_section(analysis: Option<&VisaMatchReport>) -> Option<Section> {
    let analysis = analysis?;
    let mut blocks = vec![Block::Paragraph(match &analysis.top_match {
        Some(top) => format!(
            "Melhor opção: {} com {}/100 pontos de compatibilidade.",
            top.name, top.score
        ),
        None => "Nenhum visto atingiu elegibilidade média ou alta com as respostas atuais."
            .to_string(),
    })];
    blocks.extend(analysis.matches.iter().take(TOP_VISAS_IN_CONTEXT).map(|m| {
        Block::Bullet(format!(
            "{}: {}/100, elegibilidade {}",
            m.name,
            m.score,
            m.eligibility.label_pt()
        ))
    }));
    section("Análise de Vistos", blocks)
}

fn report_section(report: Option<&ReportContent>) -> Option<Section> {
    let report = report?;
    let mut blocks = Vec::new();
    if !report.title.trim().is_empty() {
        blocks.push(Block::Subheading(report.title.trim().to_string()));
    }
    if !report.summary.trim().is_empty() {
        blocks.push(Block::Paragraph(report.summary.trim().to_string()));
    }
    for s in &report.sections {
        blocks.push(Block::Subheading(s.heading.trim().to_string()));
        blocks.push(Block::Paragraph(s.body.clone()));
    }
    section("Relatório", blocks)
}

/// Report next steps, or the top visa's gap suggestions when there is no report.
fn next_steps_section(
    report: Option<&ReportContent>,
    analysis: Option<&VisaMatchReport>,
) -> Option<Section> {
    let mut steps: Vec<String> = report
        .map(|r| {
            r.next_steps
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if steps.is_empty() {
        if let Some(top) = analysis.and_then(|a| a.top_match.as_ref()) {
            steps = top.gaps.iter().map(|g| g.suggestion.clone()).collect();
        }
    }
    section("Próximos Passos", steps.into_iter().map(Block::Bullet).collect())
}

fn progress_section(progress: Option<&ProgressSummary>) -> Option<Section> {
    let progress = progress?;
    let mut blocks = vec![
        kv(
            "Nível",
            format!("{} - {}", progress.level.level, progress.level.title),
        ),
        kv("Pontos", progress.total_points.to_string()),
        kv(
            "Conquistas",
            format!(
                "{} de {}",
                progress.achievements_unlocked, progress.achievements_total
            ),
        ),
    ];
    if let Some(missing) = progress.level.points_to_next {
        blocks.push(kv("Próximo nível em", format!("{missing} pontos")));
    }
    section("Seu Progresso", blocks)
}

pub fn build_document(ctx: &ExportContext) -> PdfDocument {
    let sections = [
        profile_section(&ctx.form),
        goals_section(&ctx.form),
        timeline_section(&ctx.form),
        finances_section(&ctx.form),
        family_section(&ctx.form),
        visa_section(ctx.analysis.as_ref()),
        report_section(ctx.report.as_ref()),
        next_steps_section(ctx.report.as_ref(), ctx.analysis.as_ref()),
        progress_section(ctx.progress.as_ref()),
    ]
    .into_iter()
    .flatten()
    .collect();

    PdfDocument {
        title: ctx.title.clone(),
        subtitle: Some(format!(
            "Plano de imigração gerado pelo LifeWay USA em {}",
            format_date(ctx.generated_on)
        )),
        sections,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dreams::fixtures::complete_form;
    use crate::gamification::levels::level_for;
    use crate::reports::generator::ReportSection;
    use crate::visa::catalog::VISAS;
    use crate::visa::matcher::{rank_visas, CriterionGap};
    use crate::visa::questionnaire::sample;

    pub(crate) fn full_context() -> ExportContext {
        let mut q = sample();
        q.has_job_offer = true;
        ExportContext {
            title: complete_form().title(),
            form: complete_form(),
            analysis: Some(rank_visas(VISAS, &q, "rules")),
            report: Some(ReportContent {
                title: "Seu caminho para a Flórida".into(),
                summary: "Você tem um perfil competitivo para o H-1B.".into(),
                sections: vec![ReportSection {
                    heading: "Situação atual".into(),
                    body: "Engenheira com quatro anos de experiência.".into(),
                }],
                next_steps: vec!["Atualizar o currículo em inglês".into()],
            }),
            progress: Some(ProgressSummary {
                total_points: 450,
                level: level_for(450),
                achievements_unlocked: 3,
                achievements_total: 12,
            }),
            generated_on: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        }
    }

    fn headings(doc: &PdfDocument) -> Vec<&str> {
        doc.sections.iter().map(|s| s.heading.as_str()).collect()
    }

    #[test]
    fn test_full_context_has_every_section_in_order() {
        let doc = build_document(&full_context());
        assert_eq!(
            headings(&doc),
            vec![
                "Perfil",
                "Objetivos",
                "Cronograma",
                "Finanças",
                "Família",
                "Análise de Vistos",
                "Relatório",
                "Próximos Passos",
                "Seu Progresso",
            ]
        );
        assert_eq!(doc.title, "Trabalhar nos EUA (FL)");
    }

    #[test]
    fn test_empty_form_omits_empty_sections() {
        let ctx = ExportContext {
            title: "Meu sonho nos EUA".into(),
            form: DreamForm::default(),
            analysis: None,
            report: None,
            progress: None,
            generated_on: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        };
        assert!(build_document(&ctx).sections.is_empty());
    }

    #[test]
    fn test_visa_section_lists_top_five() {
        let doc = build_document(&full_context());
        let visas = doc
            .sections
            .iter()
            .find(|s| s.heading == "Análise de Vistos")
            .unwrap();
        let bullets = visas
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::Bullet(_)))
            .count();
        assert_eq!(bullets, TOP_VISAS_IN_CONTEXT);
        assert!(matches!(&visas.blocks[0], Block::Paragraph(p) if p.contains("Melhor opção")));
    }

    #[test]
    fn test_next_steps_fall_back_to_gap_suggestions() {
        let mut ctx = full_context();
        ctx.report = None;
        let mut analysis = ctx.analysis.take().unwrap();
        let mut top = analysis.matches[0].clone();
        top.gaps = vec![CriterionGap {
            key: "english".into(),
            label: "Inglês".into(),
            strength: 0.1,
            required: false,
            suggestion: "Fazer um curso intensivo de inglês".into(),
        }];
        analysis.top_match = Some(top);
        ctx.analysis = Some(analysis);

        let doc = build_document(&ctx);
        assert!(!headings(&doc).contains(&"Relatório"));
        let steps = doc
            .sections
            .iter()
            .find(|s| s.heading == "Próximos Passos")
            .unwrap();
        assert_eq!(
            steps.blocks,
            vec![Block::Bullet("Fazer um curso intensivo de inglês".into())]
        );
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(50_000.0), "US$ 50.000");
        assert_eq!(format_usd(999.0), "US$ 999");
        assert_eq!(format_usd(1_234_567.4), "US$ 1.234.567");
        assert_eq!(format_usd(0.0), "US$ 0");
    }

    #[test]
    fn test_profile_values_are_formatted() {
        let doc = build_document(&full_context());
        let profile = &doc.sections[0];
        assert!(profile.blocks.contains(&Block::KeyValue {
            key: "Data de nascimento".into(),
            value: "10/03/1990".into(),
        }));
        let finances = doc.sections.iter().find(|s| s.heading == "Finanças").unwrap();
        assert!(finances.blocks.contains(&Block::KeyValue {
            key: "Patrocinador nos EUA".into(),
            value: "Não".into(),
        }));
    }
}
