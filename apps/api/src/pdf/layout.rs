//! Text layout: greedy word wrap and pagination onto US Letter pages.
//!
//! Layout is pure and CPU-bound; callers run it inside `spawn_blocking`
//! together with rendering.

use crate::pdf::document::{Block, PdfDocument};
use crate::pdf::metrics::{text_width, Font};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
pub const FOOTER_BASELINE: f32 = 40.0;

const TITLE_SIZE: f32 = 20.0;
const SUBTITLE_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 14.0;
const SUBHEADING_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const FOOTER_SIZE: f32 = 9.0;
const LINE_SPACING: f32 = 1.35;

const HEADING_SPACE_BEFORE: f32 = 14.0;
const BLOCK_SPACE_AFTER: f32 = 5.0;
const BULLET_INDENT: f32 = 18.0;
const BULLET_GLYPH_X: f32 = 6.0;
const HANGING_INDENT: f32 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub font: Font,
    pub text: String,
}

/// One baseline of text. Runs are drawn left to right starting at `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub runs: Vec<TextRun>,
}

impl LayoutLine {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<LayoutLine>,
}

pub fn footer_text(page: usize, total: usize) -> String {
    format!("LifeWay USA | página {page} de {total}")
}

/// Splits a word wider than `max_width` into chunks that fit. Every chunk
/// holds at least one character, so a single glyph wider than the line still
/// makes progress.
fn split_long_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        let mut candidate = current.clone();
        candidate.push(c);
        if !current.is_empty() && text_width(font, &candidate, size) > max_width {
            chunks.push(std::mem::take(&mut current));
            current.push(c);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Greedy word wrap. The first line may be narrower than the rest (used for
/// key/value lines whose key takes part of the first line).
pub fn wrap_text(
    text: &str,
    font: Font,
    size: f32,
    first_width: f32,
    rest_width: f32,
) -> Vec<String> {
    let space_w = text_width(font, " ", size);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_w = 0.0_f32;

    for word in text.split_whitespace() {
        let max_width = if lines.is_empty() { first_width } else { rest_width };
        let word_w = text_width(font, word, size);

        if !current.is_empty() && current_w + space_w + word_w <= max_width {
            current.push(' ');
            current.push_str(word);
            current_w += space_w + word_w;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        let max_width = if lines.is_empty() { first_width } else { rest_width };

        if word_w <= max_width {
            current = word.to_string();
            current_w = word_w;
        } else {
            let mut chunks = split_long_word(word, font, size, max_width.min(rest_width));
            // The last chunk stays open so following words can join it.
            current = chunks.pop().unwrap_or_default();
            current_w = text_width(font, &current, size);
            lines.extend(chunks);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn line_height(size: f32) -> f32 {
    size * LINE_SPACING
}

/// Places lines top to bottom, opening a new page when the next line would
/// cross the bottom margin.
struct Paginator {
    pages: Vec<Page>,
    current: Page,
    /// Top of the next line, measured from the page bottom.
    cursor: f32,
}

impl Paginator {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::default(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn remaining(&self) -> f32 {
        self.cursor - MARGIN
    }

    fn at_page_top(&self) -> bool {
        self.current.lines.is_empty()
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    /// Guarantees `height` points of room, breaking the page if needed.
    fn ensure(&mut self, height: f32) {
        if height > self.remaining() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn gap(&mut self, points: f32) {
        if !self.at_page_top() {
            self.cursor -= points;
        }
    }

    fn push_line(&mut self, x: f32, size: f32, runs: Vec<TextRun>) {
        let height = line_height(size);
        self.ensure(height);
        let y = self.cursor - size;
        self.current.lines.push(LayoutLine { x, y, size, runs });
        self.cursor -= height;
    }

    fn push_wrapped(&mut self, font: Font, size: f32, x: f32, width: f32, text: &str) {
        for line in wrap_text(text, font, size, width, width) {
            self.push_line(x, size, vec![TextRun { font, text: line }]);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.lines.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn layout_block(p: &mut Paginator, block: &Block) {
    match block {
        Block::Paragraph(text) => {
            for paragraph in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                p.push_wrapped(Font::Regular, BODY_SIZE, MARGIN, CONTENT_WIDTH, paragraph);
                p.gap(BLOCK_SPACE_AFTER);
            }
        }
        Block::Subheading(text) => {
            // Keep the subheading with the first line that follows it.
            p.ensure(line_height(SUBHEADING_SIZE) + line_height(BODY_SIZE));
            p.gap(BLOCK_SPACE_AFTER);
            p.push_wrapped(Font::Bold, SUBHEADING_SIZE, MARGIN, CONTENT_WIDTH, text);
        }
        Block::KeyValue { key, value } => {
            let label = format!("{key}: ");
            let label_w = text_width(Font::Bold, &label, BODY_SIZE);
            let lines = wrap_text(
                value,
                Font::Regular,
                BODY_SIZE,
                (CONTENT_WIDTH - label_w).max(0.0),
                CONTENT_WIDTH - HANGING_INDENT,
            );
            let mut lines = lines.into_iter();
            let first = lines.next().unwrap_or_default();
            p.push_line(
                MARGIN,
                BODY_SIZE,
                vec![
                    TextRun {
                        font: Font::Bold,
                        text: label,
                    },
                    TextRun {
                        font: Font::Regular,
                        text: first,
                    },
                ],
            );
            for line in lines {
                p.push_line(
                    MARGIN + HANGING_INDENT,
                    BODY_SIZE,
                    vec![TextRun {
                        font: Font::Regular,
                        text: line,
                    }],
                );
            }
        }
        Block::Bullet(text) => {
            let width = CONTENT_WIDTH - BULLET_INDENT;
            for (i, line) in wrap_text(text, Font::Regular, BODY_SIZE, width, width)
                .into_iter()
                .enumerate()
            {
                if i == 0 {
                    // The glyph and the first line share a baseline.
                    p.ensure(line_height(BODY_SIZE));
                    let y = p.cursor - BODY_SIZE;
                    p.current.lines.push(LayoutLine {
                        x: MARGIN + BULLET_GLYPH_X,
                        y,
                        size: BODY_SIZE,
                        runs: vec![TextRun {
                            font: Font::Regular,
                            text: "•".to_string(),
                        }],
                    });
                }
                p.push_line(
                    MARGIN + BULLET_INDENT,
                    BODY_SIZE,
                    vec![TextRun {
                        font: Font::Regular,
                        text: line,
                    }],
                );
            }
        }
    }
}

/// Lays out the whole document and stamps the footer on every page.
pub fn layout_document(doc: &PdfDocument) -> Vec<Page> {
    let mut p = Paginator::new();

    p.push_wrapped(Font::Bold, TITLE_SIZE, MARGIN, CONTENT_WIDTH, &doc.title);
    if let Some(subtitle) = &doc.subtitle {
        p.push_wrapped(Font::Regular, SUBTITLE_SIZE, MARGIN, CONTENT_WIDTH, subtitle);
    }

    for section in &doc.sections {
        p.gap(HEADING_SPACE_BEFORE);
        // A heading never sits alone at the bottom of a page.
        p.ensure(line_height(HEADING_SIZE) + line_height(BODY_SIZE));
        p.push_wrapped(Font::Bold, HEADING_SIZE, MARGIN, CONTENT_WIDTH, &section.heading);
        p.gap(BLOCK_SPACE_AFTER);
        for block in &section.blocks {
            layout_block(&mut p, block);
        }
    }

    let mut pages = p.finish();
    let total = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        let footer = footer_text(i + 1, total);
        let width = text_width(Font::Regular, &footer, FOOTER_SIZE);
        page.lines.push(LayoutLine {
            x: (PAGE_WIDTH - width) / 2.0,
            y: FOOTER_BASELINE,
            size: FOOTER_SIZE,
            runs: vec![TextRun {
                font: Font::Regular,
                text: footer,
            }],
        });
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::Section;

    fn widths_fit(lines: &[String], first: f32, rest: f32) -> bool {
        lines.iter().enumerate().all(|(i, l)| {
            let max = if i == 0 { first } else { rest };
            text_width(Font::Regular, l, BODY_SIZE) <= max + 1e-3
        })
    }

    #[test]
    fn test_short_text_is_one_line() {
        let lines = wrap_text("Olá mundo", Font::Regular, BODY_SIZE, CONTENT_WIDTH, CONTENT_WIDTH);
        assert_eq!(lines, vec!["Olá mundo".to_string()]);
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        assert!(wrap_text("   ", Font::Regular, BODY_SIZE, 100.0, 100.0).is_empty());
    }

    #[test]
    fn test_wrap_respects_width_and_keeps_words() {
        let text = "Planejar a mudança para os Estados Unidos exige organização financeira, \
                    documentação completa e paciência com os prazos do processo consular.";
        let lines = wrap_text(text, Font::Regular, BODY_SIZE, 150.0, 150.0);
        assert!(lines.len() > 1);
        assert!(widths_fit(&lines, 150.0, 150.0));
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_narrow_first_line() {
        let text = "um dois três quatro cinco seis sete oito";
        let lines = wrap_text(text, Font::Regular, BODY_SIZE, 40.0, 200.0);
        assert!(widths_fit(&lines, 40.0, 200.0));
        assert!(lines.len() >= 2);
    }

    #[test]
    fn test_long_word_is_split() {
        let word = "a".repeat(200);
        let lines = wrap_text(&word, Font::Regular, BODY_SIZE, 100.0, 100.0);
        assert!(lines.len() > 1);
        assert!(widths_fit(&lines, 100.0, 100.0));
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_long_word_then_short_word_share_a_line() {
        let text = format!("{} b", "a".repeat(30));
        let lines = wrap_text(&text, Font::Regular, BODY_SIZE, 100.0, 100.0);
        assert!(lines.last().unwrap().ends_with(" b"));
    }

    #[test]
    fn test_footer_on_every_page() {
        let doc = PdfDocument {
            title: "Plano".into(),
            subtitle: None,
            sections: (0..12)
                .map(|i| Section {
                    heading: format!("Seção {i}"),
                    blocks: (0..10)
                        .map(|j| Block::Bullet(format!("Item {j} com um texto razoavelmente longo para ocupar espaço na página")))
                        .collect(),
                })
                .collect(),
        };
        let pages = layout_document(&doc);
        assert!(pages.len() > 1);
        let total = pages.len();
        for (i, page) in pages.iter().enumerate() {
            let footer = page.lines.last().unwrap();
            assert_eq!(footer.text(), footer_text(i + 1, total));
            assert_eq!(footer.y, FOOTER_BASELINE);
        }
    }

    #[test]
    fn test_lines_stay_inside_margins() {
        let doc = PdfDocument {
            title: "Plano".into(),
            subtitle: Some("Gerado pelo LifeWay".into()),
            sections: (0..8)
                .map(|i| Section {
                    heading: format!("Seção {i}"),
                    blocks: vec![
                        Block::KeyValue {
                            key: "Objetivo".into(),
                            value: "Trabalhar com tecnologia em Miami ".repeat(6),
                        },
                        Block::Paragraph("Texto corrido. ".repeat(40)),
                    ],
                })
                .collect(),
        };
        for page in layout_document(&doc) {
            for line in page.lines.iter().filter(|l| l.y != FOOTER_BASELINE) {
                assert!(line.y >= MARGIN - 1e-3, "line below margin: {}", line.y);
                assert!(line.y <= PAGE_HEIGHT - MARGIN);
                let width: f32 = line
                    .runs
                    .iter()
                    .map(|r| text_width(r.font, &r.text, line.size))
                    .sum();
                assert!(line.x + width <= PAGE_WIDTH - MARGIN + 1e-3);
            }
        }
    }

    #[test]
    fn test_empty_document_still_has_one_page() {
        let doc = PdfDocument {
            title: "Plano".into(),
            subtitle: None,
            sections: vec![],
        };
        let pages = layout_document(&doc);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.last().unwrap().text(), "LifeWay USA | página 1 de 1");
    }
}
