//! Writes laid-out pages as a PDF with lopdf.
//!
//! Both fonts are standard Type1 fonts with WinAnsiEncoding, so nothing is
//! embedded and every string goes through `metrics::encode_text`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::errors::AppError;
use crate::pdf::document::PdfDocument;
use crate::pdf::layout::{layout_document, LayoutLine, Page, PAGE_HEIGHT, PAGE_WIDTH};
use crate::pdf::metrics::{encode_text, text_width, Font};

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn line_operations(line: &LayoutLine, ops: &mut Vec<Operation>) {
    let mut x = line.x;
    for run in &line.runs {
        if run.text.is_empty() {
            continue;
        }
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![name(run.font.resource_name()), line.size.into()],
        ));
        ops.push(Operation::new("Td", vec![x.into(), line.y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(&run.text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
        x += text_width(run.font, &run.text, line.size);
    }
}

fn font_dictionary(doc: &mut Document, font: Font) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Serializes `pages` into a complete PDF file.
pub fn render_pages(pages: &[Page]) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = font_dictionary(&mut doc, Font::Regular);
    let bold = font_dictionary(&mut doc, Font::Bold);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular,
            Font::Bold.resource_name() => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let mut operations = Vec::new();
        for line in &page.lines {
            line_operations(line, &mut operations);
        }
        let encoded = Content { operations }
            .encode()
            .map_err(|e| AppError::Pdf(format!("content stream encoding failed: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Pdf(format!("failed to serialize PDF: {e}")))?;
    Ok(bytes)
}

/// Lays out and renders `document`. Returns the file and its page count.
pub fn render_document(document: &PdfDocument) -> Result<(Vec<u8>, usize), AppError> {
    let pages = layout_document(document);
    let bytes = render_pages(&pages)?;
    Ok((bytes, pages.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::tests::full_context;
    use crate::pdf::document::{build_document, Block, Section};

    fn small_document() -> PdfDocument {
        PdfDocument {
            title: "Trabalhar nos EUA (FL)".into(),
            subtitle: None,
            sections: vec![Section {
                heading: "Perfil".into(),
                blocks: vec![Block::KeyValue {
                    key: "Nome".into(),
                    value: "Ana Souza".into(),
                }],
            }],
        }
    }

    #[test]
    fn test_output_is_a_pdf() {
        let (bytes, pages) = render_document(&small_document()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(pages, 1);
    }

    #[test]
    fn test_page_count_matches_layout() {
        let mut doc = build_document(&full_context());
        doc.sections.push(Section {
            heading: "Anexo".into(),
            blocks: (0..80)
                .map(|i| Block::Bullet(format!("Documento de apoio número {i}")))
                .collect(),
        });
        let expected = layout_document(&doc).len();
        assert!(expected > 1);

        let (bytes, pages) = render_document(&doc).unwrap();
        assert_eq!(pages, expected);
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), expected);
    }

    #[test]
    fn test_text_is_extractable() {
        let (bytes, _) = render_document(&small_document()).unwrap();
        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("LifeWay"));
        assert!(text.contains("Ana Souza"));
    }

    #[test]
    fn test_empty_page_list_still_serializes() {
        let bytes = render_pages(&[]).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
