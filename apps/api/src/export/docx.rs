//! Structured DOCX exporter.
//!
//! Each tree block becomes exactly one Word paragraph. Right-aligned halves
//! of entry lines sit behind a right tab stop at the text edge, bullets use a
//! single-level bullet numbering definition, and pagination is left to the
//! word processor.

use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, LineSpacing,
    NumberFormat, Numbering, NumberingId, PageMargin, Paragraph, Run, RunFonts,
    SpecialIndentType, Start, Tab, TabValueType,
};

use crate::export::document::{Block, Emphasis, ResumeTree};
use crate::export::ExportError;
use crate::layout::FontFamily;

// A4 and margins in twentieths of a point.
const PAGE_WIDTH_TWIPS: u32 = 11906;
const PAGE_HEIGHT_TWIPS: u32 = 16838;
const MARGIN_X_TWIPS: i32 = 1000;
const MARGIN_Y_TWIPS: i32 = 800;
const TEXT_RIGHT_EDGE_TWIPS: usize = (PAGE_WIDTH_TWIPS as i32 - 2 * MARGIN_X_TWIPS) as usize;

// Run sizes in half-points.
const NAME_SIZE: usize = 36;
const HEADING_SIZE: usize = 22;
const BODY_SIZE: usize = 20;

const BULLET_NUMBERING_ID: usize = 1;

const NAME_COLOR: &str = "111827";
const MUTED_COLOR: &str = "374151";
const SUBTLE_COLOR: &str = "4B5563";

fn font_name(family: FontFamily) -> &'static str {
    match family {
        FontFamily::Times => "Times New Roman",
        FontFamily::Helvetica => "Arial",
    }
}

fn run(text: &str, emphasis: Emphasis) -> Run {
    let run = Run::new().add_text(text).size(BODY_SIZE);
    match emphasis {
        Emphasis::Normal => run,
        Emphasis::Strong => run.bold().color(NAME_COLOR),
        Emphasis::Subtle => run.italic().color(SUBTLE_COLOR),
    }
}

fn spacing(before: u32, after: u32) -> LineSpacing {
    LineSpacing::new().before(before).after(after)
}

fn block_paragraph(block: &Block) -> Paragraph {
    match block {
        Block::Name { text } => Paragraph::new()
            .add_run(Run::new().add_text(text).size(NAME_SIZE).bold().color(NAME_COLOR))
            .align(AlignmentType::Center)
            .line_spacing(spacing(0, 60)),

        Block::ContactLine { text } => Paragraph::new()
            .add_run(Run::new().add_text(text).size(BODY_SIZE).color(MUTED_COLOR))
            .align(AlignmentType::Center)
            .line_spacing(spacing(0, 20)),

        // Underlined rather than bordered to stay within plain run formatting.
        Block::SectionHeading { title } => Paragraph::new()
            .add_run(
                Run::new()
                    .add_text(title)
                    .size(HEADING_SIZE)
                    .bold()
                    .underline("single")
                    .color(NAME_COLOR),
            )
            .line_spacing(spacing(200, 80)),

        Block::EntryLine {
            left,
            left_emphasis,
            right,
            right_emphasis,
        } => Paragraph::new()
            .add_tab(
                Tab::new()
                    .val(TabValueType::Right)
                    .pos(TEXT_RIGHT_EDGE_TWIPS),
            )
            .add_run(run(left, *left_emphasis))
            .add_run(Run::new().add_tab())
            .add_run(run(right, *right_emphasis))
            .line_spacing(spacing(0, 0)),

        Block::Bullet { text } => Paragraph::new()
            .add_run(run(text, Emphasis::Normal))
            .numbering(NumberingId::new(BULLET_NUMBERING_ID), IndentLevel::new(0))
            .line_spacing(spacing(0, 20)),

        Block::Paragraph { text, emphasis } => Paragraph::new()
            .add_run(run(text, *emphasis))
            .line_spacing(spacing(0, 40)),

        Block::LabeledLine { label, value } => Paragraph::new()
            .add_run(run(&format!("{label}:"), Emphasis::Strong))
            .add_run(run(&format!(" {value}"), Emphasis::Normal))
            .line_spacing(spacing(0, 20)),

        Block::EntryEnd => Paragraph::new()
            .add_run(Run::new().size(8))
            .line_spacing(spacing(0, 80)),
    }
}

fn bullet_numbering() -> AbstractNumbering {
    AbstractNumbering::new(BULLET_NUMBERING_ID).add_level(
        Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )
        .indent(Some(540), Some(SpecialIndentType::Hanging(270)), None, None),
    )
}

/// Packs the tree into a `.docx` archive held in memory.
pub fn render_docx(tree: &ResumeTree, family: FontFamily) -> Result<Vec<u8>, ExportError> {
    let font = font_name(family);
    let docx = tree.blocks.iter().fold(
        Docx::new()
            .page_size(PAGE_WIDTH_TWIPS, PAGE_HEIGHT_TWIPS)
            .page_margin(
                PageMargin::new()
                    .top(MARGIN_Y_TWIPS)
                    .bottom(MARGIN_Y_TWIPS)
                    .left(MARGIN_X_TWIPS)
                    .right(MARGIN_X_TWIPS),
            )
            .default_fonts(RunFonts::new().ascii(font).hi_ansi(font).east_asia(font).cs(font))
            .default_size(BODY_SIZE)
            .add_abstract_numbering(bullet_numbering())
            .add_numbering(Numbering::new(BULLET_NUMBERING_ID, BULLET_NUMBERING_ID)),
        |docx, block| docx.add_paragraph(block_paragraph(block)),
    );

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Docx(e.to_string()))?;

    tracing::debug!(paragraphs = tree.blocks.len(), "DOCX packed");
    Ok(cursor.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Read;

    use regex::Regex;

    use super::*;
    use crate::export::document::{build_tree, tests::sample_document};
    use crate::models::resume::ResumeDocument;

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    /// Reads each `<w:p>` back as one line of text; run tabs become `\t`.
    fn paragraphs(xml: &str) -> Vec<String> {
        let para = Regex::new(r"(?s)<w:p[\s>].*?</w:p>").unwrap();
        let piece = Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>").unwrap();
        para.find_iter(xml)
            .map(|p| {
                piece
                    .captures_iter(p.as_str())
                    .map(|c| match c.get(1) {
                        Some(text) => text
                            .as_str()
                            .replace("&lt;", "<")
                            .replace("&gt;", ">")
                            .replace("&quot;", "\"")
                            .replace("&apos;", "'")
                            .replace("&amp;", "&"),
                        None => "\t".to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_render_produces_zip_archive() {
        let tree = build_tree(&sample_document());
        let bytes = render_docx(&tree, FontFamily::Times).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_round_trip_recovers_every_line() {
        let tree = build_tree(&sample_document());
        let xml = document_xml(&render_docx(&tree, FontFamily::Times).unwrap());

        let expected: Vec<String> = tree
            .plain_text()
            .lines()
            .map(|line| line.strip_prefix("• ").unwrap_or(line).to_string())
            .collect();
        assert_eq!(paragraphs(&xml), expected);
    }

    #[test]
    fn test_round_trip_mandatory_fields() {
        let tree = build_tree(&sample_document());
        let lines = paragraphs(&document_xml(&render_docx(&tree, FontFamily::Helvetica).unwrap()));

        assert_eq!(lines[0], "Ada Lovelace");
        assert_eq!(lines[1], "ada@example.com | +44 20 7946 0000 | London");
        assert!(lines.contains(&"Lead Programmer\tJan 2020 - Present".to_string()));
        assert!(lines.contains(&"Analytical Engines Ltd\tLondon".to_string()));
        assert!(lines.contains(&"Wrote the first algorithm".to_string()));
        assert!(lines.contains(&"Published notes on the engine".to_string()));
    }

    #[test]
    fn test_no_skills_heading_without_skills() {
        let mut doc = sample_document();
        doc.skills.clear();
        let xml = document_xml(&render_docx(&build_tree(&doc), FontFamily::Times).unwrap());
        assert!(!xml.contains("SKILLS"));
        assert!(xml.contains("EXPERIENCE"));
    }

    #[test]
    fn test_bullets_use_numbering() {
        let tree = build_tree(&sample_document());
        let xml = document_xml(&render_docx(&tree, FontFamily::Times).unwrap());
        assert!(xml.contains("w:numId"));
    }

    #[test]
    fn test_blank_document_renders() {
        let tree = build_tree(&ResumeDocument::default());
        let lines = paragraphs(&document_xml(&render_docx(&tree, FontFamily::Times).unwrap()));
        assert_eq!(lines, vec!["Your Name".to_string()]);
    }
}
