//! Structured PDF exporter.
//!
//! The resume tree is mapped to flow items, paginated by `layout::flow`, and
//! the positioned draw ops are written with printpdf's builtin (non-embedded)
//! fonts. Builtin fonts only cover WinAnsi, so every string is folded to
//! plain ASCII before it is measured, which keeps measured and drawn widths equal.

use std::io::{BufWriter, Write};

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};

use crate::export::document::{Block, Emphasis, ResumeTree, NAME_PLACEHOLDER};
use crate::export::ExportError;
use crate::layout::{
    paginate, Align, DrawOp, FlowItem, FontFamily, FontWeight, LaidOutPage, PageConfig,
    Paragraph, Rgb, SplitLine, TextStyle,
};

const NAME_COLOR: u32 = 0x111827;
const BODY_COLOR: u32 = 0x1F2937;
const MUTED_COLOR: u32 = 0x374151;
const SUBTLE_COLOR: u32 = 0x4B5563;

const NAME_SIZE_PT: f32 = 18.0;
const HEADING_SIZE_PT: f32 = 11.0;
const HEADING_RULE_PT: f32 = 0.75;
const ENTRY_GAP_MM: f32 = 2.0;

// ────────────────────────────────────────────────────────────────────────────
// Tree → flow items
// ────────────────────────────────────────────────────────────────────────────

fn style(config: &PageConfig, emphasis: Emphasis) -> TextStyle {
    let (weight, color) = match emphasis {
        Emphasis::Normal => (FontWeight::Regular, BODY_COLOR),
        Emphasis::Strong => (FontWeight::Bold, NAME_COLOR),
        Emphasis::Subtle => (FontWeight::Italic, SUBTLE_COLOR),
    };
    TextStyle {
        size_pt: config.base_font_size_pt,
        weight,
        color: Rgb::from_hex(color),
    }
}

fn paragraph(text: &str, style: TextStyle) -> Paragraph {
    Paragraph {
        text: to_win_ansi(text),
        style,
        align: Align::Left,
        bullet: false,
        space_before_mm: 0.0,
        space_after_mm: 1.0,
        keep_with_next: false,
    }
}

/// Maps each block to one or more flow items.
pub fn flow_items(tree: &ResumeTree, config: &PageConfig) -> Vec<FlowItem> {
    let mut items = Vec::with_capacity(tree.blocks.len() + 8);

    for block in &tree.blocks {
        match block {
            Block::Name { text } => items.push(FlowItem::Paragraph(Paragraph {
                align: Align::Center,
                space_after_mm: 1.5,
                ..paragraph(
                    text,
                    TextStyle {
                        size_pt: NAME_SIZE_PT,
                        weight: FontWeight::Bold,
                        color: Rgb::from_hex(NAME_COLOR),
                    },
                )
            })),

            Block::ContactLine { text } => items.push(FlowItem::Paragraph(Paragraph {
                align: Align::Center,
                space_after_mm: 0.5,
                ..paragraph(
                    text,
                    TextStyle {
                        color: Rgb::from_hex(MUTED_COLOR),
                        ..style(config, Emphasis::Normal)
                    },
                )
            })),

            Block::SectionHeading { title } => {
                items.push(FlowItem::Paragraph(Paragraph {
                    space_before_mm: 3.5,
                    space_after_mm: 0.3,
                    keep_with_next: true,
                    ..paragraph(
                        title,
                        TextStyle {
                            size_pt: HEADING_SIZE_PT,
                            weight: FontWeight::Bold,
                            color: Rgb::from_hex(NAME_COLOR),
                        },
                    )
                }));
                items.push(FlowItem::Rule {
                    thickness_pt: HEADING_RULE_PT,
                    space_after_mm: 1.5,
                    keep_with_next: true,
                });
            }

            Block::EntryLine {
                left,
                left_emphasis,
                right,
                right_emphasis,
            } => items.push(FlowItem::SplitLine(SplitLine {
                left: to_win_ansi(left),
                left_style: style(config, *left_emphasis),
                right: to_win_ansi(right),
                right_style: style(config, *right_emphasis),
                space_after_mm: 0.2,
                keep_with_next: true,
            })),

            Block::Bullet { text } => items.push(FlowItem::Paragraph(Paragraph {
                bullet: true,
                space_after_mm: 0.4,
                ..paragraph(text, style(config, Emphasis::Normal))
            })),

            Block::Paragraph { text, emphasis } => {
                items.push(FlowItem::Paragraph(paragraph(text, style(config, *emphasis))))
            }

            Block::LabeledLine { label, value } => items.push(FlowItem::Paragraph(paragraph(
                &format!("{label}: {value}"),
                style(config, Emphasis::Normal),
            ))),

            Block::EntryEnd => items.push(FlowItem::Spacer(ENTRY_GAP_MM)),
        }
    }

    items
}

/// Lays the tree out onto pages without producing any PDF bytes.
pub fn layout_pages(tree: &ResumeTree, config: &PageConfig) -> Vec<LaidOutPage> {
    paginate(&flow_items(tree, config), config)
}

// ────────────────────────────────────────────────────────────────────────────
// Drawing
// ────────────────────────────────────────────────────────────────────────────

struct FontSet {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl FontSet {
    fn load(doc: &PdfDocumentReference, family: FontFamily) -> Result<Self, ExportError> {
        let faces = match family {
            FontFamily::Helvetica => [
                BuiltinFont::Helvetica,
                BuiltinFont::HelveticaBold,
                BuiltinFont::HelveticaOblique,
                BuiltinFont::HelveticaBoldOblique,
            ],
            FontFamily::Times => [
                BuiltinFont::TimesRoman,
                BuiltinFont::TimesBold,
                BuiltinFont::TimesItalic,
                BuiltinFont::TimesBoldItalic,
            ],
        };
        let [regular, bold, italic, bold_italic] = faces.map(|face| {
            doc.add_builtin_font(face)
                .map_err(|e| ExportError::Pdf(format!("font: {e:?}")))
        });
        Ok(Self {
            regular: regular?,
            bold: bold?,
            italic: italic?,
            bold_italic: bold_italic?,
        })
    }

    fn get(&self, weight: FontWeight) -> &IndirectFontRef {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
            FontWeight::Italic => &self.italic,
            FontWeight::BoldItalic => &self.bold_italic,
        }
    }
}

fn pdf_color(rgb: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(rgb.0, rgb.1, rgb.2, None))
}

/// Horizontal line in page coordinates (origin bottom-left).
fn segment(x1: f32, x2: f32, y: f32) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    }
}

fn draw_page(layer: &PdfLayerReference, page: &LaidOutPage, fonts: &FontSet, config: &PageConfig) {
    let flip = |y_top: f32| config.page_height_mm - y_top;

    for op in &page.ops {
        match op {
            DrawOp::Text {
                x_mm,
                baseline_mm,
                text,
                style,
            } => {
                layer.set_fill_color(pdf_color(style.color));
                layer.use_text(
                    text.as_str(),
                    style.size_pt,
                    Mm(*x_mm),
                    Mm(flip(*baseline_mm)),
                    fonts.get(style.weight),
                );
            }
            DrawOp::Rule {
                x1_mm,
                x2_mm,
                y_mm,
                thickness_pt,
            } => {
                layer.set_outline_color(pdf_color(Rgb::from_hex(NAME_COLOR)));
                layer.set_outline_thickness(*thickness_pt);
                layer.add_line(segment(*x1_mm, *x2_mm, flip(*y_mm)));
            }
            // A bullet dot is a stroke as long as it is thick.
            DrawOp::Dot {
                x_mm,
                y_mm,
                radius_mm,
            } => {
                let diameter_mm = radius_mm * 2.0;
                layer.set_outline_color(pdf_color(Rgb::from_hex(BODY_COLOR)));
                layer.set_outline_thickness(diameter_mm / crate::layout::font_metrics::PT_TO_MM);
                layer.add_line(segment(*x_mm, x_mm + diameter_mm, flip(*y_mm)));
            }
        }
    }
}

fn document_title(tree: &ResumeTree) -> String {
    tree.blocks
        .iter()
        .find_map(|block| match block {
            Block::Name { text } => Some(format!("{} - Resume", to_win_ansi(text))),
            _ => None,
        })
        .unwrap_or_else(|| format!("{NAME_PLACEHOLDER} - Resume"))
}

/// Renders the tree into a complete PDF held in memory.
pub fn render_pdf(tree: &ResumeTree, config: &PageConfig) -> Result<Vec<u8>, ExportError> {
    let pages = layout_pages(tree, config);
    let page_w = Mm(config.page_width_mm);
    let page_h = Mm(config.page_height_mm);

    let (doc, first_page, first_layer) =
        PdfDocument::new(document_title(tree), page_w, page_h, "Layer 1");
    let fonts = FontSet::load(&doc, config.font)?;

    for (idx, page) in pages.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(page_w, page_h, "Layer 1");
            doc.get_page(page_idx).get_layer(layer_idx)
        };
        draw_page(&layer, page, &fonts, config);
    }

    tracing::debug!(pages = pages.len(), "PDF laid out");

    let mut buf = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer)
            .map_err(|e| ExportError::Pdf(format!("save: {e:?}")))?;
        writer
            .flush()
            .map_err(|e| ExportError::Pdf(format!("flush: {e}")))?;
    }
    Ok(buf)
}

// ────────────────────────────────────────────────────────────────────────────
// Text encoding
// ────────────────────────────────────────────────────────────────────────────

/// Folds typographic punctuation and Latin accents to ASCII, turns line
/// breaks and tabs into spaces, and replaces anything else outside ASCII
/// with `?`.
pub fn to_win_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let folded = match c {
            '\n' | '\r' | '\t' => " ",
            c if c.is_control() => continue,
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => "'",
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => "\"",
            '\u{2010}'..='\u{2015}' | '\u{2212}' => "-",
            '\u{2022}' | '\u{00B7}' | '\u{25CF}' => "*",
            '\u{2026}' => "...",
            '\u{00A0}' | '\u{2002}'..='\u{200A}' => " ",
            '\u{00C0}'..='\u{00C5}' => "A",
            '\u{00C6}' => "AE",
            '\u{00C7}' => "C",
            '\u{00C8}'..='\u{00CB}' => "E",
            '\u{00CC}'..='\u{00CF}' => "I",
            '\u{00D0}' => "D",
            '\u{00D1}' => "N",
            '\u{00D2}'..='\u{00D6}' | '\u{00D8}' => "O",
            '\u{00D9}'..='\u{00DC}' => "U",
            '\u{00DD}' => "Y",
            '\u{00DF}' => "ss",
            '\u{00E0}'..='\u{00E5}' => "a",
            '\u{00E6}' => "ae",
            '\u{00E7}' => "c",
            '\u{00E8}'..='\u{00EB}' => "e",
            '\u{00EC}'..='\u{00EF}' => "i",
            '\u{00F0}' => "d",
            '\u{00F1}' => "n",
            '\u{00F2}'..='\u{00F6}' | '\u{00F8}' => "o",
            '\u{00F9}'..='\u{00FC}' => "u",
            '\u{00FD}' | '\u{00FF}' => "y",
            c if c.is_ascii() => {
                out.push(c);
                continue;
            }
            _ => "?",
        };
        out.push_str(folded);
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
