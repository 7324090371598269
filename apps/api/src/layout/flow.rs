//! Flow layout: turns a sequence of block primitives into positioned draw
//! operations on fixed-size pages.
//!
//! The engine owns line breaking (greedy, via `FontMetricTable::wrap_words`)
//! and pagination: a line that does not fit the remaining height moves to a
//! new page, spacing collapses at the top of a page, and items flagged
//! `keep_with_next` move with the first line of the following item.
//!
//! All coordinates are in mm measured from the top-left corner of the page.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{get_metrics, FontWeight, PageConfig, PT_TO_MM};

/// Gap kept between the left and right parts of a split line.
const SPLIT_GAP_MM: f32 = 4.0;
/// Horizontal space reserved for a bullet marker.
const BULLET_INDENT_MM: f32 = 4.5;
const BULLET_RADIUS_MM: f32 = 0.5;
/// Fraction of the font size above the baseline.
const ASCENT: f32 = 0.78;

// ────────────────────────────────────────────────────────────────────────────
// Input primitives
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    /// `0x111827` → `Rgb(0.067, 0.094, 0.153)`.
    pub fn from_hex(hex: u32) -> Rgb {
        let channel = |shift: u32| ((hex >> shift) & 0xFF) as f32 / 255.0;
        Rgb(channel(16), channel(8), channel(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub size_pt: f32,
    pub weight: FontWeight,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    pub style: TextStyle,
    pub align: Align,
    /// Prefix a bullet marker and indent the wrapped text under it.
    pub bullet: bool,
    pub space_before_mm: f32,
    pub space_after_mm: f32,
    pub keep_with_next: bool,
}

/// A line with left-aligned text and right-aligned text on the same baseline.
/// The left part wraps; the right part stays on the first line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitLine {
    pub left: String,
    pub left_style: TextStyle,
    pub right: String,
    pub right_style: TextStyle,
    pub space_after_mm: f32,
    pub keep_with_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowItem {
    Paragraph(Paragraph),
    SplitLine(SplitLine),
    /// Full-width horizontal rule.
    Rule {
        thickness_pt: f32,
        space_after_mm: f32,
        keep_with_next: bool,
    },
    Spacer(f32),
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    Text {
        x_mm: f32,
        baseline_mm: f32,
        text: String,
        style: TextStyle,
    },
    Rule {
        x1_mm: f32,
        x2_mm: f32,
        y_mm: f32,
        thickness_pt: f32,
    },
    Dot {
        x_mm: f32,
        y_mm: f32,
        radius_mm: f32,
    },
}

impl DrawOp {
    fn shifted(&self, dy: f32) -> DrawOp {
        match self {
            DrawOp::Text { x_mm, baseline_mm, text, style } => DrawOp::Text {
                x_mm: *x_mm,
                baseline_mm: baseline_mm + dy,
                text: text.clone(),
                style: *style,
            },
            DrawOp::Rule { x1_mm, x2_mm, y_mm, thickness_pt } => DrawOp::Rule {
                x1_mm: *x1_mm,
                x2_mm: *x2_mm,
                y_mm: y_mm + dy,
                thickness_pt: *thickness_pt,
            },
            DrawOp::Dot { x_mm, y_mm, radius_mm } => DrawOp::Dot {
                x_mm: *x_mm,
                y_mm: y_mm + dy,
                radius_mm: *radius_mm,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaidOutPage {
    pub ops: Vec<DrawOp>,
}

impl LaidOutPage {
    /// Text of every text op on this page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Measurement
// ────────────────────────────────────────────────────────────────────────────

/// One unbreakable line; ops are positioned relative to the line's top edge.
struct MeasuredLine {
    height_mm: f32,
    ops: Vec<DrawOp>,
}

struct MeasuredItem {
    space_before_mm: f32,
    space_after_mm: f32,
    keep_with_next: bool,
    lines: Vec<MeasuredLine>,
}

impl MeasuredItem {
    fn height_mm(&self) -> f32 {
        self.lines.iter().map(|l| l.height_mm).sum()
    }

    fn first_line_mm(&self) -> f32 {
        self.lines.first().map(|l| l.height_mm).unwrap_or(0.0)
    }
}

fn baseline_offset(config: &PageConfig, size_pt: f32) -> f32 {
    let line_h = config.line_height_mm(size_pt);
    let glyph_h = size_pt * PT_TO_MM;
    (line_h - glyph_h) / 2.0 + glyph_h * ASCENT
}

fn measure(item: &FlowItem, config: &PageConfig) -> MeasuredItem {
    let left = config.margin_left_mm;
    let width = config.text_width_mm();

    match item {
        FlowItem::Paragraph(p) => {
            let metrics = get_metrics(config.font, p.style.weight);
            let indent = if p.bullet { BULLET_INDENT_MM } else { 0.0 };
            let line_h = config.line_height_mm(p.style.size_pt);
            let baseline = baseline_offset(config, p.style.size_pt);

            let lines = metrics
                .wrap_words(&p.text, p.style.size_pt, width - indent)
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    let text_w = metrics.measure_mm(&text, p.style.size_pt);
                    let x = match p.align {
                        Align::Left => left + indent,
                        Align::Center => left + ((width - text_w) / 2.0).max(0.0),
                    };
                    let mut ops = Vec::with_capacity(2);
                    if p.bullet && i == 0 {
                        ops.push(DrawOp::Dot {
                            x_mm: left + BULLET_INDENT_MM / 2.0 - BULLET_RADIUS_MM,
                            y_mm: baseline - p.style.size_pt * PT_TO_MM * 0.3,
                            radius_mm: BULLET_RADIUS_MM,
                        });
                    }
                    ops.push(DrawOp::Text {
                        x_mm: x,
                        baseline_mm: baseline,
                        text,
                        style: p.style,
                    });
                    MeasuredLine { height_mm: line_h, ops }
                })
                .collect();

            MeasuredItem {
                space_before_mm: p.space_before_mm,
                space_after_mm: p.space_after_mm,
                keep_with_next: p.keep_with_next,
                lines,
            }
        }

        FlowItem::SplitLine(s) => {
            let left_metrics = get_metrics(config.font, s.left_style.weight);
            let right_metrics = get_metrics(config.font, s.right_style.weight);
            let size_pt = s.left_style.size_pt.max(s.right_style.size_pt);
            let line_h = config.line_height_mm(size_pt);
            let baseline = baseline_offset(config, size_pt);

            let right_w = right_metrics.measure_mm(&s.right, s.right_style.size_pt);
            let left_width = if s.right.is_empty() {
                width
            } else {
                (width - right_w - SPLIT_GAP_MM).max(width / 3.0)
            };

            let mut left_lines = left_metrics.wrap_words(&s.left, s.left_style.size_pt, left_width);
            if left_lines.is_empty() {
                left_lines.push(String::new());
            }

            let lines = left_lines
                .into_iter()
                .enumerate()
                .map(|(i, text)| {
                    let mut ops = Vec::with_capacity(2);
                    if !text.is_empty() {
                        ops.push(DrawOp::Text {
                            x_mm: left,
                            baseline_mm: baseline,
                            text,
                            style: s.left_style,
                        });
                    }
                    if i == 0 && !s.right.is_empty() {
                        ops.push(DrawOp::Text {
                            x_mm: left + width - right_w,
                            baseline_mm: baseline,
                            text: s.right.clone(),
                            style: s.right_style,
                        });
                    }
                    MeasuredLine { height_mm: line_h, ops }
                })
                .collect();

            MeasuredItem {
                space_before_mm: 0.0,
                space_after_mm: s.space_after_mm,
                keep_with_next: s.keep_with_next,
                lines,
            }
        }

        FlowItem::Rule {
            thickness_pt,
            space_after_mm,
            keep_with_next,
        } => {
            let height = thickness_pt * PT_TO_MM + 0.6;
            MeasuredItem {
                space_before_mm: 0.0,
                space_after_mm: *space_after_mm,
                keep_with_next: *keep_with_next,
                lines: vec![MeasuredLine {
                    height_mm: height,
                    ops: vec![DrawOp::Rule {
                        x1_mm: left,
                        x2_mm: left + width,
                        y_mm: height / 2.0,
                        thickness_pt: *thickness_pt,
                    }],
                }],
            }
        }

        FlowItem::Spacer(mm) => MeasuredItem {
            space_before_mm: *mm,
            space_after_mm: 0.0,
            keep_with_next: false,
            lines: Vec::new(),
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pagination
// ────────────────────────────────────────────────────────────────────────────

struct Cursor<'a> {
    config: &'a PageConfig,
    pages: Vec<LaidOutPage>,
    current: LaidOutPage,
    y_mm: f32,
}

impl<'a> Cursor<'a> {
    fn new(config: &'a PageConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            current: LaidOutPage::default(),
            y_mm: config.margin_top_mm,
        }
    }

    fn bottom(&self) -> f32 {
        self.config.page_height_mm - self.config.margin_bottom_mm
    }

    fn at_top(&self) -> bool {
        self.y_mm <= self.config.margin_top_mm
    }

    fn fits(&self, height_mm: f32) -> bool {
        self.y_mm + height_mm <= self.bottom() + 1e-3
    }

    /// Vertical space; collapses at the top of a page and never overruns the bottom.
    fn skip(&mut self, mm: f32) {
        if !self.at_top() {
            self.y_mm = (self.y_mm + mm).min(self.bottom());
        }
    }

    fn new_page(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.pages.push(finished);
        self.y_mm = self.config.margin_top_mm;
    }

    fn place(&mut self, line: &MeasuredLine) {
        if !self.fits(line.height_mm) && !self.at_top() {
            self.new_page();
        }
        let dy = self.y_mm;
        self.current.ops.extend(line.ops.iter().map(|op| op.shifted(dy)));
        self.y_mm += line.height_mm;
    }

    fn finish(mut self) -> Vec<LaidOutPage> {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Lays out `items` top to bottom, breaking onto new pages as needed.
/// Always returns at least one (possibly empty) page.
pub fn paginate(items: &[FlowItem], config: &PageConfig) -> Vec<LaidOutPage> {
    let measured: Vec<MeasuredItem> = items.iter().map(|item| measure(item, config)).collect();
    let mut cursor = Cursor::new(config);

    for (idx, item) in measured.iter().enumerate() {
        cursor.skip(item.space_before_mm);

        if item.keep_with_next {
            let next_first = measured
                .get(idx + 1)
                .map(|next| next.space_before_mm + next.first_line_mm())
                .unwrap_or(0.0);
            let needed = item.height_mm() + item.space_after_mm + next_first;
            if !cursor.fits(needed) && !cursor.at_top() {
                cursor.new_page();
            }
        }

        for line in &item.lines {
            cursor.place(line);
        }
        cursor.skip(item.space_after_mm);
    }

    cursor.finish()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
