//! Multi-line text ↔ bullet list conversions.
//!
//! `split_into_bullets` is the only segmentation used anywhere in the crate;
//! it leaves leading glyphs alone. `strip_bullet_markers` is a separate
//! normalisation step applied to AI-extracted text only.

use std::sync::LazyLock;

use regex::Regex;

static GLYPH_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[•\-*◦▪▫→⇒➢➤✓✔]\s*").expect("valid glyph regex"));
static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s*").expect("valid numbered regex"));
static LETTERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][.)]\s*").expect("valid lettered regex"));

/// Splits on `\n`, trims each line and drops empty ones. Order is preserved.
pub fn split_into_bullets(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Removes one leading bullet glyph, then a `1.`/`1)` marker, then an
/// `a.`/`a)` marker from every line; blank lines are dropped and the rest
/// rejoined with `\n`.
pub fn strip_bullet_markers(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let line = line.trim();
            let line = GLYPH_MARKER.replace(line, "");
            let line = NUMBERED_MARKER.replace(&line, "");
            let line = LETTERED_MARKER.replace(&line, "");
            line.trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
