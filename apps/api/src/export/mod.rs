// Document export pipeline.
// Implements: the format-independent resume tree, structured PDF/DOCX rendering,
// and the rasterized fallback that paginates a captured bitmap.
// Rendering is CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod capture;
pub mod document;
pub mod docx;
pub mod handlers;
pub mod pdf;
pub mod raster;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use document::{build_tree, ResumeTree};

/// Shown whenever the rasterized path fails.
pub const PRINT_FALLBACK_HINT: &str =
    "Use your browser's Print dialog and choose \"Save as PDF\" instead.";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF layout failed: {0}")]
    Pdf(String),

    #[error("DOCX assembly failed: {0}")]
    Docx(String),

    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("export task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// Message safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            ExportError::Pdf(_) => "Failed to generate PDF. Please try again.".to_string(),
            ExportError::Docx(_) => "Failed to generate DOCX. Please try again.".to_string(),
            ExportError::Rasterize(_) => {
                format!("Failed to capture the resume preview. {PRINT_FALLBACK_HINT}")
            }
            ExportError::Task(_) => "Export was interrupted. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn default_filename(self) -> String {
        format!("resume.{}", self.extension())
    }
}

/// A finished in-memory export, ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    pub fn new(format: ExportFormat, requested_name: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            filename: resolve_filename(format, requested_name),
            content_type: format.content_type(),
            bytes,
        }
    }
}

/// Sanitizes a caller-supplied filename for a `Content-Disposition` header
/// and makes sure it carries the format's extension.
pub fn resolve_filename(format: ExportFormat, requested: Option<&str>) -> String {
    let cleaned: String = requested
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/' | ':' | '*' | '?' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');

    if cleaned.is_empty() {
        return format.default_filename();
    }

    let suffix = format!(".{}", format.extension());
    if cleaned.to_ascii_lowercase().ends_with(&suffix) {
        cleaned.to_string()
    } else {
        format!("{cleaned}{suffix}")
    }
}
