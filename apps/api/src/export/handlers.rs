use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::capture::UploadedCapture;
use crate::export::docx::render_docx;
use crate::export::pdf::render_pdf;
use crate::export::raster::export_rasterized;
use crate::export::{build_tree, ExportError, ExportFormat, ExportedFile};
use crate::layout::PageConfig;
use crate::models::resume::ResumeDocument;
use crate::state::AppState;
use crate::store::handlers::session_or_404;

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterExportRequest {
    /// PNG or JPEG data URL of the rendered preview element.
    pub image: String,
    /// Supersampling factor the capture was taken at.
    #[serde(default = "default_capture_scale")]
    pub scale: f32,
    #[serde(default)]
    pub filename: Option<String>,
}

fn default_capture_scale() -> f32 {
    2.0
}

impl IntoResponse for ExportedFile {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// Builds the tree and renders it off the async runtime.
pub async fn render_structured(
    format: ExportFormat,
    document: ResumeDocument,
    page_config: PageConfig,
) -> Result<Vec<u8>, ExportError> {
    tokio::task::spawn_blocking(move || {
        let tree = build_tree(&document);
        match format {
            ExportFormat::Pdf => render_pdf(&tree, &page_config),
            ExportFormat::Docx => render_docx(&tree, page_config.font),
        }
    })
    .await
    .map_err(|e| ExportError::Task(e.to_string()))?
}

fn export_in_flight() -> AppError {
    AppError::Conflict("An export is already in progress for this session".to_string())
}

async fn export_session(
    state: AppState,
    id: Uuid,
    format: ExportFormat,
    filename: Option<String>,
) -> Result<ExportedFile, AppError> {
    let session = session_or_404(&state, id).await?;
    let _guard = session.begin_export().ok_or_else(export_in_flight)?;
    // Edits made from here on belong to the next export.
    let snapshot = session.store.snapshot();

    let bytes = render_structured(format, snapshot, state.page_config.clone()).await?;
    tracing::info!(session_id = %id, ?format, bytes = bytes.len(), "export complete");
    Ok(ExportedFile::new(format, filename.as_deref(), bytes))
}

/// POST /api/v1/sessions/:id/export/pdf
pub async fn handle_export_session_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<ExportedFile, AppError> {
    export_session(state, id, ExportFormat::Pdf, query.filename).await
}

/// POST /api/v1/sessions/:id/export/docx
pub async fn handle_export_session_docx(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<ExportedFile, AppError> {
    export_session(state, id, ExportFormat::Docx, query.filename).await
}

/// POST /api/v1/sessions/:id/export/raster
pub async fn handle_export_session_raster(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RasterExportRequest>,
) -> Result<ExportedFile, AppError> {
    let session = session_or_404(&state, id).await?;
    let _guard = session.begin_export().ok_or_else(export_in_flight)?;

    let capture = UploadedCapture::from_data_url(&req.image, req.scale)?;
    let bytes = export_rasterized(&capture, state.config.raster_settle, state.raster_spec).await?;

    tracing::info!(session_id = %id, bytes = bytes.len(), "rasterized export complete");
    Ok(ExportedFile::new(
        ExportFormat::Pdf,
        req.filename.as_deref(),
        bytes,
    ))
}

/// POST /api/v1/export/pdf
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    Json(document): Json<ResumeDocument>,
) -> Result<ExportedFile, AppError> {
    let bytes = render_structured(ExportFormat::Pdf, document, state.page_config.clone()).await?;
    Ok(ExportedFile::new(ExportFormat::Pdf, query.filename.as_deref(), bytes))
}

/// POST /api/v1/export/docx
pub async fn handle_export_docx(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
    Json(document): Json<ResumeDocument>,
) -> Result<ExportedFile, AppError> {
    let bytes = render_structured(ExportFormat::Docx, document, state.page_config.clone()).await?;
    Ok(ExportedFile::new(ExportFormat::Docx, query.filename.as_deref(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::document::tests::sample_document;
    use crate::layout::{default_page_config, FontFamily};

    #[tokio::test]
    async fn test_render_structured_both_formats() {
        let config = default_page_config(FontFamily::Times);
        let pdf = render_structured(ExportFormat::Pdf, sample_document(), config.clone())
            .await
            .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        let docx = render_structured(ExportFormat::Docx, sample_document(), config)
            .await
            .unwrap();
        assert!(docx.starts_with(b"PK"));
    }

    #[test]
    fn test_exported_file_headers() {
        let response =
            ExportedFile::new(ExportFormat::Docx, Some("cv"), vec![1, 2, 3]).into_response();
        let headers = response.headers();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"cv.docx\""
        );
        assert_eq!(
            headers[header::CONTENT_TYPE],
            ExportFormat::Docx.content_type()
        );
    }
}
