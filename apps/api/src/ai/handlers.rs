use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::ai::enhance::{enhance, EnhanceRequest, EnhanceResponse};
use crate::ai::extraction::{
    parse_document, DocumentUpload, ParseDocumentRequest, ParseDocumentResponse,
};
use crate::errors::AppError;
use crate::models::resume::ResumeDocument;
use crate::state::AppState;
use crate::store::handlers::session_or_404;

/// POST /api/v1/enhance
/// Rewrites a summary or experience description. The caller keeps its text on error.
pub async fn handle_enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation(
            "Add some text before enhancing it".to_string(),
        ));
    }
    Ok(Json(enhance(&state.ai, &req).await?))
}

/// POST /api/v1/parse-document
/// Extracts a `ResumeDocument` from an uploaded resume image without storing it.
pub async fn handle_parse_document(
    State(state): State<AppState>,
    Json(req): Json<ParseDocumentRequest>,
) -> Result<Json<ParseDocumentResponse>, AppError> {
    let upload = DocumentUpload::from_request(&req, state.config.max_upload_bytes)?;
    let resume_data = parse_document(&state.ai, &upload).await?;
    Ok(Json(ParseDocumentResponse { resume_data }))
}

/// POST /api/v1/sessions/:id/import
/// Replaces the session's document with the one extracted from the upload.
/// A failed extraction leaves the session untouched.
pub async fn handle_import_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ParseDocumentRequest>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = session_or_404(&state, id).await?;
    let upload = DocumentUpload::from_request(&req, state.config.max_upload_bytes)?;
    let document = parse_document(&state.ai, &upload).await?;

    session.store.replace(document);
    tracing::info!(session_id = %id, "session document replaced by import");
    Ok(Json(session.store.snapshot()))
}
