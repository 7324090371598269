pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::ai::handlers as ai;
use crate::export::handlers as export;
use crate::state::AppState;
use crate::store::handlers as sessions;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes();

    Router::new()
        .route("/health", get(health::health_handler))
        // Editing sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/personal-info",
            put(sessions::handle_set_personal_info),
        )
        .route(
            "/api/v1/sessions/:id/entries/:collection",
            post(sessions::handle_add_entry),
        )
        .route(
            "/api/v1/sessions/:id/entries/:collection/:entry_id",
            put(sessions::handle_update_entry).delete(sessions::handle_delete_entry),
        )
        .route("/api/v1/sessions/:id/events", get(sessions::handle_events))
        .route("/api/v1/sessions/:id/preview", get(sessions::handle_preview))
        .route(
            "/api/v1/sessions/:id/import",
            post(ai::handle_import_document),
        )
        // Export
        .route(
            "/api/v1/sessions/:id/export/pdf",
            post(export::handle_export_session_pdf),
        )
        .route(
            "/api/v1/sessions/:id/export/docx",
            post(export::handle_export_session_docx),
        )
        .route(
            "/api/v1/sessions/:id/export/raster",
            post(export::handle_export_session_raster),
        )
        .route("/api/v1/export/pdf", post(export::handle_export_pdf))
        .route("/api/v1/export/docx", post(export::handle_export_docx))
        // AI
        .route("/api/v1/enhance", post(ai::handle_enhance))
        .route("/api/v1/parse-document", post(ai::handle_parse_document))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::ai::AiClient;
    use crate::config::Config;
    use crate::export::document::tests::sample_document;
    use crate::layout::{default_page_config, FontFamily};

    fn test_state() -> AppState {
        let config = Config::default();
        let ai = AiClient::new(None, Duration::from_secs(5)).unwrap();
        AppState::new(config, ai, default_page_config(FontFamily::Times))
    }

    async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        build_router(state.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_ai_unconfigured() {
        let state = test_state();
        let response = send(&state, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["aiConfigured"], false);
    }

    #[tokio::test]
    async fn test_session_edit_and_docx_export() {
        let state = test_state();

        let response = send(&state, Method::POST, "/api/v1/sessions", None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let session_id = json_body(response).await["sessionId"]
            .as_str()
            .unwrap()
            .to_string();

        let entry = json!({
            "company": "Analytical Engines Ltd",
            "position": "Lead Programmer",
            "location": "London",
            "startDate": "2020-01",
            "current": true,
            "description": "Wrote the first algorithm"
        });
        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/entries/experience"),
            Some(entry),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        let entry_id = body["id"].as_str().unwrap();
        assert!(entry_id.starts_with("exp_"));
        assert_eq!(body["document"]["experience"][0]["company"], "Analytical Engines Ltd");

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/sessions/{session_id}/export/docx?filename=ada"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"ada.docx\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_create_session_validates_initial_document() {
        let state = test_state();
        let personal_info = json!({ "fullName": "", "email": "", "phone": "", "location": "" });

        let empty_skills = json!({
            "personalInfo": personal_info,
            "skills": [{ "id": "s1", "category": "Empty", "skills": [] }]
        });
        let response = send(&state, Method::POST, "/api/v1/sessions", Some(empty_skills)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let experience = |start: &str| {
            json!({
                "id": "dup",
                "company": "Acme",
                "position": "Engineer",
                "location": "",
                "startDate": start
            })
        };
        let duplicates = json!({
            "personalInfo": personal_info,
            "experience": [experience("2020-01"), experience("2020-02")]
        });
        let response = send(&state, Method::POST, "/api/v1/sessions", Some(duplicates)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bad_date = json!({
            "personalInfo": personal_info,
            "experience": [experience("2020-13")]
        });
        let response = send(&state, Method::POST, "/api/v1/sessions", Some(bad_date)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_entry_is_idempotent() {
        let state = test_state();
        let session = state.sessions.create(sample_document()).await;
        let uri = format!("/api/v1/sessions/{}/entries/skills/skill_missing", session.id);

        let response = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(session.store.snapshot(), sample_document());
    }

    #[tokio::test]
    async fn test_empty_skill_group_rejected() {
        let state = test_state();
        let session = state.sessions.create(sample_document()).await;
        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/sessions/{}/entries/skills", session.id),
            Some(json!({ "category": "Tools", "skills": [] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(session.store.snapshot().skills.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let state = test_state();
        let response = send(
            &state,
            Method::GET,
            &format!("/api/v1/sessions/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_second_export_while_one_runs_is_conflict() {
        let state = test_state();
        let session = state.sessions.create(sample_document()).await;
        let _in_flight = session.begin_export().unwrap();

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/sessions/{}/export/pdf", session.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_stateless_pdf_export() {
        let state = test_state();
        let document = serde_json::to_value(sample_document()).unwrap();
        let response = send(&state, Method::POST, "/api/v1/export/pdf", Some(document)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"resume.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_preview_lists_sections() {
        let state = test_state();
        let session = state.sessions.create(sample_document()).await;
        let response = send(
            &state,
            Method::GET,
            &format!("/api/v1/sessions/{}/preview", session.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let text = body["plainText"].as_str().unwrap();
        assert!(text.starts_with("Ada Lovelace"));
        assert!(text.contains("EXPERIENCE"));
    }

    #[tokio::test]
    async fn test_enhance_without_credential_is_503() {
        let state = test_state();
        let response = send(
            &state,
            Method::POST,
            "/api/v1/enhance",
            Some(json!({ "text": "I build things", "type": "summary" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["error"]["code"], "AI_NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_enhance_blank_text_is_rejected() {
        let state = test_state();
        let response = send(
            &state,
            Method::POST,
            "/api/v1/enhance",
            Some(json!({ "text": "   ", "type": "experience" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_parse_document_rejects_pdf_upload() {
        let state = test_state();
        let response = send(
            &state,
            Method::POST,
            "/api/v1/parse-document",
            Some(json!({ "file": "data:application/pdf;base64,JVBERi0=", "fileType": "application/pdf" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "INVALID_UPLOAD");
    }
}
