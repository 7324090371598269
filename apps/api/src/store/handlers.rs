use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::export::{build_tree, ResumeTree};
use crate::models::resume::{Collection, Entry, PersonalInfo, ResumeDocument};
use crate::state::AppState;
use crate::store::{OpOutcome, ResumeOp, Session};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub document: ResumeDocument,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: String,
    pub document: ResumeDocument,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub tree: ResumeTree,
    pub plain_text: String,
}

pub(crate) async fn session_or_404(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
/// Optional body: a full `ResumeDocument` to start from.
pub async fn handle_create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let document = if body.iter().all(u8::is_ascii_whitespace) {
        ResumeDocument::default()
    } else {
        serde_json::from_slice::<ResumeDocument>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid resume document: {e}")))?
            .validated()?
    };

    let session = state.sessions.create(document).await;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id,
            document: session.store.snapshot(),
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = session_or_404(&state, id).await?;
    Ok(Json(session.store.snapshot()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// PUT /api/v1/sessions/:id/personal-info
pub async fn handle_set_personal_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(info): Json<PersonalInfo>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = session_or_404(&state, id).await?;
    session.store.apply(ResumeOp::SetPersonalInfo(info))?;
    Ok(Json(session.store.snapshot()))
}

/// POST /api/v1/sessions/:id/entries/:collection
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path((id, collection)): Path<(Uuid, Collection)>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<EntryResponse>), AppError> {
    let session = session_or_404(&state, id).await?;
    let entry = Entry::from_json(collection, body)?;

    let OpOutcome::Added(entry_id) = session.store.apply(ResumeOp::Add(entry))? else {
        return Err(AppError::Internal(anyhow::anyhow!("add returned an unexpected outcome")));
    };
    tracing::debug!(session_id = %id, collection = collection.as_str(), entry_id = %entry_id, "entry added");

    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            id: entry_id,
            document: session.store.snapshot(),
        }),
    ))
}

/// PUT /api/v1/sessions/:id/entries/:collection/:entry_id
pub async fn handle_update_entry(
    State(state): State<AppState>,
    Path((id, collection, entry_id)): Path<(Uuid, Collection, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ResumeDocument>, AppError> {
    let session = session_or_404(&state, id).await?;
    let entry = Entry::from_json(collection, body)?;
    session.store.apply(ResumeOp::Update {
        id: entry_id,
        entry,
    })?;
    Ok(Json(session.store.snapshot()))
}

/// DELETE /api/v1/sessions/:id/entries/:collection/:entry_id
/// Idempotent: deleting an absent entry still answers 204.
pub async fn handle_delete_entry(
    State(state): State<AppState>,
    Path((id, collection, entry_id)): Path<(Uuid, Collection, String)>,
) -> Result<StatusCode, AppError> {
    let session = session_or_404(&state, id).await?;
    session.store.apply(ResumeOp::Delete {
        collection,
        id: entry_id,
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/:id/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, AppError> {
    let session = session_or_404(&state, id).await?;
    let tree = build_tree(&session.store.snapshot());
    Ok(Json(PreviewResponse {
        plain_text: tree.plain_text(),
        tree,
    }))
}

fn document_event(document: &ResumeDocument) -> Event {
    Event::default()
        .event("document")
        .json_data(document)
        .unwrap_or_else(|_| Event::default().event("error").data("serialization failed"))
}

/// GET /api/v1/sessions/:id/events
/// Sends the current document, then one event per committed change.
pub async fn handle_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = session_or_404(&state, id).await?;
    let mut rx = session.store.subscribe();
    let initial = document_event(&rx.borrow_and_update());

    let changes = stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let event = document_event(&rx.borrow_and_update());
        Some((event, rx))
    });

    let events = stream::once(async move { initial })
        .chain(changes)
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
