//! Axum route handlers for the session API.
//!
//! Every stage endpoint returns the refreshed `SessionView`, including when the
//! stage itself failed; only request problems (unknown session, locked stage,
//! bad upload) become HTTP errors.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::models::{Session, SessionView};
use crate::session::workflow::{
    ensure_active, run_audio_synthesis, run_field_extraction, run_intro_generation,
    upload_document,
};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Mutex<Session>>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

fn view_of(state: &AppState, session: &Session) -> Json<SessionView> {
    Json(session.view(state.config.short_text_threshold))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let handle = state.sessions.create().await;
    let session = handle.lock().await;
    Ok((StatusCode::CREATED, view_of(&state, &session)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let session = handle.lock().await;
    ensure_active(&session)?;
    Ok(view_of(&state, &session))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/document
///
/// Multipart upload with a single `file` part. Extraction runs immediately.
pub async fn handle_upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| AppError::Validation(format!("Missing '{FILE_FIELD}' field")))?;

    let mut session = handle.lock().await;
    upload_document(&state, &mut session, &file_name, bytes).await?;
    Ok(view_of(&state, &session))
}

/// POST /api/v1/sessions/:id/fields
pub async fn handle_extract_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    run_field_extraction(&state, &mut session).await?;
    Ok(view_of(&state, &session))
}

/// POST /api/v1/sessions/:id/intro
pub async fn handle_generate_intro(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    run_intro_generation(&state, &mut session).await?;
    Ok(view_of(&state, &session))
}

/// POST /api/v1/sessions/:id/audio
pub async fn handle_synthesize_audio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    run_audio_synthesis(&state, &mut session).await?;
    Ok(view_of(&state, &session))
}

/// GET /api/v1/sessions/:id/audio
pub async fn handle_get_audio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = find_session(&state, id).await?;
    let session = handle.lock().await;
    ensure_active(&session)?;

    let path = match &session.audio {
        Some(Ok(path)) => path.clone(),
        _ => return Err(AppError::NotFound("No audio has been generated yet".into())),
    };
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::Error::new(e).context(format!("reading {}", path.display())))?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    )
        .into_response())
}
