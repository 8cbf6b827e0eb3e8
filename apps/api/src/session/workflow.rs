//! Session workflow: one function per user action.
//!
//! Flow: upload → extract text → extract fields → generate intro → synthesize audio.
//!
//! Each stage runs only if the previous one succeeded (otherwise `AppError::Conflict`).
//! A stage that runs and fails stores its `StageError` on the session and returns
//! `Ok`: the failure is shown to the user, not raised.

use std::path::Path;

use bytes::Bytes;
use tracing::{info, warn};

use crate::document::{extract_text, DocumentKind};
use crate::errors::{AppError, StageError};
use crate::job::fields::extract_job_fields;
use crate::job::intro::{generate_intro, WordTarget};
use crate::session::models::{is_short_text, Session, UploadedDocument};
use crate::state::AppState;

/// Name of the synthesized audio inside a session's scratch dir.
pub const AUDIO_FILE_NAME: &str = "job_intro.wav";

/// Prefix of the stored upload; the extension follows the document kind.
const UPLOAD_STEM: &str = "jobdesc";

/// Fails with `NotFound` once the store has dropped the session.
pub fn ensure_active(session: &Session) -> Result<(), AppError> {
    if session.removed {
        return Err(AppError::NotFound(format!("Session {} not found", session.id)));
    }
    Ok(())
}

/// Stores an upload and extracts its text. Restarts the whole sequence.
pub async fn upload_document(
    state: &AppState,
    session: &mut Session,
    file_name: &str,
    bytes: Bytes,
) -> Result<(), AppError> {
    ensure_active(session)?;
    session.reset();
    session.touch();

    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let kind = DocumentKind::from_extension(&ext);

    let dir = state.sessions.scratch_dir(session.id);
    let stored_ext = kind.map(DocumentKind::extension).unwrap_or("bin");
    let path = dir.join(format!("{UPLOAD_STEM}.{stored_ext}"));

    info!(
        "Session {}: received '{}' ({} bytes)",
        session.id,
        file_name,
        bytes.len()
    );
    session.document = Some(UploadedDocument {
        file_name: file_name.to_string(),
        kind,
        size_bytes: bytes.len(),
    });

    let result = match (clear_previous_run(&dir).await, kind) {
        (Err(e), _) => Err(e),
        (Ok(()), None) => Err(StageError::document_read(format!(
            "unsupported document type '{ext}': upload a PDF, DOCX or TXT file"
        ))),
        (Ok(()), Some(kind)) => match write_scratch_file(&dir, &path, &bytes).await {
            Ok(()) => extract_text(&path, kind).await,
            Err(e) => Err(e),
        },
    };

    match &result {
        Ok(text) if is_short_text(text, state.config.short_text_threshold) => warn!(
            "Session {}: extracted text is short ({} chars)",
            session.id,
            text.chars().count()
        ),
        Ok(text) => info!(
            "Session {}: extracted {} chars",
            session.id,
            text.chars().count()
        ),
        Err(e) => warn!("Session {}: {e}", session.id),
    }
    session.text = Some(result);
    Ok(())
}

/// Runs field extraction on the session's text. Clears any intro and audio.
pub async fn run_field_extraction(state: &AppState, session: &mut Session) -> Result<(), AppError> {
    ensure_active(session)?;
    let text = session
        .text_ok()
        .ok_or_else(|| AppError::Conflict("Upload a readable job description first".into()))?
        .to_string();

    session.clear_from_fields();
    session.touch();
    info!("Session {}: extracting job fields", session.id);

    let result = extract_job_fields(&text, &state.llm).await;
    match &result {
        Ok(record) => info!(
            "Session {}: job title '{}'",
            session.id,
            record.job_title().unwrap_or("<none>")
        ),
        Err(e) => warn!("Session {}: {e}", session.id),
    }
    session.fields = Some(result);
    session.touch();
    Ok(())
}

/// Generates the introduction script from extracted fields. Clears any audio.
pub async fn run_intro_generation(state: &AppState, session: &mut Session) -> Result<(), AppError> {
    ensure_active(session)?;
    let record = session
        .fields_ok()
        .ok_or_else(|| AppError::Conflict("Extract job fields successfully first".into()))?
        .clone();

    session.clear_from_intro();
    session.touch();
    info!("Session {}: generating introduction", session.id);

    let words = WordTarget {
        min: state.config.intro_min_words,
        max: state.config.intro_max_words,
    };
    let result = generate_intro(&record, &state.llm, words).await;
    if let Err(e) = &result {
        warn!("Session {}: {e}", session.id);
    }
    session.intro = Some(result);
    session.touch();
    Ok(())
}

/// Renders the introduction to `job_intro.wav` in the session's scratch dir.
pub async fn run_audio_synthesis(state: &AppState, session: &mut Session) -> Result<(), AppError> {
    ensure_active(session)?;
    let intro = session
        .intro_ok()
        .ok_or_else(|| AppError::Conflict("Generate the introduction script first".into()))?
        .to_string();

    session.audio = None;
    session.touch();

    let dir = state.sessions.scratch_dir(session.id);
    let path = dir.join(AUDIO_FILE_NAME);
    info!(
        "Session {}: synthesizing audio with {}",
        session.id,
        state.synthesizer.backend()
    );

    let result = match prepare_audio_path(&dir, &path).await {
        Ok(()) => state
            .synthesizer
            .synthesize(&intro, &path)
            .await
            .map(|()| path)
            .map_err(|e| StageError::synthesis(e.to_string())),
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        warn!("Session {}: {e}", session.id);
    }
    session.audio = Some(result);
    session.touch();
    Ok(())
}

/// Deletes the previous upload (whatever its extension) and audio so the
/// scratch dir only ever holds the current run.
async fn clear_previous_run(dir: &Path) -> Result<(), StageError> {
    let io_error =
        |e: std::io::Error| StageError::document_read(format!("{}: {e}", dir.display()));

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error(e)),
    };
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let stem = Path::new(&*name).file_stem().and_then(|s| s.to_str());
        let stale = name == AUDIO_FILE_NAME || stem == Some(UPLOAD_STEM);
        if stale {
            tokio::fs::remove_file(entry.path()).await.map_err(io_error)?;
        }
    }
    Ok(())
}

async fn write_scratch_file(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StageError::document_read(format!("{}: {e}", dir.display())))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| StageError::document_read(format!("{}: {e}", path.display())))
}

/// Ensures the directory exists and no stale audio survives a failed render.
async fn prepare_audio_path(dir: &Path, path: &Path) -> Result<(), StageError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StageError::synthesis(format!("{}: {e}", dir.display())))?;
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StageError::synthesis(format!("{}: {e}", path.display()))),
    }
}
