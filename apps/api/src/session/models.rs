use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::document::DocumentKind;
use crate::errors::StageError;
use crate::job::fields::JobRecord;
use crate::job::intro::word_count;

/// Furthest stage a session has successfully reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NoFile,
    TextExtracted,
    FieldsExtracted,
    IntroGenerated,
    AudioGenerated,
}

#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    /// `None` when the extension is not one we can read.
    pub kind: Option<DocumentKind>,
    pub size_bytes: usize,
}

/// Everything one user has produced so far. Each stage keeps its last result;
/// a stage's slot is only filled once its predecessor succeeded.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub document: Option<UploadedDocument>,
    pub text: Option<Result<String, StageError>>,
    pub fields: Option<Result<JobRecord, StageError>>,
    pub intro: Option<Result<String, StageError>>,
    pub audio: Option<Result<PathBuf, StageError>>,
    /// Set once the store has dropped this session. A handler that fetched the
    /// handle earlier must not write into the deleted scratch dir.
    pub removed: bool,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            document: None,
            text: None,
            fields: None,
            intro: None,
            audio: None,
            removed: false,
        }
    }

    /// Drops every stage result; used when a new document is uploaded.
    pub fn reset(&mut self) {
        self.document = None;
        self.text = None;
        self.clear_from_fields();
    }

    pub fn clear_from_fields(&mut self) {
        self.fields = None;
        self.clear_from_intro();
    }

    pub fn clear_from_intro(&mut self) {
        self.intro = None;
        self.audio = None;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn stage(&self) -> Stage {
        if !matches!(self.text, Some(Ok(_))) {
            return Stage::NoFile;
        }
        if !matches!(self.fields, Some(Ok(_))) {
            return Stage::TextExtracted;
        }
        if !matches!(self.intro, Some(Ok(_))) {
            return Stage::FieldsExtracted;
        }
        if !matches!(self.audio, Some(Ok(_))) {
            return Stage::IntroGenerated;
        }
        Stage::AudioGenerated
    }

    pub fn text_ok(&self) -> Option<&str> {
        match &self.text {
            Some(Ok(text)) => Some(text),
            _ => None,
        }
    }

    pub fn fields_ok(&self) -> Option<&JobRecord> {
        match &self.fields {
            Some(Ok(record)) => Some(record),
            _ => None,
        }
    }

    pub fn intro_ok(&self) -> Option<&str> {
        match &self.intro {
            Some(Ok(intro)) => Some(intro),
            _ => None,
        }
    }

    /// The failure that halted progression, if any. At most one stage can hold
    /// an error since later stages never run after a failure.
    pub fn error(&self) -> Option<&StageError> {
        [
            self.text.as_ref().and_then(|r| r.as_ref().err()),
            self.fields.as_ref().and_then(|r| r.as_ref().err()),
            self.intro.as_ref().and_then(|r| r.as_ref().err()),
            self.audio.as_ref().and_then(|r| r.as_ref().err()),
        ]
        .into_iter()
        .flatten()
        .next()
    }

    pub fn view(&self, short_text_threshold: usize) -> SessionView {
        let extracted_text = self.text_ok().map(str::to_owned);
        let warning = extracted_text
            .as_deref()
            .filter(|text| is_short_text(text, short_text_threshold))
            .map(|_| "The job description text seems too short.".to_string());

        SessionView {
            id: self.id,
            stage: self.stage(),
            document: self.document.as_ref().map(|d| DocumentView {
                file_name: d.file_name.clone(),
                kind: d.kind,
                size_bytes: d.size_bytes,
            }),
            extracted_text,
            warning,
            fields: self.fields_ok().cloned(),
            intro_word_count: self.intro_ok().map(word_count),
            intro: self.intro_ok().map(str::to_owned),
            audio_url: matches!(self.audio, Some(Ok(_))).then(|| {
                format!(
                    "/api/v1/sessions/{}/audio?v={}",
                    self.id,
                    self.updated_at.timestamp_millis()
                )
            }),
            error: self.error().cloned(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub fn is_short_text(text: &str, threshold: usize) -> bool {
    text.trim().chars().count() < threshold
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub file_name: String,
    pub kind: Option<DocumentKind>,
    pub size_bytes: usize,
}

/// What the page renders after every action.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub stage: Stage,
    pub document: Option<DocumentView>,
    pub extracted_text: Option<String>,
    pub warning: Option<String>,
    pub fields: Option<JobRecord>,
    pub intro: Option<String>,
    pub intro_word_count: Option<usize>,
    pub audio_url: Option<String>,
    pub error: Option<StageError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
