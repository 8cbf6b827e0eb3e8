//! Document Text Extractor: turns an uploaded PDF, DOCX or TXT file into plain text.
//!
//! Failures never escape as faults: unreadable, corrupt or unsupported documents
//! come back as a `document_read` [`StageError`] carrying the parser's message.

use std::fmt;
use std::path::Path;

use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::StageError;

/// The three document types the upload accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Maps a file extension (without the dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Extracts the text of the document at `path`, trimmed at both ends.
pub async fn extract_text(path: &Path, kind: DocumentKind) -> Result<String, StageError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StageError::document_read(format!("{}: {e}", path.display())))?;

    let text = match kind {
        DocumentKind::Txt => String::from_utf8(bytes)
            .map_err(|e| StageError::document_read(e.to_string()))?,
        DocumentKind::Pdf => run_parser(move || pdf_text(&bytes)).await?,
        DocumentKind::Docx => run_parser(move || docx_text(&bytes)).await?,
    };

    let text = text.trim().to_string();
    debug!("Extracted {} chars from {kind} document", text.chars().count());
    Ok(text)
}

/// Runs a CPU-bound parser on the blocking pool. A panicking parser is
/// reported as a read error rather than taking the request down.
async fn run_parser<F>(parse: F) -> Result<String, StageError>
where
    F: FnOnce() -> Result<String, StageError> + Send + 'static,
{
    tokio::task::spawn_blocking(parse).await.map_err(|e| {
        warn!("Document parser aborted: {e}");
        StageError::document_read(format!("document parser aborted: {e}"))
    })?
}

fn pdf_text(bytes: &[u8]) -> Result<String, StageError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| StageError::document_read(e.to_string()))?;

    // Empty pages contribute nothing.
    Ok(pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn docx_text(bytes: &[u8]) -> Result<String, StageError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| StageError::document_read(e.to_string()))?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            push_paragraph_text(&paragraph.children, &mut text);
            text.push('\n');
        }
    }
    Ok(text)
}

/// Appends the visible text of a paragraph, descending into hyperlinks.
/// Tabs become `\t` and line breaks `\n` so adjacent words stay apart.
fn push_paragraph_text(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push('\t'),
                        RunChild::Break(_) | RunChild::CarriageReturn(_) => text.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_paragraph_text(&link.children, text),
            _ => {}
        }
    }
}
