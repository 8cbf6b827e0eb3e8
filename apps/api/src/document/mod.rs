// Uploaded job-description documents: type detection and text extraction.

pub mod extractor;

pub use extractor::{extract_text, DocumentKind};
