//! Speech synthesis: renders the introduction script to a WAV file.
//!
//! `AppState` carries an `Arc<dyn SpeechSynthesizer>`. The default backend is
//! [`PiperSynthesizer`], which runs the local `piper` neural TTS binary with a
//! fixed pretrained voice model.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("voice model not found at {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to start TTS engine '{binary}': {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("TTS engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("TTS engine produced no audio at {0}")]
    EmptyOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Writes `text` as audio to `output`, replacing any existing file.
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SynthesisError>;

    /// Short backend label for logs.
    fn backend(&self) -> &str;
}

/// Runs `piper --model <voice> --output_file <path>` with the text on stdin.
pub struct PiperSynthesizer {
    binary: String,
    voice_model: PathBuf,
}

impl PiperSynthesizer {
    pub fn new(binary: impl Into<String>, voice_model: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            voice_model: voice_model.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SynthesisError> {
        if !tokio::fs::try_exists(&self.voice_model).await.unwrap_or(false) {
            return Err(SynthesisError::ModelNotFound(self.voice_model.clone()));
        }

        let mut child = Command::new(&self.binary)
            .arg("--model")
            .arg(&self.voice_model)
            .arg("--output_file")
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SynthesisError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A dead engine closes its end early; the exit status below says why.
            if let Err(e) = stdin.write_all(text.as_bytes()).await {
                warn!("Could not write text to TTS engine: {e}");
            }
        }

        let result = child.wait_with_output().await?;
        if !result.status.success() {
            return Err(SynthesisError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let written = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(SynthesisError::EmptyOutput(output.to_path_buf()));
        }

        info!("Synthesized {} bytes of audio to {}", written, output.display());
        Ok(())
    }

    fn backend(&self) -> &str {
        "piper"
    }
}
