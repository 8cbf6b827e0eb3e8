// Shared fixtures for unit tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wiremock::ResponseTemplate;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::session::store::SessionStore;
use crate::speech::{SpeechSynthesizer, SynthesisError};
use crate::state::AppState;

/// A canned successful chat-completion reply.
pub fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 10}
    }))
}

pub fn test_config(scratch: &Path, llm_base_url: &str) -> Config {
    Config {
        groq_api_key: Some("gsk_test".to_string()),
        llm_base_url: llm_base_url.to_string(),
        llm_model: "test-model".to_string(),
        llm_timeout_secs: 5,
        scratch_dir: scratch.to_path_buf(),
        tts_binary: "piper".to_string(),
        tts_voice_model: scratch.join("voice.onnx"),
        short_text_threshold: 50,
        intro_min_words: 100,
        intro_max_words: 150,
        max_upload_bytes: 1024 * 1024,
        session_ttl_secs: 3600,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

pub fn test_state(scratch: &Path, llm_base_url: &str) -> AppState {
    test_state_with(scratch, llm_base_url, WavStubSynthesizer)
}

pub fn test_state_with(
    scratch: &Path,
    llm_base_url: &str,
    synthesizer: impl SpeechSynthesizer + 'static,
) -> AppState {
    let config = test_config(scratch, llm_base_url);
    AppState {
        llm: LlmClient::from_config(&config).unwrap(),
        synthesizer: Arc::new(synthesizer),
        sessions: SessionStore::new(scratch),
        config,
    }
}

/// Writes a header-only WAV file instead of running a TTS engine.
pub struct WavStubSynthesizer;

#[async_trait]
impl SpeechSynthesizer for WavStubSynthesizer {
    async fn synthesize(&self, _text: &str, output: &Path) -> Result<(), SynthesisError> {
        let mut wav = Vec::with_capacity(44);
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&36u32.to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&22_050u32.to_le_bytes());
        wav.extend_from_slice(&44_100u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&0u32.to_le_bytes());
        tokio::fs::write(output, wav).await?;
        Ok(())
    }

    fn backend(&self) -> &str {
        "wav-stub"
    }
}

pub struct FailingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str, _output: &Path) -> Result<(), SynthesisError> {
        Err(SynthesisError::ModelNotFound("voices/missing.onnx".into()))
    }

    fn backend(&self) -> &str {
        "failing"
    }
}
