use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Application configuration loaded from environment variables (and `.env`).
///
/// Only malformed values fail at startup. A missing `GROQ_API_KEY` is allowed:
/// every LLM call then fails with an authorization error instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub scratch_dir: PathBuf,
    pub tts_binary: String,
    pub tts_voice_model: PathBuf,
    /// Extracted text shorter than this (in chars) triggers the short-text warning.
    pub short_text_threshold: usize,
    pub intro_min_words: u32,
    pub intro_max_words: u32,
    pub max_upload_bytes: usize,
    /// Sessions untouched for this long are evicted along with their scratch files.
    pub session_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            groq_api_key: lookup("GROQ_API_KEY").filter(|key| !key.trim().is_empty()),
            llm_base_url: lookup("GROQ_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", 30)?,
            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("__DATA__")),
            tts_binary: lookup("TTS_BINARY").unwrap_or_else(|| "piper".to_string()),
            tts_voice_model: lookup("TTS_VOICE_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("voices/en_US-lessac-medium.onnx")),
            short_text_threshold: parse_or(&lookup, "SHORT_TEXT_THRESHOLD", 50)?,
            intro_min_words: parse_or(&lookup, "INTRO_MIN_WORDS", 100)?,
            intro_max_words: parse_or(&lookup, "INTRO_MAX_WORDS", 150)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            session_ttl_secs: parse_or(&lookup, "SESSION_TTL_SECS", 3600)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.intro_min_words > config.intro_max_words {
            bail!(
                "INTRO_MIN_WORDS ({}) must not exceed INTRO_MAX_WORDS ({})",
                config.intro_min_words,
                config.intro_max_words
            );
        }

        if config.session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be at least 1");
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        None => Ok(default),
    }
}
