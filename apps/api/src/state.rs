use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::session::store::SessionStore;
use crate::speech::SpeechSynthesizer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: LlmClient,
    /// Pluggable TTS backend. Default: PiperSynthesizer.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub sessions: SessionStore,
}
