mod config;
mod document;
mod errors;
mod job;
mod llm_client;
mod routes;
mod session;
mod speech;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::store::SessionStore;
use crate::speech::PiperSynthesizer;
use crate::state::AppState;

const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails only on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jobvoice v{}", env!("CARGO_PKG_VERSION"));

    if config.groq_api_key.is_none() {
        warn!("GROQ_API_KEY is not set; field extraction and intro generation will fail");
    }

    // Scratch root for per-session uploads and audio
    let sessions = SessionStore::new(&config.scratch_dir);
    tokio::fs::create_dir_all(sessions.root())
        .await
        .with_context(|| format!("creating scratch dir {}", config.scratch_dir.display()))?;
    info!("Scratch dir: {}", sessions.root().display());

    // Idle sessions are dropped together with their scratch files
    let session_ttl = Duration::from_secs(config.session_ttl_secs);
    tokio::spawn(
        sessions
            .clone()
            .run_eviction(session_ttl, SESSION_SWEEP_PERIOD.min(session_ttl)),
    );
    info!("Sessions expire after {}s idle", config.session_ttl_secs);

    let llm = LlmClient::from_config(&config).context("building HTTP client")?;
    info!(
        "LLM client initialized (model: {}, base: {})",
        llm.model(),
        config.llm_base_url
    );

    let synthesizer = Arc::new(PiperSynthesizer::new(
        config.tts_binary.clone(),
        config.tts_voice_model.clone(),
    ));
    if !config.tts_voice_model.exists() {
        warn!(
            "Voice model {} not found; audio conversion will fail until it is installed",
            config.tts_voice_model.display()
        );
    }

    let state = AppState {
        config: config.clone(),
        llm,
        synthesizer,
        sessions,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
