pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    response::Html,
    routing::{get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// GET /
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/document",
            post(handlers::handle_upload_document),
        )
        .route(
            "/api/v1/sessions/:id/fields",
            post(handlers::handle_extract_fields),
        )
        .route(
            "/api/v1/sessions/:id/intro",
            post(handlers::handle_generate_intro),
        )
        .route(
            "/api/v1/sessions/:id/audio",
            post(handlers::handle_synthesize_audio).get(handlers::handle_get_audio),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
