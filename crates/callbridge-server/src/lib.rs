//! HTTP and WebSocket front end for callbridge.
//!
//! Routes:
//!
//! - `GET /health`: liveness.
//! - `POST /incoming-call`: TwiML that tells the telephony provider to open
//!   a media stream to `/stream`.
//! - `GET /stream`: the media stream itself; one [`CallPipeline`] run per
//!   connection.
//! - `POST /webhook/voice`: single-turn dialogue for webhook-driven voice
//!   platforms.

pub mod api;
pub mod api_call;
pub mod api_stream;
pub mod api_webhook;
pub mod config;
pub mod engines;
pub mod knowledge;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use callbridge_pipeline::CallPipeline;
use config::ServerConfig;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// State shared by every request handler.
pub struct AppState {
    /// Engines, tuning and call seed. Each call gets its own run.
    pub pipeline: CallPipeline,
    /// Externally reachable base URL, if configured.
    pub public_url: Option<String>,
    /// Deployment label reported by `/health`.
    pub environment: String,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: CallPipeline, server: &ServerConfig) -> Self {
        Self {
            pipeline,
            public_url: server.public_url.clone(),
            environment: server.environment.clone(),
            max_body_bytes: server.max_body_bytes,
        }
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/incoming-call", post(api_call::incoming_call_handler))
        .route("/stream", get(api_stream::stream_handler))
        .route("/webhook/voice", post(api_webhook::voice_webhook_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
