//! Webhook entry point for hosted voice platforms (Vapi, Retell, Bland).
//!
//! These platforms do their own speech handling and post one caller
//! utterance per request. Each request is answered with a single dialogue
//! turn from the call seed; nothing is kept between requests.

use crate::api::ApiError;
use crate::AppState;
use axum::{Extension, Json};
use callbridge_types::Conversation;
use callbridge_voice::deadline;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Platforms whose responses carry an `endCall` flag.
const END_CALL_PLATFORMS: [&str; 3] = ["vapi", "retell", "bland"];

/// Keys consumed by normalization; everything else lands in `metadata`.
const NORMALIZED_KEYS: [&str; 6] = [
    "platform",
    "message",
    "text",
    "session_id",
    "sessionId",
    "call_id",
];

/// A webhook payload in platform-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    /// Lowercased platform name, empty when absent.
    pub platform: String,
    pub message: String,
    pub session_id: String,
    /// Remaining payload keys, plus `platform`.
    pub metadata: Map<String, Value>,
}

impl WebhookRequest {
    /// Normalizes the field-name variants used by different platforms.
    pub fn normalize(payload: Map<String, Value>) -> Self {
        let platform = first_text(&payload, &["platform"]).to_lowercase();
        let message = first_text(&payload, &["message", "text"]);
        let session_id = first_text(&payload, &["session_id", "sessionId", "call_id"]);

        let mut metadata: Map<String, Value> = payload
            .into_iter()
            .filter(|(key, _)| !NORMALIZED_KEYS.contains(&key.as_str()))
            .collect();
        metadata.insert("platform".to_string(), Value::String(platform.clone()));

        Self {
            platform,
            message,
            session_id,
            metadata,
        }
    }

    /// Shapes `reply` the way the originating platform expects it.
    pub fn respond(&self, reply: &str) -> Value {
        let mut response = json!({ "message": reply });
        if END_CALL_PLATFORMS.contains(&self.platform.as_str()) {
            let end_call = self
                .metadata
                .get("should_end_call")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            response["endCall"] = Value::Bool(end_call);
        }
        response
    }
}

/// First non-empty string among `keys`, or an empty string.
fn first_text(payload: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Handler for `POST /webhook/voice`.
pub async fn voice_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let request = WebhookRequest::normalize(payload);
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }

    let started = Instant::now();
    let mut conversation = Conversation::seeded(state.pipeline.seed());
    conversation
        .push_caller(request.message.trim())
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    let config = state.pipeline.config();
    let engine = state.pipeline.engines().dialogue.as_ref();
    let turns = conversation.turns();
    let timeout = config.timeouts.dialogue();
    let reply = config
        .retry
        .run("dialogue", || deadline("dialogue", timeout, engine.generate(turns)))
        .await
        .map_err(|e| {
            tracing::warn!(
                session_id = %request.session_id,
                platform = %request.platform,
                "webhook dialogue turn failed: {}",
                e
            );
            ApiError::BadGateway(e.to_string())
        })?;

    let reply = reply.trim();
    if reply.is_empty() {
        return Err(ApiError::BadGateway(
            "dialogue engine returned an empty reply".to_string(),
        ));
    }

    tracing::info!(
        session_id = %request.session_id,
        platform = %request.platform,
        user_input = %request.message,
        response = %reply,
        latency_ms = started.elapsed().as_millis() as u64,
        "voice webhook interaction"
    );

    Ok(Json(request.respond(reply)))
}
