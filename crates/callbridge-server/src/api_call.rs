//! Call setup: answers the telephony provider's incoming-call webhook with
//! TwiML that connects the call audio to `/stream`.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Extension,
};
use std::sync::Arc;

/// Handler for `POST /incoming-call`.
pub async fn incoming_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());

    let url = stream_url(state.public_url.as_deref(), host).ok_or_else(|| {
        ApiError::BadRequest("no public_url configured and no Host header".to_string())
    })?;

    tracing::info!(%url, "incoming call, connecting media stream");

    Ok(([(header::CONTENT_TYPE, "text/xml")], connect_twiml(&url)).into_response())
}

/// WebSocket URL of the media stream endpoint.
///
/// `public_url` wins over the request's `Host`. HTTP schemes are mapped to
/// their WebSocket counterparts; a bare host gets `wss://`.
pub fn stream_url(public_url: Option<&str>, host: Option<&str>) -> Option<String> {
    let base = match public_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => {
            let url = url.trim_end_matches('/');
            if let Some(rest) = url.strip_prefix("https://") {
                format!("wss://{}", rest)
            } else if let Some(rest) = url.strip_prefix("http://") {
                format!("ws://{}", rest)
            } else if url.starts_with("wss://") || url.starts_with("ws://") {
                url.to_string()
            } else {
                format!("wss://{}", url)
            }
        }
        None => format!("wss://{}", host.map(str::trim).filter(|h| !h.is_empty())?),
    };
    Some(format!("{}/stream", base))
}

pub fn connect_twiml(stream_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"{}\" /></Connect></Response>",
        escape_attr(stream_url)
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
