//! The telephony media stream: one WebSocket per call, bridged onto the
//! call pipeline.

use crate::AppState;
use async_trait::async_trait;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use callbridge_pipeline::{TransportError, TransportSink, TransportSource};
use callbridge_types::{InboundEvent, OutboundAudioFrame};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::sync::Arc;

/// Handler for `GET /stream`.
pub async fn stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_call(socket, state))
}

async fn handle_call(socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("media stream connected");

    let (sender, receiver) = socket.split();
    let report = state
        .pipeline
        .run(WsSource { receiver }, WsSink { sender })
        .await;

    tracing::info!(
        call_id = %report.call_id,
        started = report.started(),
        replies = report.dialogue.as_ref().map(|d| d.replies).unwrap_or(0),
        "media stream closed"
    );
}

/// Inbound half of the media stream WebSocket.
pub struct WsSource {
    receiver: SplitStream<WebSocket>,
}

#[async_trait]
impl TransportSource for WsSource {
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>> {
        loop {
            let message = match self.receiver.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            };

            match message {
                Message::Text(text) => {
                    return Some(
                        serde_json::from_str(text.as_str())
                            .map_err(|e| TransportError::Malformed(e.to_string())),
                    );
                }
                Message::Binary(bytes) => {
                    return Some(Err(TransportError::Malformed(format!(
                        "unexpected binary message of {} bytes",
                        bytes.len()
                    ))));
                }
                Message::Close(_) => return None,
                // Pings are answered by axum.
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
    }
}

/// Outbound half of the media stream WebSocket.
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send_frame(&mut self, frame: &OutboundAudioFrame) -> Result<(), TransportError> {
        let json = frame
            .to_json()
            .map_err(|e| TransportError::Io(format!("failed to encode media frame: {}", e)))?;
        self.sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sender
            .close()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}
