//! Media-stream wire format and the payloads carried between stages.
//!
//! The inbound side mirrors the JSON events a telephony provider sends over
//! the media WebSocket (`connected`, `start`, `media`, `stop`, ...). The
//! outbound side is the single `media` event used to play audio back into
//! the call.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier binding every media message to one active call.
///
/// Assigned by the provider in the `start` event and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamSessionId(String);

impl StreamSessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata attached to the `start` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartMetadata {
    #[serde(rename = "streamSid")]
    pub stream_sid: StreamSessionId,
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
}

/// Base64 audio carried inside a `media` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

impl MediaPayload {
    /// Encodes raw audio bytes.
    pub fn from_bytes(audio: &[u8]) -> Self {
        Self {
            payload: base64::engine::general_purpose::STANDARD.encode(audio),
        }
    }

    /// Decodes the payload into raw audio bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.payload.as_bytes())
    }
}

/// One inbound media-stream event.
///
/// Events the pipeline has no use for (`mark`, `dtmf`, future additions)
/// deserialize as [`InboundEvent::Other`] instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    /// The socket is open; no stream id yet.
    Connected,
    /// The call's media stream has started.
    Start { start: StartMetadata },
    /// One frame of caller audio.
    Media { media: MediaPayload },
    /// The call has ended.
    Stop,
    #[serde(other)]
    Other,
}

/// One decoded inbound audio frame. May legitimately be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioPayload(Vec<u8>);

impl AudioPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for AudioPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Finalized text recognized from a span of caller audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    /// Builds a transcript from recognizer output.
    ///
    /// Returns `None` for empty or whitespace-only text.
    pub fn finalized(text: impl AsRef<str>) -> Option<Self> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text queued for speech synthesis: the greeting or one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyText(String);

impl ReplyText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Synthesized audio tagged for one call, ready for transport framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundAudioFrame {
    pub stream_sid: StreamSessionId,
    pub audio: Vec<u8>,
}

/// Wire form of [`OutboundAudioFrame`].
#[derive(Serialize)]
struct OutboundMediaEvent<'a> {
    event: &'static str,
    #[serde(rename = "streamSid")]
    stream_sid: &'a StreamSessionId,
    media: MediaPayload,
}

impl OutboundAudioFrame {
    pub fn new(stream_sid: StreamSessionId, audio: Vec<u8>) -> Self {
        Self { stream_sid, audio }
    }

    /// Serializes the frame as an outbound `media` event.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OutboundMediaEvent {
            event: "media",
            stream_sid: &self.stream_sid,
            media: MediaPayload::from_bytes(&self.audio),
        })
    }
}
