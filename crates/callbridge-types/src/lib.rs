//! Shared types for the callbridge workspace.
//!
//! This crate provides the data model that every other crate speaks:
//! conversation turns and their ordering rules, the payloads that travel
//! between pipeline stages, and the wire format of the telephony media
//! stream (Twilio Media Streams JSON).
//!
//! No crate in the workspace defines its own copy of these types. Engine
//! clients, pipeline stages, and the HTTP server all depend on
//! `callbridge-types` and nothing else for cross-cutting definitions.

pub mod conversation;
pub mod media;

pub use conversation::{CallSeed, Conversation, ConversationError, ConversationTurn, Role};
pub use media::{
    AudioPayload, InboundEvent, MediaPayload, OutboundAudioFrame, ReplyText, StartMetadata,
    StreamSessionId, Transcript,
};

/// Instruction used when no knowledge base is available.
pub const DEFAULT_INSTRUCTION: &str =
    "You are a friendly, concise phone assistant. Answer the caller's questions \
     helpfully and do not make up information.";

/// Greeting used when the knowledge base does not define one.
pub const DEFAULT_GREETING: &str = "Hello, how can I help you?";
