//! Streaming speech recognition seam.
//!
//! A recognizer connection is split in two: the [`RecognitionConnection`]
//! half accepts audio, and recognition results arrive on an explicit
//! [`mpsc::Receiver`] of [`RecognitionEvent`]s. The caller owns both halves
//! and decides when to read events; there are no callbacks.

use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Capacity of the per-connection recognition event channel.
pub const RECOGNITION_EVENT_CAPACITY: usize = 256;

fn default_model() -> String {
    "nova-2".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_true() -> bool {
    true
}

fn default_encoding() -> String {
    "mulaw".to_string()
}

fn default_channels() -> u16 {
    1
}

fn default_sample_rate() -> u32 {
    8000
}

/// Options for one recognition connection.
///
/// Defaults match telephony media streams: 8 kHz mono mu-law.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionOptions {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub smart_format: bool,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Ask the engine for non-final hypotheses as well. They are delivered
    /// with `is_final: false` and never become transcripts.
    #[serde(default)]
    pub interim_results: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            model: default_model(),
            language: default_language(),
            smart_format: true,
            encoding: default_encoding(),
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            interim_results: false,
        }
    }
}

/// Asynchronous notification from a recognition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Transcript { text: String, is_final: bool },
    /// The engine reported a failure; no further events follow.
    Error(String),
}

/// Sending half of an open recognition connection.
#[async_trait]
pub trait RecognitionConnection: Send {
    /// Forwards one chunk of audio.
    async fn send(&mut self, audio: &[u8]) -> Result<(), VoiceError>;

    /// Tells the engine no more audio will follow. Pending results are still
    /// delivered on the event channel, which closes once the engine is done.
    async fn close(&mut self) -> Result<(), VoiceError>;
}

/// An open recognition connection and its event channel.
pub struct RecognitionStream {
    pub connection: Box<dyn RecognitionConnection>,
    pub events: mpsc::Receiver<RecognitionEvent>,
}

/// A streaming speech recognition engine.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn open(&self, options: &RecognitionOptions) -> Result<RecognitionStream, VoiceError>;
}
