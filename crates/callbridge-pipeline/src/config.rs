//! Per-call pipeline tuning.
//!
//! Loaded as the `[pipeline]` table of the server configuration; every
//! field has a default so the table may be omitted entirely.

use callbridge_voice::{RecognitionOptions, RetryPolicy, VoiceOptions};
use serde::Deserialize;
use std::time::Duration;

fn default_audio_capacity() -> usize {
    512
}

fn default_text_capacity() -> usize {
    32
}

fn default_speech_capacity() -> usize {
    32
}

fn default_recognizer_open_ms() -> u64 {
    10_000
}

fn default_recognizer_send_ms() -> u64 {
    5_000
}

fn default_recognition_drain_ms() -> u64 {
    5_000
}

fn default_dialogue_ms() -> u64 {
    30_000
}

fn default_synthesis_open_ms() -> u64 {
    15_000
}

fn default_synthesis_chunk_ms() -> u64 {
    15_000
}

/// Capacities of the three hand-off queues.
///
/// The audio queue is the largest: a telephony stream delivers a frame
/// every 20 ms and recognition should never throttle the transport in
/// normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueueCapacities {
    #[serde(default = "default_audio_capacity")]
    pub audio: usize,
    #[serde(default = "default_text_capacity")]
    pub text: usize,
    #[serde(default = "default_speech_capacity")]
    pub speech: usize,
}

impl Default for QueueCapacities {
    fn default() -> Self {
        Self {
            audio: default_audio_capacity(),
            text: default_text_capacity(),
            speech: default_speech_capacity(),
        }
    }
}

/// Upper bounds on engine calls, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_recognizer_open_ms")]
    pub recognizer_open_ms: u64,
    /// Bound on a single audio write or the final close of the recognizer.
    #[serde(default = "default_recognizer_send_ms")]
    pub recognizer_send_ms: u64,
    /// How long to wait for late final transcripts after the audio ends.
    #[serde(default = "default_recognition_drain_ms")]
    pub recognition_drain_ms: u64,
    #[serde(default = "default_dialogue_ms")]
    pub dialogue_ms: u64,
    #[serde(default = "default_synthesis_open_ms")]
    pub synthesis_open_ms: u64,
    /// Longest gap allowed between two audio chunks of one utterance.
    #[serde(default = "default_synthesis_chunk_ms")]
    pub synthesis_chunk_ms: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            recognizer_open_ms: default_recognizer_open_ms(),
            recognizer_send_ms: default_recognizer_send_ms(),
            recognition_drain_ms: default_recognition_drain_ms(),
            dialogue_ms: default_dialogue_ms(),
            synthesis_open_ms: default_synthesis_open_ms(),
            synthesis_chunk_ms: default_synthesis_chunk_ms(),
        }
    }
}

impl StageTimeouts {
    pub fn recognizer_open(&self) -> Duration {
        Duration::from_millis(self.recognizer_open_ms)
    }

    pub fn recognizer_send(&self) -> Duration {
        Duration::from_millis(self.recognizer_send_ms)
    }

    pub fn recognition_drain(&self) -> Duration {
        Duration::from_millis(self.recognition_drain_ms)
    }

    pub fn dialogue(&self) -> Duration {
        Duration::from_millis(self.dialogue_ms)
    }

    pub fn synthesis_open(&self) -> Duration {
        Duration::from_millis(self.synthesis_open_ms)
    }

    pub fn synthesis_chunk(&self) -> Duration {
        Duration::from_millis(self.synthesis_chunk_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub queues: QueueCapacities,
    #[serde(default)]
    pub timeouts: StageTimeouts,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub recognition: RecognitionOptions,
    #[serde(default)]
    pub voice: VoiceOptions,
}
