//! Streaming speech synthesis seam.

use crate::error::VoiceError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Audio chunks of one utterance, produced lazily and consumed once.
pub type AudioStream = BoxStream<'static, Result<Vec<u8>, VoiceError>>;

fn default_voice_id() -> String {
    "i4CzbCVWoqvD0P1QJCUL".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "ulaw_8000".to_string()
}

/// Voice selection for synthesized replies.
///
/// The default output format is 8 kHz mu-law, which telephony media
/// streams play back without transcoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceOptions {
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for VoiceOptions {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            model_id: default_model_id(),
            output_format: default_output_format(),
        }
    }
}

/// A text-to-speech engine that streams audio as it is produced.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceOptions) -> Result<AudioStream, VoiceError>;
}
