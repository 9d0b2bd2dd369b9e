use crate::config::ElevenLabsConfig;
use crate::error::VoiceError;
use crate::synthesis::{AudioStream, Synthesizer, VoiceOptions};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;

/// Maximum text input size for one synthesis request (64 KiB).
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

#[derive(Debug, Serialize)]
struct StreamRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs streaming text-to-speech.
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: ElevenLabsConfig) -> Result<Self, VoiceError> {
        if config.api_key.is_empty() {
            return Err(VoiceError::Config("elevenlabs api_key is not set".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/text-to-speech/{}/stream",
            self.config.base_url.trim_end_matches('/'),
            voice_id
        )
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceOptions) -> Result<AudioStream, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::InvalidInput("text is empty".to_string()));
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::InvalidInput(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let response = self
            .client
            .post(self.endpoint(&voice.voice_id))
            .query(&[("output_format", voice.output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .json(&StreamRequest {
                text,
                model_id: &voice.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Status {
                service: "elevenlabs",
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .bytes_stream()
            .filter_map(|chunk| async move {
                match chunk {
                    Ok(bytes) if bytes.is_empty() => None,
                    Ok(bytes) => Some(Ok(bytes.to_vec())),
                    Err(e) => Some(Err(VoiceError::from(e))),
                }
            })
            .boxed())
    }
}
