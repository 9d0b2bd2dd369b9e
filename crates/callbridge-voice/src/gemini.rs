//! Gemini `generateContent` dialogue engine.

use crate::config::GeminiConfig;
use crate::dialogue::DialogueEngine;
use crate::error::VoiceError;
use async_trait::async_trait;
use callbridge_types::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone)]
pub struct GeminiDialogue {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiDialogue {
    pub fn new(config: GeminiConfig) -> Result<Self, VoiceError> {
        if config.api_key.is_empty() {
            return Err(VoiceError::Config("gemini api_key is not set".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// System turns become the system instruction; caller and assistant turns
/// map to the `user` and `model` roles in order.
fn build_request<'a>(turns: &'a [ConversationTurn], temperature: Option<f32>) -> GenerateRequest<'a> {
    let system: Vec<Part<'a>> = turns
        .iter()
        .filter(|t| t.role == Role::System)
        .map(|t| Part { text: &t.content })
        .collect();

    let contents = turns
        .iter()
        .filter_map(|t| {
            let role = match t.role {
                Role::System => return None,
                Role::Caller => "user",
                Role::Assistant => "model",
            };
            Some(Content {
                role: Some(role),
                parts: vec![Part { text: &t.content }],
            })
        })
        .collect();

    GenerateRequest {
        system_instruction: (!system.is_empty()).then_some(Content {
            role: None,
            parts: system,
        }),
        contents,
        generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

#[async_trait]
impl DialogueEngine for GeminiDialogue {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError> {
        let request = build_request(turns, self.config.temperature);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Status {
                service: "gemini",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::Dialogue("gemini returned no text".to_string()));
        }
        Ok(text.to_string())
    }
}
