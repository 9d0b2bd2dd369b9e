//! OpenAI-compatible chat completions on a blocking HTTP client.
//!
//! This engine is blocking by construction and must run through
//! [`Offloaded`](crate::dialogue::Offloaded). Each worker thread keeps its
//! own client so that clients are created and dropped off the async runtime.

use crate::config::OpenAiConfig;
use crate::dialogue::BlockingDialogueEngine;
use crate::error::VoiceError;
use callbridge_types::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::time::Duration;

/// Upper bound on one completion request, independent of stage deadlines.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

thread_local! {
    static CLIENT: OnceCell<reqwest::blocking::Client> = const { OnceCell::new() };
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Caller => "user",
        Role::Assistant => "assistant",
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    config: OpenAiConfig,
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig) -> Result<Self, VoiceError> {
        if config.api_key.is_empty() {
            return Err(VoiceError::Config("openai api_key is not set".to_string()));
        }
        Ok(Self { config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl BlockingDialogueEngine for OpenAiChat {
    fn generate_blocking(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: turns
                .iter()
                .map(|t| ChatMessage {
                    role: chat_role(t.role),
                    content: &t.content,
                })
                .collect(),
        };

        let response = CLIENT.with(|cell| {
            let client = cell.get_or_init(reqwest::blocking::Client::new);
            client
                .post(self.endpoint())
                .bearer_auth(&self.config.api_key)
                .timeout(REQUEST_TIMEOUT)
                .json(&request)
                .send()
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VoiceError::Status {
                service: "openai",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json()?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::Dialogue("openai returned no text".to_string()));
        }
        Ok(text.to_string())
    }
}
