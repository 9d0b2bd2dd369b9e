//! Mock engines and server wiring for HTTP and WebSocket tests.

#![allow(dead_code)]

use async_trait::async_trait;
use callbridge_pipeline::{CallPipeline, Engines, PipelineConfig, StageTimeouts};
use callbridge_server::{app, config::ServerConfig, AppState};
use callbridge_types::{CallSeed, ConversationTurn, Role};
use callbridge_voice::{
    AudioStream, DialogueEngine, RecognitionConnection, RecognitionEvent, RecognitionOptions,
    RecognitionStream, Recognizer, RetryPolicy, Synthesizer, VoiceError, VoiceOptions,
};
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const GREETING: &str = "Thanks for calling Lexi's Kitchen!";

pub fn seed() -> CallSeed {
    CallSeed::new("You are Lexi, the restaurant's phone assistant.", GREETING)
}

/// Reports every audio payload, read as UTF-8, as one final transcript.
pub struct EchoRecognizer;

#[async_trait]
impl Recognizer for EchoRecognizer {
    async fn open(&self, _options: &RecognitionOptions) -> Result<RecognitionStream, VoiceError> {
        let (tx, events) = mpsc::channel(64);
        Ok(RecognitionStream {
            connection: Box::new(EchoConnection { tx: Some(tx) }),
            events,
        })
    }
}

struct EchoConnection {
    tx: Option<mpsc::Sender<RecognitionEvent>>,
}

#[async_trait]
impl RecognitionConnection for EchoConnection {
    async fn send(&mut self, audio: &[u8]) -> Result<(), VoiceError> {
        if let Some(tx) = &self.tx {
            let text = String::from_utf8_lossy(audio).into_owned();
            let _ = tx
                .send(RecognitionEvent::Transcript { text, is_final: true })
                .await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.tx = None;
        Ok(())
    }
}

/// Replies `"echo: <caller text>"`; caller text containing `fail` errors.
#[derive(Default)]
pub struct EchoDialogue {
    pub calls: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl EchoDialogue {
    pub fn calls(&self) -> Vec<Vec<ConversationTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueEngine for EchoDialogue {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        let caller = turns
            .last()
            .filter(|t| t.role == Role::Caller)
            .map(|t| t.content.clone())
            .unwrap_or_default();
        if caller.contains("fail") {
            return Err(VoiceError::Dialogue("model overloaded".to_string()));
        }
        Ok(format!("echo: {}", caller))
    }
}

/// Streams the text back as a single audio chunk.
pub struct TextSynthesizer;

#[async_trait]
impl Synthesizer for TextSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceOptions) -> Result<AudioStream, VoiceError> {
        Ok(futures_util::stream::iter(vec![Ok(text.as_bytes().to_vec())]).boxed())
    }
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        timeouts: StageTimeouts {
            recognizer_open_ms: 1_000,
            recognizer_send_ms: 1_000,
            recognition_drain_ms: 1_000,
            dialogue_ms: 1_000,
            synthesis_open_ms: 1_000,
            synthesis_chunk_ms: 1_000,
        },
        retry: RetryPolicy::none(),
        ..PipelineConfig::default()
    }
}

pub fn state_with(dialogue: Arc<EchoDialogue>, server: ServerConfig) -> AppState {
    let engines = Engines {
        recognizer: Arc::new(EchoRecognizer),
        dialogue,
        synthesizer: Arc::new(TextSynthesizer),
    };
    AppState::new(CallPipeline::new(engines, test_config(), seed()), &server)
}

pub fn test_state() -> (AppState, Arc<EchoDialogue>) {
    let dialogue = Arc::new(EchoDialogue::default());
    let server = ServerConfig {
        environment: "test".to_string(),
        ..ServerConfig::default()
    };
    (state_with(Arc::clone(&dialogue), server), dialogue)
}

/// Serves the full router on an ephemeral port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}
