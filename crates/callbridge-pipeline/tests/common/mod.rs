//! Mock engines and in-memory transports for pipeline tests.
//!
//! The mock recognizer treats each audio payload as UTF-8 text and reports
//! it back as one final transcript, so tests can "speak" by sending media
//! whose bytes are the words.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use callbridge_pipeline::{
    CallPipeline, Engines, PipelineConfig, StageTimeouts, TransportError, TransportSink,
    TransportSource,
};
use callbridge_types::{CallSeed, ConversationTurn, InboundEvent, OutboundAudioFrame, Role};
use callbridge_voice::{
    AudioStream, DialogueEngine, RecognitionConnection, RecognitionEvent, RecognitionOptions,
    RecognitionStream, Recognizer, RetryPolicy, Synthesizer, VoiceError, VoiceOptions,
};
use futures_util::StreamExt;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const GREETING: &str = "Thanks for calling Lexi's Kitchen!";

pub fn seed() -> CallSeed {
    CallSeed::new("You are Lexi, the restaurant's phone assistant.", GREETING)
}

/// Short deadlines and no retries, so failure tests finish quickly.
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

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub fn start(stream_sid: &str) -> InboundEvent {
    serde_json::from_value(json!({
        "event": "start",
        "start": {"streamSid": stream_sid, "callSid": "CA-test"}
    }))
    .unwrap()
}

pub fn media(audio: &[u8]) -> InboundEvent {
    serde_json::from_value(json!({
        "event": "media",
        "media": {"payload": base64::engine::general_purpose::STANDARD.encode(audio)}
    }))
    .unwrap()
}

pub fn raw_media(payload: &str) -> InboundEvent {
    serde_json::from_value(json!({"event": "media", "media": {"payload": payload}})).unwrap()
}

pub fn stop() -> InboundEvent {
    serde_json::from_value(json!({"event": "stop"})).unwrap()
}

/// Transport source fed through a channel. Ends when the sender is dropped.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<InboundEvent, TransportError>>,
}

#[async_trait]
impl TransportSource for ChannelSource {
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>> {
        self.rx.recv().await
    }
}

pub fn live_source() -> (
    mpsc::UnboundedSender<Result<InboundEvent, TransportError>>,
    ChannelSource,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, ChannelSource { rx })
}

/// A source that yields `events` and then reports the connection closed.
pub fn scripted(events: Vec<InboundEvent>) -> ChannelSource {
    scripted_results(events.into_iter().map(Ok).collect())
}

pub fn scripted_results(events: Vec<Result<InboundEvent, TransportError>>) -> ChannelSource {
    let (tx, source) = live_source();
    for event in events {
        tx.send(event).unwrap();
    }
    source
}

/// Records every frame written. Fails writes after `fail_after` frames.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub frames: Arc<Mutex<Vec<OutboundAudioFrame>>>,
    pub closed: Arc<Mutex<bool>>,
    pub fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn failing_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<OutboundAudioFrame> {
        self.frames.lock().unwrap().clone()
    }

    /// Concatenated audio of every frame, as text.
    pub fn spoken(&self) -> String {
        self.frames()
            .iter()
            .map(|f| String::from_utf8_lossy(&f.audio).into_owned())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl TransportSink for RecordingSink {
    async fn send_frame(&mut self, frame: &OutboundAudioFrame) -> Result<(), TransportError> {
        let mut frames = self.frames.lock().unwrap();
        if self.fail_after.is_some_and(|limit| frames.len() >= limit) {
            return Err(TransportError::Closed);
        }
        frames.push(frame.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recognition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecognizerMode {
    /// One final transcript per payload, delivered immediately.
    #[default]
    Echo,
    /// Transcripts are held back until the connection is closed.
    FinalsOnClose,
    /// Accepts audio, never recognizes anything.
    Silent,
    /// `open` fails.
    FailOpen,
    /// The engine reports an error after the first payload.
    ErrorAfterFirst,
    /// `send` and `close` never return.
    Stalled,
}

#[derive(Default)]
pub struct MockRecognizer {
    pub mode: RecognizerMode,
    pub opens: AtomicUsize,
    /// Every payload passed to `send`, in order, across connections.
    pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
    pub closes: Arc<AtomicUsize>,
}

impl MockRecognizer {
    pub fn new(mode: RecognizerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn open(&self, _options: &RecognitionOptions) -> Result<RecognitionStream, VoiceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.mode == RecognizerMode::FailOpen {
            return Err(VoiceError::Recognition("engine unreachable".to_string()));
        }
        let (tx, events) = mpsc::channel(64);
        Ok(RecognitionStream {
            connection: Box::new(MockConnection {
                mode: self.mode,
                tx: Some(tx),
                held: Vec::new(),
                sent: Arc::clone(&self.sent),
                closes: Arc::clone(&self.closes),
            }),
            events,
        })
    }
}

struct MockConnection {
    mode: RecognizerMode,
    tx: Option<mpsc::Sender<RecognitionEvent>>,
    held: Vec<String>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl RecognitionConnection for MockConnection {
    async fn send(&mut self, audio: &[u8]) -> Result<(), VoiceError> {
        let first = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(audio.to_vec());
            sent.len() == 1
        };
        if self.mode == RecognizerMode::Stalled {
            std::future::pending::<()>().await;
        }
        let text = String::from_utf8_lossy(audio).into_owned();
        let Some(tx) = &self.tx else {
            return Err(VoiceError::Recognition("closed".to_string()));
        };
        match self.mode {
            RecognizerMode::Echo => {
                let _ = tx
                    .send(RecognitionEvent::Transcript { text, is_final: true })
                    .await;
            }
            RecognizerMode::FinalsOnClose => self.held.push(text),
            RecognizerMode::ErrorAfterFirst if first => {
                let _ = tx.send(RecognitionEvent::Error("model crashed".to_string())).await;
            }
            RecognizerMode::ErrorAfterFirst
            | RecognizerMode::Silent
            | RecognizerMode::FailOpen
            | RecognizerMode::Stalled => {}
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.mode == RecognizerMode::Stalled {
            std::future::pending::<()>().await;
        }
        if let Some(tx) = self.tx.take() {
            for text in self.held.drain(..) {
                let _ = tx
                    .send(RecognitionEvent::Transcript { text, is_final: true })
                    .await;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dialogue
// ---------------------------------------------------------------------------

/// Replies `"echo: <caller text>"`.
///
/// Caller text containing `fail` produces an error, `silence` an empty reply,
/// `hang` a call that never returns and `panic` a panic. Fixed answers take
/// precedence.
#[derive(Default)]
pub struct MockDialogue {
    pub answers: Vec<(String, String)>,
    /// Turn sequence seen by each call, in order.
    pub calls: Mutex<Vec<Vec<ConversationTurn>>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub delay: Option<Duration>,
}

impl MockDialogue {
    pub fn answering(question: &str, answer: &str) -> Self {
        Self {
            answers: vec![(question.to_string(), answer.to_string())],
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<ConversationTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogueEngine for MockDialogue {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError> {
        self.calls.lock().unwrap().push(turns.to_vec());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let caller = turns
            .last()
            .filter(|t| t.role == Role::Caller)
            .map(|t| t.content.clone())
            .unwrap_or_default();

        let result = if let Some((_, answer)) = self.answers.iter().find(|(q, _)| *q == caller) {
            Ok(answer.clone())
        } else if caller.contains("fail") {
            Err(VoiceError::Dialogue("model overloaded".to_string()))
        } else if caller.contains("silence") {
            Ok("   ".to_string())
        } else if caller.contains("panic") {
            panic!("dialogue engine panicked on {:?}", caller);
        } else if caller.contains("hang") {
            std::future::pending::<()>().await;
            unreachable!()
        } else {
            Ok(format!("echo: {}", caller))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Streams the reply text back as audio, split into two chunks.
///
/// Text containing `unsayable` fails to open; `stutter` fails after the
/// first chunk; `stall` never produces its second chunk.
#[derive(Default)]
pub struct MockSynthesizer {
    pub requests: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceOptions) -> Result<AudioStream, VoiceError> {
        self.requests.lock().unwrap().push(text.to_string());
        if text.contains("unsayable") {
            return Err(VoiceError::Synthesis("voice unavailable".to_string()));
        }

        let bytes = text.as_bytes().to_vec();
        let middle = bytes.len() / 2;
        let first = bytes[..middle].to_vec();
        let second = bytes[middle..].to_vec();

        if text.contains("stutter") {
            return Ok(futures_util::stream::iter(vec![
                Ok(first),
                Err(VoiceError::Synthesis("stream reset".to_string())),
            ])
            .boxed());
        }
        if text.contains("stall") {
            return Ok(futures_util::stream::iter(vec![Ok(first)])
                .chain(futures_util::stream::pending())
                .boxed());
        }
        Ok(futures_util::stream::iter(vec![Ok(first), Ok(second)]).boxed())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub recognizer: Arc<MockRecognizer>,
    pub dialogue: Arc<MockDialogue>,
    pub synthesizer: Arc<MockSynthesizer>,
    pub pipeline: CallPipeline,
}

impl Harness {
    pub fn new(recognizer: MockRecognizer, dialogue: MockDialogue) -> Self {
        Self::with_config(recognizer, dialogue, test_config())
    }

    pub fn with_config(recognizer: MockRecognizer, dialogue: MockDialogue, config: PipelineConfig) -> Self {
        let recognizer = Arc::new(recognizer);
        let dialogue = Arc::new(dialogue);
        let synthesizer = Arc::new(MockSynthesizer::default());
        let engines = Engines {
            recognizer: recognizer.clone(),
            dialogue: dialogue.clone(),
            synthesizer: synthesizer.clone(),
        };
        Self {
            recognizer,
            dialogue,
            synthesizer,
            pipeline: CallPipeline::new(engines, config, seed()),
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(MockRecognizer::default(), MockDialogue::default())
    }
}
