//! Speech and dialogue engines for callbridge.
//!
//! Each external capability sits behind an async trait so that the call
//! pipeline never depends on a particular vendor:
//!
//! - [`Recognizer`]: streaming speech-to-text. Results arrive on an explicit
//!   event channel owned by the caller.
//! - [`DialogueEngine`]: next assistant reply from the conversation so far.
//!   Blocking client libraries plug in through [`BlockingDialogueEngine`]
//!   and run on a bounded [`WorkerPool`].
//! - [`Synthesizer`]: text-to-speech that yields audio chunks as they are
//!   produced.
//!
//! Concrete clients: Deepgram (recognition), Gemini and OpenAI (dialogue),
//! ElevenLabs (synthesis).

pub mod config;
pub mod deepgram;
pub mod dialogue;
pub mod elevenlabs;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod recognition;
pub mod retry;
pub mod synthesis;
pub mod worker;

pub use config::{DeepgramConfig, ElevenLabsConfig, GeminiConfig, OpenAiConfig};
pub use deepgram::DeepgramRecognizer;
pub use dialogue::{BlockingDialogueEngine, DialogueEngine, Offloaded};
pub use elevenlabs::ElevenLabsSynthesizer;
pub use error::VoiceError;
pub use gemini::GeminiDialogue;
pub use openai::OpenAiChat;
pub use recognition::{
    RecognitionConnection, RecognitionEvent, RecognitionOptions, RecognitionStream, Recognizer,
    RECOGNITION_EVENT_CAPACITY,
};
pub use retry::{deadline, RetryPolicy};
pub use synthesis::{AudioStream, Synthesizer, VoiceOptions};
pub use worker::{WorkerPool, DEFAULT_WORKER_POOL_SIZE};
