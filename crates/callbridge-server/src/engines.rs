//! Builds the shared engine set from configuration.

use crate::config::{DialogueProvider, EnginesConfig};
use callbridge_pipeline::Engines;
use callbridge_voice::{
    DeepgramRecognizer, DialogueEngine, ElevenLabsSynthesizer, GeminiDialogue, Offloaded,
    OpenAiChat, VoiceError, WorkerPool,
};
use std::sync::Arc;

/// Constructs every engine once at start-up.
///
/// # Errors
///
/// Returns `VoiceError::Config` when a selected engine is missing its key.
pub fn build_engines(config: &EnginesConfig) -> Result<Engines, VoiceError> {
    let recognizer = DeepgramRecognizer::new(config.deepgram.clone())?;
    let synthesizer = ElevenLabsSynthesizer::new(config.elevenlabs.clone())?;

    let dialogue: Arc<dyn DialogueEngine> = match config.dialogue_provider {
        DialogueProvider::Gemini => Arc::new(GeminiDialogue::new(config.gemini.clone())?),
        DialogueProvider::OpenAi => {
            let pool = WorkerPool::new(config.worker_pool_size);
            tracing::info!(workers = pool.size(), "blocking dialogue client offloaded");
            Arc::new(Offloaded::new(OpenAiChat::new(config.openai.clone())?, pool))
        }
    };

    tracing::info!(
        provider = ?config.dialogue_provider,
        "engines ready"
    );

    Ok(Engines {
        recognizer: Arc::new(recognizer),
        dialogue,
        synthesizer: Arc::new(synthesizer),
    })
}
