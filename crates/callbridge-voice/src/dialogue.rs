//! Dialogue engine seam.

use crate::error::VoiceError;
use crate::worker::WorkerPool;
use async_trait::async_trait;
use callbridge_types::ConversationTurn;
use std::sync::Arc;

/// Produces the assistant's next reply from the ordered turn sequence.
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError>;
}

/// A dialogue engine built on a blocking client library.
///
/// Blocking engines are never called from a task directly; wrap them in
/// [`Offloaded`] to get a [`DialogueEngine`].
pub trait BlockingDialogueEngine: Send + Sync + 'static {
    fn generate_blocking(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError>;
}

/// Runs a [`BlockingDialogueEngine`] on a [`WorkerPool`].
pub struct Offloaded<E> {
    engine: Arc<E>,
    pool: WorkerPool,
}

impl<E: BlockingDialogueEngine> Offloaded<E> {
    pub fn new(engine: E, pool: WorkerPool) -> Self {
        Self {
            engine: Arc::new(engine),
            pool,
        }
    }
}

#[async_trait]
impl<E: BlockingDialogueEngine> DialogueEngine for Offloaded<E> {
    async fn generate(&self, turns: &[ConversationTurn]) -> Result<String, VoiceError> {
        let engine = Arc::clone(&self.engine);
        let turns = turns.to_vec();
        self.pool
            .run(move || engine.generate_blocking(&turns))
            .await?
    }
}
