use crate::handoff::{Handoff, HandoffReceiver, HandoffSender};
use callbridge_types::{CallSeed, Conversation, ReplyText, Transcript};
use callbridge_voice::{deadline, DialogueEngine, RetryPolicy, VoiceError};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueReport {
    /// Final turn sequence of the call, seed pair included.
    pub conversation: Conversation,
    pub transcripts: u64,
    pub replies: u64,
    /// Turns skipped because the engine failed or replied with nothing.
    pub failed_turns: u64,
}

pub struct Dialogue {
    pub engine: Arc<dyn DialogueEngine>,
    pub seed: CallSeed,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Dialogue {
    /// Speaks the greeting, then answers each transcript in arrival order.
    ///
    /// One engine call is in flight at a time. A failed turn is logged and
    /// dropped from the conversation; the stage carries on with the next
    /// transcript.
    pub async fn run(
        self,
        mut text: HandoffReceiver<Transcript>,
        speech: HandoffSender<ReplyText>,
    ) -> DialogueReport {
        let mut conversation = Conversation::seeded(&self.seed);
        let (mut transcripts, mut replies, mut failed_turns) = (0, 0, 0);
        let mut speech_gone = false;

        if !conversation.greeting().trim().is_empty()
            && speech.push(ReplyText::new(conversation.greeting())).await.is_err()
        {
            tracing::warn!(stage = "dialogue", "synthesis stage gone before the greeting");
            speech_gone = true;
        }

        while let Handoff::Item(transcript) = text.pop().await {
            transcripts += 1;
            let started = Instant::now();

            if let Err(e) = conversation.push_caller(transcript.as_str()) {
                tracing::error!(stage = "dialogue", "conversation out of order: {}", e);
                failed_turns += 1;
                continue;
            }

            let reply = match self.reply(&conversation).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(
                        stage = "dialogue",
                        caller = %transcript,
                        "skipping turn, no reply: {}",
                        e
                    );
                    let _ = conversation.retract_caller();
                    failed_turns += 1;
                    continue;
                }
            };

            if let Err(e) = conversation.push_assistant(reply.clone()) {
                tracing::error!(stage = "dialogue", "conversation out of order: {}", e);
                let _ = conversation.retract_caller();
                failed_turns += 1;
                continue;
            }
            replies += 1;

            tracing::info!(
                stage = "dialogue",
                turn = conversation.exchanged().len() / 2,
                caller = %transcript,
                assistant = %reply,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "conversation interaction"
            );

            if !speech_gone && speech.push(ReplyText::new(reply)).await.is_err() {
                tracing::warn!(stage = "dialogue", "synthesis stage gone, replies will not be spoken");
                speech_gone = true;
            }
        }

        speech.finish().await;
        tracing::info!(
            stage = "dialogue",
            transcripts,
            replies,
            failed_turns,
            "dialogue finished"
        );
        DialogueReport {
            conversation,
            transcripts,
            replies,
            failed_turns,
        }
    }

    async fn reply(&self, conversation: &Conversation) -> Result<String, VoiceError> {
        let engine = self.engine.as_ref();
        let turns = conversation.turns();
        let reply = self
            .retry
            .run("dialogue", || deadline("dialogue", self.timeout, engine.generate(turns)))
            .await?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(VoiceError::Dialogue("engine returned an empty reply".to_string()));
        }
        Ok(reply.to_string())
    }
}
