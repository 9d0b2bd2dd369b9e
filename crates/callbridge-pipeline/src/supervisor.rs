//! Per-call orchestration of the four stages.

use crate::config::PipelineConfig;
use crate::handoff;
use crate::stages::{
    run_intake, Dialogue, DialogueReport, IntakeReport, Synthesis, SynthesisReport, Transcription,
    TranscriptionReport,
};
use crate::transport::{TransportSink, TransportSource};
use callbridge_types::{CallSeed, StreamSessionId};
use callbridge_voice::{DialogueEngine, Recognizer, Synthesizer};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

/// The engines one call talks to. Cheap to clone; shared by all calls.
#[derive(Clone)]
pub struct Engines {
    pub recognizer: Arc<dyn Recognizer>,
    pub dialogue: Arc<dyn DialogueEngine>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// What happened during one call. A stage that never ran, or whose task
/// panicked, is `None`.
#[derive(Debug, Clone)]
pub struct CallReport {
    pub call_id: Uuid,
    pub stream_sid: Option<StreamSessionId>,
    pub intake: Option<IntakeReport>,
    pub transcription: Option<TranscriptionReport>,
    pub dialogue: Option<DialogueReport>,
    pub synthesis: Option<SynthesisReport>,
}

impl CallReport {
    /// Whether the call reached `start` and ran the downstream stages.
    pub fn started(&self) -> bool {
        self.stream_sid.is_some()
    }
}

/// Runs the call pipeline for one transport connection at a time.
///
/// Every `run` builds its own queues and its own conversation, so
/// concurrent calls share nothing but the engines.
#[derive(Clone)]
pub struct CallPipeline {
    engines: Engines,
    config: PipelineConfig,
    seed: CallSeed,
}

impl CallPipeline {
    pub fn new(engines: Engines, config: PipelineConfig, seed: CallSeed) -> Self {
        Self {
            engines,
            config,
            seed,
        }
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn seed(&self) -> &CallSeed {
        &self.seed
    }

    /// Runs one call to completion.
    ///
    /// Intake starts first. The other stages start only once the call's
    /// stream id is known; if the transport ends before that, nothing else
    /// runs. Returns after every started stage has finished.
    pub async fn run<S, K>(&self, source: S, mut sink: K) -> CallReport
    where
        S: TransportSource + 'static,
        K: TransportSink + 'static,
    {
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("call", %call_id, stream_sid = tracing::field::Empty);

        async move {
            let queues = self.config.queues;
            let timeouts = self.config.timeouts;
            let (audio_tx, audio_rx) = handoff::channel(queues.audio);
            let (started_tx, started_rx) = oneshot::channel();

            let intake = tokio::spawn(run_intake(source, audio_tx, started_tx).in_current_span());

            let stream_sid = match started_rx.await {
                Ok(stream_sid) => stream_sid,
                Err(_) => {
                    drop(audio_rx);
                    let intake = join_stage("intake", intake).await;
                    if let Err(e) = sink.close().await {
                        tracing::debug!("closing transport failed: {}", e);
                    }
                    tracing::info!("call ended before its stream started");
                    return CallReport {
                        call_id,
                        stream_sid: None,
                        intake,
                        transcription: None,
                        dialogue: None,
                        synthesis: None,
                    };
                }
            };
            tracing::Span::current().record("stream_sid", tracing::field::display(&stream_sid));
            tracing::info!("call pipeline started");

            let (text_tx, text_rx) = handoff::channel(queues.text);
            let (speech_tx, speech_rx) = handoff::channel(queues.speech);

            let transcription = Transcription {
                recognizer: Arc::clone(&self.engines.recognizer),
                options: self.config.recognition.clone(),
                timeouts,
                retry: self.config.retry,
            };
            let dialogue = Dialogue {
                engine: Arc::clone(&self.engines.dialogue),
                seed: self.seed.clone(),
                timeout: timeouts.dialogue(),
                retry: self.config.retry,
            };
            let synthesis = Synthesis {
                synthesizer: Arc::clone(&self.engines.synthesizer),
                voice: self.config.voice.clone(),
                timeouts,
                retry: self.config.retry,
                stream_sid: stream_sid.clone(),
            };

            let transcription =
                tokio::spawn(transcription.run(audio_rx, text_tx).in_current_span());
            let dialogue = tokio::spawn(dialogue.run(text_rx, speech_tx).in_current_span());
            let synthesis = tokio::spawn(synthesis.run(speech_rx, sink).in_current_span());

            let (intake, transcription, dialogue, synthesis) = tokio::join!(
                join_stage("intake", intake),
                join_stage("transcription", transcription),
                join_stage("dialogue", dialogue),
                join_stage("synthesis", synthesis),
            );

            tracing::info!(
                replies = dialogue.as_ref().map(|d| d.replies).unwrap_or(0),
                frames = synthesis.as_ref().map(|s| s.frames).unwrap_or(0),
                "call pipeline finished"
            );

            CallReport {
                call_id,
                stream_sid: Some(stream_sid),
                intake,
                transcription,
                dialogue,
                synthesis,
            }
        }
        .instrument(span)
        .await
    }
}

async fn join_stage<T>(stage: &'static str, handle: JoinHandle<T>) -> Option<T> {
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(stage, "stage task failed: {}", e);
            None
        }
    }
}
