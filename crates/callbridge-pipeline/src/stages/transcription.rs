use crate::config::StageTimeouts;
use crate::handoff::{Handoff, HandoffReceiver, HandoffSender};
use callbridge_types::{AudioPayload, Transcript};
use callbridge_voice::{
    deadline, RecognitionEvent, RecognitionOptions, RecognitionStream, Recognizer, RetryPolicy,
};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptionReport {
    /// Payloads taken from the audio queue.
    pub payloads: u64,
    /// Payloads handed to the recognizer.
    pub sent: u64,
    /// Final transcripts pushed onto the text queue.
    pub transcripts: u64,
    /// Set when the recognizer failed and the rest of the call went unheard.
    pub engine_failed: bool,
}

pub struct Transcription {
    pub recognizer: Arc<dyn Recognizer>,
    pub options: RecognitionOptions,
    pub timeouts: StageTimeouts,
    pub retry: RetryPolicy,
}

enum Outcome {
    AudioEnded,
    EngineFailed,
}

impl Transcription {
    /// Streams caller audio to the recognizer and pushes final transcripts.
    ///
    /// The text queue always gets its end marker. If the recognizer fails,
    /// the stage keeps discarding audio until the audio queue ends so that
    /// intake never waits on it.
    pub async fn run(
        self,
        mut audio: HandoffReceiver<AudioPayload>,
        text: HandoffSender<Transcript>,
    ) -> TranscriptionReport {
        let mut report = TranscriptionReport::default();
        let mut out = TextOut {
            text: &text,
            consumer_gone: false,
        };

        let opened = self
            .retry
            .run("recognizer open", || {
                deadline(
                    "recognizer open",
                    self.timeouts.recognizer_open(),
                    self.recognizer.open(&self.options),
                )
            })
            .await;

        let RecognitionStream {
            mut connection,
            mut events,
        } = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(stage = "transcription", "recognizer unavailable: {}", e);
                report.engine_failed = true;
                drop(out);
                text.finish().await;
                report.payloads += audio.drain().await;
                return report;
            }
        };

        let outcome = loop {
            tokio::select! {
                next = audio.pop() => match next {
                    Handoff::Item(payload) => {
                        report.payloads += 1;
                        // Engines may read an empty frame as end of audio.
                        if payload.is_empty() {
                            continue;
                        }
                        let sent = deadline(
                            "recognizer send",
                            self.timeouts.recognizer_send(),
                            connection.send(payload.as_bytes()),
                        )
                        .await;
                        if let Err(e) = sent {
                            tracing::error!(stage = "transcription", "sending audio failed: {}", e);
                            break Outcome::EngineFailed;
                        }
                        report.sent += 1;
                    }
                    Handoff::EndOfStream => break Outcome::AudioEnded,
                },
                event = events.recv() => match event {
                    Some(RecognitionEvent::Transcript { text: spoken, is_final }) => {
                        if is_final {
                            out.forward(&spoken, &mut report).await;
                        }
                    }
                    Some(RecognitionEvent::Error(message)) => {
                        tracing::error!(stage = "transcription", "recognizer error: {}", message);
                        break Outcome::EngineFailed;
                    }
                    None => {
                        tracing::error!(stage = "transcription", "recognizer closed the connection");
                        break Outcome::EngineFailed;
                    }
                },
            }
        };

        let closed = deadline(
            "recognizer close",
            self.timeouts.recognizer_send(),
            connection.close(),
        )
        .await;
        if let Err(e) = closed {
            tracing::warn!(stage = "transcription", "closing recognizer failed: {}", e);
        }

        match outcome {
            Outcome::AudioEnded => {
                // Finals for the last utterance can arrive after close.
                let drained = tokio::time::timeout(self.timeouts.recognition_drain(), async {
                    while let Some(event) = events.recv().await {
                        match event {
                            RecognitionEvent::Transcript { text: spoken, is_final: true } => {
                                out.forward(&spoken, &mut report).await;
                            }
                            RecognitionEvent::Transcript { .. } => {}
                            RecognitionEvent::Error(message) => {
                                tracing::warn!(
                                    stage = "transcription",
                                    "recognizer error while draining: {}",
                                    message
                                );
                                break;
                            }
                        }
                    }
                })
                .await;
                if drained.is_err() {
                    tracing::warn!(stage = "transcription", "gave up waiting for late transcripts");
                }
                drop(out);
                text.finish().await;
            }
            Outcome::EngineFailed => {
                report.engine_failed = true;
                drop(out);
                text.finish().await;
                report.payloads += audio.drain().await;
            }
        }

        tracing::info!(
            stage = "transcription",
            payloads = report.payloads,
            sent = report.sent,
            transcripts = report.transcripts,
            engine_failed = report.engine_failed,
            "transcription finished"
        );
        report
    }
}

struct TextOut<'a> {
    text: &'a HandoffSender<Transcript>,
    consumer_gone: bool,
}

impl TextOut<'_> {
    async fn forward(&mut self, raw: &str, report: &mut TranscriptionReport) {
        let Some(transcript) = Transcript::finalized(raw) else {
            return;
        };
        if self.consumer_gone {
            return;
        }
        tracing::debug!(stage = "transcription", text = %transcript, "final transcript");
        if self.text.push(transcript).await.is_err() {
            tracing::warn!(stage = "transcription", "dialogue stage gone, dropping transcripts");
            self.consumer_gone = true;
            return;
        }
        report.transcripts += 1;
    }
}
