use crate::config::StageTimeouts;
use crate::handoff::{Handoff, HandoffReceiver};
use crate::transport::TransportSink;
use callbridge_types::{OutboundAudioFrame, ReplyText, StreamSessionId};
use callbridge_voice::{deadline, RetryPolicy, Synthesizer, VoiceOptions};
use futures_util::StreamExt;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Speech items taken from the queue.
    pub utterances: u64,
    /// Audio frames written to the transport.
    pub frames: u64,
    /// Utterances cut short or skipped by an engine failure.
    pub failed_utterances: u64,
    /// Set once a transport write failed; nothing was written after that.
    pub transport_lost: bool,
}

pub struct Synthesis {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub voice: VoiceOptions,
    pub timeouts: StageTimeouts,
    pub retry: RetryPolicy,
    pub stream_sid: StreamSessionId,
}

impl Synthesis {
    /// Speaks each queued reply, writing audio to the transport chunk by
    /// chunk as the engine produces it.
    pub async fn run<K>(self, mut speech: HandoffReceiver<ReplyText>, mut sink: K) -> SynthesisReport
    where
        K: TransportSink,
    {
        let mut report = SynthesisReport::default();

        while let Handoff::Item(reply) = speech.pop().await {
            report.utterances += 1;
            if report.transport_lost {
                continue;
            }
            self.speak(&reply, &mut sink, &mut report).await;
        }

        if !report.transport_lost {
            if let Err(e) = sink.close().await {
                tracing::debug!(stage = "synthesis", "closing transport failed: {}", e);
            }
        }

        tracing::info!(
            stage = "synthesis",
            utterances = report.utterances,
            frames = report.frames,
            failed_utterances = report.failed_utterances,
            transport_lost = report.transport_lost,
            "synthesis finished"
        );
        report
    }

    async fn speak<K>(&self, reply: &ReplyText, sink: &mut K, report: &mut SynthesisReport)
    where
        K: TransportSink,
    {
        let opened = self
            .retry
            .run("synthesis open", || {
                deadline(
                    "synthesis open",
                    self.timeouts.synthesis_open(),
                    self.synthesizer.synthesize(reply.as_str(), &self.voice),
                )
            })
            .await;

        let mut audio = match opened {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(stage = "synthesis", text = %reply, "skipping utterance: {}", e);
                report.failed_utterances += 1;
                return;
            }
        };

        let mut frames = 0u64;
        loop {
            let chunk = match tokio::time::timeout(self.timeouts.synthesis_chunk(), audio.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::warn!(stage = "synthesis", frames, "utterance cut short: {}", e);
                    report.failed_utterances += 1;
                    break;
                }
                Err(_) => {
                    tracing::warn!(stage = "synthesis", frames, "utterance stalled, cutting it short");
                    report.failed_utterances += 1;
                    break;
                }
            };
            if chunk.is_empty() {
                continue;
            }

            let frame = OutboundAudioFrame::new(self.stream_sid.clone(), chunk);
            if let Err(e) = sink.send_frame(&frame).await {
                tracing::warn!(stage = "synthesis", "transport write failed: {}", e);
                report.transport_lost = true;
                break;
            }
            frames += 1;
            report.frames += 1;
        }

        tracing::debug!(stage = "synthesis", frames, "utterance finished");
    }
}
