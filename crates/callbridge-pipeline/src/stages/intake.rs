use crate::handoff::HandoffSender;
use crate::transport::{TransportError, TransportSource};
use callbridge_types::{AudioPayload, InboundEvent, StreamSessionId};
use tokio::sync::oneshot;

/// Why intake stopped reading the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEnd {
    /// The provider sent `stop`.
    Stopped,
    /// The connection closed without a `stop`.
    Disconnected,
    /// Reading failed.
    TransportError(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReport {
    pub stream_sid: Option<StreamSessionId>,
    /// Payloads pushed onto the audio queue.
    pub forwarded: u64,
    /// Media received before `start` or with an undecodable payload.
    pub dropped: u64,
    /// Messages skipped because they could not be parsed.
    pub malformed: u64,
    pub end: IntakeEnd,
}

/// Reads the transport until the call ends, forwarding decoded audio.
///
/// `started` receives the stream id as soon as the `start` event arrives;
/// if the call ends before that, it is dropped unsent. The audio queue gets
/// its end marker on every exit path.
pub async fn run_intake<S>(
    mut source: S,
    audio: HandoffSender<AudioPayload>,
    started: oneshot::Sender<StreamSessionId>,
) -> IntakeReport
where
    S: TransportSource,
{
    let mut started = Some(started);
    let mut report = IntakeReport {
        stream_sid: None,
        forwarded: 0,
        dropped: 0,
        malformed: 0,
        end: IntakeEnd::Disconnected,
    };
    let mut consumer_gone = false;

    loop {
        let event = match source.next_event().await {
            None => break,
            Some(Ok(event)) => event,
            Some(Err(e)) if e.is_recoverable() => {
                report.malformed += 1;
                tracing::warn!(stage = "intake", "skipping transport message: {}", e);
                continue;
            }
            Some(Err(e)) => {
                tracing::warn!(stage = "intake", "transport read failed: {}", e);
                report.end = IntakeEnd::TransportError(e);
                break;
            }
        };

        match event {
            InboundEvent::Connected => {
                tracing::debug!(stage = "intake", "transport connected");
            }
            InboundEvent::Start { start } => {
                if let Some(existing) = &report.stream_sid {
                    tracing::warn!(
                        stage = "intake",
                        existing = %existing,
                        ignored = %start.stream_sid,
                        "ignoring duplicate start event"
                    );
                    continue;
                }
                tracing::info!(
                    stage = "intake",
                    stream_sid = %start.stream_sid,
                    call_sid = start.call_sid.as_deref().unwrap_or(""),
                    "call stream started"
                );
                if let Some(tx) = started.take() {
                    let _ = tx.send(start.stream_sid.clone());
                }
                report.stream_sid = Some(start.stream_sid);
            }
            InboundEvent::Media { media } => {
                if report.stream_sid.is_none() {
                    report.dropped += 1;
                    tracing::debug!(stage = "intake", "dropping media received before start");
                    continue;
                }
                let bytes = match media.decode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        report.dropped += 1;
                        tracing::warn!(stage = "intake", "dropping undecodable media payload: {}", e);
                        continue;
                    }
                };
                if consumer_gone {
                    report.dropped += 1;
                    continue;
                }
                if audio.push(AudioPayload::new(bytes)).await.is_err() {
                    // Keep reading so the provider sees a live socket until stop.
                    tracing::warn!(stage = "intake", "audio consumer gone, discarding further media");
                    consumer_gone = true;
                    report.dropped += 1;
                    continue;
                }
                report.forwarded += 1;
            }
            InboundEvent::Stop => {
                tracing::info!(stage = "intake", "call stream stopped");
                report.end = IntakeEnd::Stopped;
                break;
            }
            InboundEvent::Other => {}
        }
    }

    audio.finish().await;
    tracing::info!(
        stage = "intake",
        forwarded = report.forwarded,
        dropped = report.dropped,
        malformed = report.malformed,
        end = ?report.end,
        "intake finished"
    );
    report
}
