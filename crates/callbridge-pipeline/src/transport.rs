//! The live call connection, split into its read and write halves.

use async_trait::async_trait;
use callbridge_types::{InboundEvent, OutboundAudioFrame};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// One message could not be parsed. The connection is still usable.
    #[error("Malformed transport message: {0}")]
    Malformed(String),

    #[error("Transport closed")]
    Closed,

    #[error("Transport I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the connection can still be read after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Inbound half. Only the intake stage reads from it.
#[async_trait]
pub trait TransportSource: Send {
    /// Next inbound event, or `None` once the connection is closed.
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>>;
}

/// Outbound half. Only the synthesis stage writes to it.
#[async_trait]
pub trait TransportSink: Send {
    async fn send_frame(&mut self, frame: &OutboundAudioFrame) -> Result<(), TransportError>;

    /// Closes the outbound half once the call pipeline is done with it.
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
