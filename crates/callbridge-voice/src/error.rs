use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Dialogue error: {0}")]
    Dialogue(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The request itself is unusable; sending it again cannot help.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VoiceError {
    /// Whether a retry of the same call has a chance of succeeding.
    ///
    /// Configuration problems and client errors (4xx other than 429) are
    /// permanent; everything transport- or engine-side is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) | Self::WorkerPool(_) | Self::InvalidInput(_) => false,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Http(_)
            | Self::Recognition(_)
            | Self::Dialogue(_)
            | Self::Synthesis(_)
            | Self::Timeout { .. } => true,
        }
    }
}
