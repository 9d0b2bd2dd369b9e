//! Per-call streaming pipeline.
//!
//! ```text
//! transport ─▶ intake ─[audio]─▶ transcription ─[text]─▶ dialogue ─[speech]─▶ synthesis ─▶ transport
//! ```
//!
//! Each call runs four tasks joined by three bounded [`handoff`] queues.
//! Shutdown travels forward only: the transport's `stop` (or its loss) ends
//! intake, and each stage finishes its output queue when its input ends.

pub mod config;
pub mod handoff;
pub mod stages;
pub mod supervisor;
pub mod transport;

pub use config::{PipelineConfig, QueueCapacities, StageTimeouts};
pub use handoff::{Handoff, HandoffClosed, HandoffReceiver, HandoffSender};
pub use stages::{
    DialogueReport, IntakeEnd, IntakeReport, SynthesisReport, TranscriptionReport,
};
pub use supervisor::{CallPipeline, CallReport, Engines};
pub use transport::{TransportError, TransportSink, TransportSource};
