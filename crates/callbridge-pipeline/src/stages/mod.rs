//! The four per-call stages.
//!
//! Each stage owns its input receiver and output sender, runs until its
//! input ends, and always finishes its output queue before returning.

pub mod dialogue;
pub mod intake;
pub mod synthesis;
pub mod transcription;

pub use dialogue::{Dialogue, DialogueReport};
pub use intake::{run_intake, IntakeEnd, IntakeReport};
pub use synthesis::{Synthesis, SynthesisReport};
pub use transcription::{Transcription, TranscriptionReport};
