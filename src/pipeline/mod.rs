//! Intake pipeline: per-file state machine run on a background worker

pub mod cancel;
pub mod events;
pub mod orchestrator;

pub use cancel::CancelToken;
pub use events::{BatchSummary, FileId, PipelineEvent};
pub use orchestrator::{run, BatchHandle, IntakePipeline};
