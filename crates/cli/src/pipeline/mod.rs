//! Pipeline orchestration module.

mod orchestrator;
mod stats;
mod trigger;

pub use orchestrator::{Pipeline, PipelineConfig, SourceMode};
pub use stats::PipelineStats;
pub use trigger::CalibrationTrigger;
