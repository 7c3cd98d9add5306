//! Alert triage workflow: engine, stage implementations and prompts

mod config;
mod engine;
mod prompts;
pub mod stages;

pub use config::{StageParams, WorkflowConfig};
pub use engine::{StepRecord, WorkflowEngine, WorkflowRun};
pub use stages::StageSet;
