//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod runner;

pub use executor::{ExecutionError, ExecutionInput, PipelineExecutor, PipelineRun};
pub use runner::backoff_delay;
