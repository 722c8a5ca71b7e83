//! Core domain models for the step engine
//!
//! This module defines the processing context, steps and pipelines that the
//! execution layer runs.

pub mod config;
pub mod pipeline;
pub mod step;
pub mod condition;
pub mod context;
pub mod state;

pub use condition::Condition;
pub use config::PipelineConfig;
pub use pipeline::*;
pub use step::*;
pub use context::*;
pub use state::*;
