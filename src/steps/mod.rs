//! Ready-made step tasks for ingestion pipelines

pub mod check;
pub mod clean;
pub mod export;
pub mod load;

pub use check::SchemaCheckStep;
pub use clean::{CleanStep, CAST_FAILURES_VARIABLE};
pub use export::{save_frame, ExportFormat, ExportStep};
pub use load::{LoadSourceStep, LoadTarget};
