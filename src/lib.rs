//! medallion - layered ingestion of messy tabular files with a retrying step engine

pub mod cli;
pub mod core;
pub mod error;
pub mod execution;
pub mod ingest;
pub mod steps;

// Re-export commonly used types
pub use self::core::{Pipeline, PipelineBuilder, PipelineConfig, ProcessingContext, RunSummary, Step, StepResult, StepStatus, StepTask, TaskType};
pub use error::{IngestError, Result};
pub use execution::{ExecutionError, ExecutionInput, PipelineExecutor, PipelineRun};
pub use ingest::{BronzeProcessor, CircuitBreaker, ColumnMapper, ColumnSpec, ColumnType, MetadataBuilder, SafeTypeCaster, SchemaConfig, SilverProcessor, SourceSpec};
