//! Layered ingestion: source reading, Bronze capture and Silver cleaning

pub mod breaker;
pub mod bronze;
pub mod builder;
pub mod caster;
pub mod config;
pub mod frame;
pub mod mapper;
pub mod reader;
pub mod silver;

pub use breaker::{BreakerStatus, CheckScope, CircuitBreaker, CircuitBreakerResult, NullSummary};
pub use bronze::{BronzeProcessor, Provenance};
pub use builder::{ExtractOptions, MetadataBuilder, Preview};
pub use caster::{CastSummary, SafeTypeCaster};
pub use config::{ColumnSpec, ColumnType, FileType, SchemaConfig, SheetRef, SourceSpec};
pub use mapper::ColumnMapper;
pub use reader::SourceReader;
pub use silver::{SilverProcessor, ValidationReport};
