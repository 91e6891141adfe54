// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod config;
pub mod ingest;
pub mod payload;
pub mod pipeline;
pub mod reasoning;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Aggregator;
pub use crate::config::PipelineConfig;
pub use crate::payload::{assemble, AnalysisRequest, RUBRIC};
pub use crate::pipeline::{run_pipeline, Pipeline, PipelineRun};
pub use crate::reasoning::{Narrative, ReasoningError, ReasoningGateway};
pub use crate::snapshot::{Snapshot, SourceOutcome};
