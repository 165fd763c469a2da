pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod rag_api;
pub mod render;

pub use config::{ClientConfig, StageTimeouts};
pub use error::{ConfigError, ParameterError, StageError};
pub use models::*;
pub use orchestrator::{QueryOrchestrator, RunSummary, StageRecord};
pub use pipeline::{PipelinePlan, PipelineState, Severity, Stage};
pub use rag_api::RagApiClient;
pub use render::{ReportLine, Reporter, Transcript};
