use thiserror::Error;

/// Orchestrator-level failures: I/O and (de)serialization around the
/// manifest/layout bookkeeping. Node-level failures from producer crates
/// are carried as `geo_primitives::PipelineError` directly, not wrapped
/// here.
#[derive(Debug, Error)]
pub enum PipelineBuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest (de)serialization failure: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    External(String),
}

impl From<PipelineBuildError> for geo_primitives::PipelineError {
    fn from(e: PipelineBuildError) -> Self {
        geo_primitives::PipelineError::IoTransient(e.to_string())
    }
}
