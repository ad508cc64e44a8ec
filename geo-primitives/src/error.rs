/// Error taxonomy shared by every crate in the workspace, organized by
/// kind rather than by type name. Each leaf crate may add its own local
/// variants but
/// converts into this enum at its public boundary so the orchestrator can
/// classify failures uniformly.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    // --- input errors: fatal, surface to caller ---
    #[error("cloud not found: {0}")]
    CloudNotFound(String),
    #[error("CRS missing on input: {0}")]
    CrsMissing(String),
    #[error("unsupported LAS version: {0}")]
    UnsupportedLasVersion(String),

    // --- precondition failures: fatal for node, propagate downstream ---
    #[error("dependency failed: {0}")]
    DependencyFailed(String),
    #[error("empty footprint: density is entirely below threshold")]
    EmptyFootprint,
    #[error("footprint degenerate: polygon area below minimum")]
    FootprintDegenerate,
    #[error("ground classification failed: unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("ground classification failed: insufficient points ({0})")]
    InsufficientPoints(usize),
    #[error("empty output: {0}")]
    EmptyOutput(String),

    // --- transient: retry with backoff, finite attempts ---
    #[error("external library failure: {0}")]
    ExternalFailure(String),
    #[error("transient I/O failure: {0}")]
    IoTransient(String),

    // --- timeouts ---
    #[error("node timed out")]
    NodeTimeout,

    // --- cancellation: not a failure ---
    #[error("cancelled")]
    Cancelled,

    // --- internal invariant violations: fatal process-wide for the build ---
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl PipelineError {
    /// Whether the orchestrator should retry this node (transient errors only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::ExternalFailure(_) | PipelineError::IoTransient(_))
    }

    /// Whether this failure is a clean, non-failing unwind.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Whether this failure should transition dependents to `BLOCKED`.
    pub fn propagates_to_dependents(&self) -> bool {
        !self.is_cancellation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(PipelineError::IoTransient("disk full".into()).is_retryable());
        assert!(!PipelineError::EmptyFootprint.is_retryable());
    }

    #[test]
    fn cancellation_does_not_propagate() {
        assert!(!PipelineError::Cancelled.propagates_to_dependents());
        assert!(PipelineError::NodeTimeout.propagates_to_dependents());
    }
}
