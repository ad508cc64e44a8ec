use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointCloudError {
    #[error("cloud not found: {0}")]
    CloudNotFound(String),
    #[error("CRS missing on input cloud: {0}")]
    CrsMissing(String),
    #[error("unsupported LAS version: {0}")]
    UnsupportedLasVersion(String),
    #[error("unsupported ground classification algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("insufficient points for ground classification: {0}")]
    InsufficientPoints(usize),
    #[error("external point-processing failure: {0}")]
    ExternalFailure(String),
    #[error("empty output: {0}")]
    EmptyOutput(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("LAS error: {0}")]
    Las(String),
}

impl From<las::Error> for PointCloudError {
    fn from(e: las::Error) -> Self {
        PointCloudError::Las(e.to_string())
    }
}

impl From<PointCloudError> for geo_primitives::PipelineError {
    fn from(e: PointCloudError) -> Self {
        use geo_primitives::PipelineError as PE;
        match e {
            PointCloudError::CloudNotFound(m) => PE::CloudNotFound(m),
            PointCloudError::CrsMissing(m) => PE::CrsMissing(m),
            PointCloudError::UnsupportedLasVersion(m) => PE::UnsupportedLasVersion(m),
            PointCloudError::UnsupportedAlgorithm(m) => PE::UnsupportedAlgorithm(m),
            PointCloudError::InsufficientPoints(n) => PE::InsufficientPoints(n),
            PointCloudError::EmptyOutput(m) => PE::EmptyOutput(m),
            PointCloudError::Io(e) => PE::IoTransient(e.to_string()),
            other => PE::ExternalFailure(other.to_string()),
        }
    }
}
