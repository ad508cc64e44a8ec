use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetacacheError {
    #[error("point cloud: {0}")]
    PointCloud(#[from] pointcloud::PointCloudError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry corrupt: {0}")]
    Corrupt(String),
}

impl From<MetacacheError> for geo_primitives::PipelineError {
    fn from(e: MetacacheError) -> Self {
        match e {
            MetacacheError::PointCloud(e) => e.into(),
            other => geo_primitives::PipelineError::ExternalFailure(other.to_string()),
        }
    }
}
