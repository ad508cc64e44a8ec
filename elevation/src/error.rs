use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElevationError {
    #[error("point-cloud failure: {0}")]
    PointCloud(#[from] pointcloud::PointCloudError),
    #[error("raster failure: {0}")]
    Raster(#[from] raster::RasterError),
    #[error("DTM and DSM grids are not congruent; align them before computing CHM")]
    GridMismatch,
}

impl From<ElevationError> for geo_primitives::PipelineError {
    fn from(e: ElevationError) -> Self {
        use geo_primitives::PipelineError as PE;
        match e {
            ElevationError::GridMismatch => PE::InvariantViolation("DTM/DSM grid mismatch".into()),
            other => PE::ExternalFailure(other.to_string()),
        }
    }
}
