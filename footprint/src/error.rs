use thiserror::Error;

#[derive(Debug, Error)]
pub enum FootprintError {
    #[error("density raster is entirely below threshold: {0}")]
    EmptyFootprint(String),
    #[error("footprint polygon area below minimum after simplification: {0}")]
    FootprintDegenerate(String),
    #[error("raster I/O failure: {0}")]
    Raster(#[from] raster::RasterError),
    #[error("point-cloud failure: {0}")]
    PointCloud(#[from] pointcloud::PointCloudError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GeoJSON encoding failure: {0}")]
    GeoJson(String),
}

impl From<FootprintError> for geo_primitives::PipelineError {
    fn from(e: FootprintError) -> Self {
        use geo_primitives::PipelineError as PE;
        match e {
            FootprintError::EmptyFootprint(_) => PE::EmptyFootprint,
            FootprintError::FootprintDegenerate(_) => PE::FootprintDegenerate,
            FootprintError::Io(e) => PE::IoTransient(e.to_string()),
            other => PE::ExternalFailure(other.to_string()),
        }
    }
}
