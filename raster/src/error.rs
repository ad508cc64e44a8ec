use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("CRS missing on raster: {0}")]
    CrsMissing(String),
    #[error("GDAL error: {0}")]
    Gdal(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("grids are not pixel-aligned and no resampler was requested")]
    Misaligned,
    #[error("raster dimensions do not match: {0:?} vs {1:?}")]
    SizeMismatch((usize, usize), (usize, usize)),
}

impl From<gdal::errors::GdalError> for RasterError {
    fn from(e: gdal::errors::GdalError) -> Self {
        RasterError::Gdal(e.to_string())
    }
}

impl From<RasterError> for geo_primitives::PipelineError {
    fn from(e: RasterError) -> Self {
        match e {
            RasterError::CrsMissing(m) => geo_primitives::PipelineError::CrsMissing(m),
            RasterError::Io(e) => geo_primitives::PipelineError::IoTransient(e.to_string()),
            other => geo_primitives::PipelineError::ExternalFailure(other.to_string()),
        }
    }
}
