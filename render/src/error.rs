use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("image encode failure: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RenderError> for geo_primitives::PipelineError {
    fn from(e: RenderError) -> Self {
        geo_primitives::PipelineError::ExternalFailure(e.to_string())
    }
}
