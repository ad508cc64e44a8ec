//! Elevation products: DTM, DSM, CHM.

pub mod chm;
pub mod dsm;
pub mod dtm;
pub mod error;

pub use chm::generate_chm;
pub use dsm::generate_dsm;
pub use dtm::{generate_dtm, DtmParams};
pub use error::ElevationError;
