//! Geo primitives: bounding boxes, affine transforms, CRS handles, NoData
//! sentinels, and raster grid metadata.
//! Every other crate in the workspace depends on this one and nothing else
//! in the workspace.

pub mod bbox;
pub mod canonical;
pub mod crs;
pub mod error;
pub mod grid;
pub mod nodata;
pub mod transform;

pub use bbox::BoundingBox;
pub use canonical::{fingerprint, CanonicalParams, CanonicalValue};
pub use crs::Crs;
pub use error::PipelineError;
pub use grid::{BandDType, GridMeta};
pub use nodata::{NoDataSentinel, NODATA_F32, NODATA_U32, NODATA_U8};
pub use transform::Affine;
