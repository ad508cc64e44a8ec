//! Point-cloud stage: LAS/LAZ access, ground classification,
//! rasterization, and polygon-based cropping.

pub mod classify;
pub mod clip;
pub mod cloud;
pub mod crs_vlr;
pub mod error;
pub mod rasterize;

pub use classify::{ground_classify, Algorithm};
pub use clip::clip_by_polygon;
pub use cloud::{CloudMetadata, Point, PointCloud};
pub use error::PointCloudError;
pub use rasterize::{fill_holes, rasterize, Aggregator};
