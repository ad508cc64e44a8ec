/// Digital Surface Model: `max` over all returns (or first
/// returns, when the aggregator distinguishes) at the DTM's grid.
use crate::error::ElevationError;
use geo_primitives::GridMeta;
use pointcloud::rasterize::{rasterize, Aggregator};
use pointcloud::PointCloud;
use raster::ElevationGrid;

pub fn generate_dsm(cloud: &PointCloud, grid: &GridMeta) -> Result<ElevationGrid, ElevationError> {
    rasterize(cloud, grid, Aggregator::Max).map_err(ElevationError::from)
}
