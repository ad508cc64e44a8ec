/// Density raster: point count per cell at resolution `r_d`.
use crate::error::FootprintError;
use geo_primitives::{Affine, BandDType, Crs, GridMeta};
use pointcloud::PointCloud;
use raster::CountGrid;

pub const DEFAULT_RESOLUTION_M: f64 = 1.0;

/// Builds the grid geometry a density raster (and everything downstream of
/// it) will share: north-up, axis-aligned, snapped to whole-pixel origins.
pub fn density_grid(bounds: &geo_primitives::BoundingBox, crs: Crs, resolution_m: f64) -> GridMeta {
    let origin_x = (bounds.min_x / resolution_m).floor() * resolution_m;
    let origin_y = (bounds.max_y / resolution_m).ceil() * resolution_m;
    let width = (((bounds.max_x - origin_x) / resolution_m).ceil() as usize).max(1);
    let height = (((origin_y - bounds.min_y) / resolution_m).ceil() as usize).max(1);
    GridMeta::new(Affine::north_up(origin_x, origin_y, resolution_m, resolution_m), width, height, crs, BandDType::UInt32)
}

/// `aggregator = count` over the whole cloud (all returns, not first-return
/// only — a footprint meant to exclude voids should count every pulse that
/// reached the ground strip).
pub fn density_raster(cloud: &PointCloud, grid: &GridMeta) -> Result<CountGrid, FootprintError> {
    pointcloud::rasterize::rasterize_count(cloud, grid).map_err(FootprintError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_grid_snaps_origin_to_whole_pixels() {
        let bounds = geo_primitives::BoundingBox::new(100.3, 200.7, 150.9, 260.2);
        let grid = density_grid(&bounds, Crs::epsg(32633), 1.0);
        assert_eq!(grid.affine.origin_x, 100.0);
        assert_eq!(grid.affine.origin_y, 261.0);
        assert!(grid.width >= 51 && grid.height >= 61);
    }
}
