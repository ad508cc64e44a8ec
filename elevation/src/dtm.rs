/// Digital Terrain Model: ground-classify, rasterize, hole-fill.
use crate::error::ElevationError;
use geo_primitives::GridMeta;
use pointcloud::rasterize::{fill_holes, rasterize, Aggregator};
use pointcloud::{classify::Algorithm, PointCloud};
use raster::ElevationGrid;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct DtmParams {
    pub aggregator: Aggregator,
    pub hole_fill_max_radius: usize,
    pub hole_fill_passes: u32,
}

impl Default for DtmParams {
    fn default() -> Self {
        Self {
            aggregator: Aggregator::Tin,
            hole_fill_max_radius: 100,
            hole_fill_passes: 2,
        }
    }
}

/// Produces a DTM: ground-classify (if `classified` is `None`, runs the
/// default PMF), rasterize with the chosen aggregator, then hole-fill.
/// Cells with no ground points within the search radius stay NoData.
pub fn generate_dtm(
    cloud: &PointCloud,
    grid: &GridMeta,
    params: DtmParams,
    classified_scratch_path: &Path,
) -> Result<ElevationGrid, ElevationError> {
    let metadata = cloud.bounds_and_crs()?;
    let ground_cloud = if metadata.has_classification {
        pointcloud::classify::extract_ground(cloud, classified_scratch_path)?
    } else {
        let classified = pointcloud::ground_classify(cloud, Algorithm::default(), classified_scratch_path)?;
        pointcloud::classify::extract_ground(&classified, &classified_scratch_path.with_extension("ground.laz"))?
    };

    let raw = rasterize(&ground_cloud, grid, params.aggregator)?;
    Ok(fill_holes(&raw, Some(params.hole_fill_max_radius), Some(params.hole_fill_passes)))
}

#[cfg(test)]
mod tests {
    use super::DtmParams;
    use pointcloud::rasterize::Aggregator;

    #[test]
    fn default_params_use_tin_aggregator_per_fidelity_preference() {
        assert!(matches!(DtmParams::default().aggregator, Aggregator::Tin));
    }
}
