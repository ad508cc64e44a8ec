/// Crop subsystem: runs density -> mask -> polygon -> crop end to end and
/// proves the containment invariants hold.
use crate::density::{self, DEFAULT_RESOLUTION_M};
use crate::error::FootprintError;
use crate::mask::{self, DEFAULT_THRESHOLD};
use crate::polygon::{self, DEFAULT_MIN_RING_AREA_M2, DEFAULT_SIMPLIFY_TOLERANCE_M};
use geo_types::MultiPolygon;
use pointcloud::PointCloud;
use raster::{ByteGrid, CountGrid};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct FootprintParams {
    pub resolution_m: f64,
    pub density_threshold: u32,
    pub simplify_tolerance_m: f64,
    pub min_ring_area_m2: f64,
}

impl Default for FootprintParams {
    fn default() -> Self {
        Self {
            resolution_m: DEFAULT_RESOLUTION_M,
            density_threshold: DEFAULT_THRESHOLD,
            simplify_tolerance_m: DEFAULT_SIMPLIFY_TOLERANCE_M,
            min_ring_area_m2: DEFAULT_MIN_RING_AREA_M2,
        }
    }
}

pub struct FootprintArtifacts {
    pub density: CountGrid,
    pub mask: ByteGrid,
    pub footprint: MultiPolygon<f64>,
}

/// Runs density -> mask -> polygon without cropping.
/// Producers that only need the authoritative extent (e.g. clean-mode
/// NoData supersets) stop here; `crop_cloud` goes one step further.
pub fn build_footprint(cloud: &PointCloud, params: FootprintParams) -> Result<FootprintArtifacts, FootprintError> {
    let meta = cloud.bounds_and_crs()?;
    let grid = density::density_grid(&meta.bounds, meta.crs.clone(), params.resolution_m);
    let density = density::density_raster(cloud, &grid)?;

    if mask::is_entirely_invalid(&mask::validity_mask(&density, params.density_threshold)) {
        return Err(FootprintError::EmptyFootprint(format!(
            "density raster for {} never reaches threshold {}",
            cloud.path().display(),
            params.density_threshold
        )));
    }

    let mask = mask::validity_mask(&density, params.density_threshold);
    let footprint = polygon::vectorize_mask(&mask, params.simplify_tolerance_m, params.min_ring_area_m2)?;
    Ok(FootprintArtifacts { density, mask, footprint })
}

/// `clip_by_polygon` against the freshly-built footprint, producing the
/// clean cloud for clean-mode re-entry.
pub fn crop_cloud(
    cloud: &PointCloud,
    artifacts: &FootprintArtifacts,
    out_path: impl AsRef<Path>,
) -> Result<PointCloud, FootprintError> {
    let polygon = artifacts
        .footprint
        .0
        .first()
        .ok_or_else(|| FootprintError::FootprintDegenerate("no exterior ring to crop against".into()))?
        .clone();
    pointcloud::clip_by_polygon(cloud, &polygon, out_path).map_err(FootprintError::from)
}
