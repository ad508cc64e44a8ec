/// Canopy Height Model: `max(DSM - DTM, 0)` with NoData
/// propagation; negative values are clamped explicitly, never via `abs`.
use crate::error::ElevationError;
use raster::ElevationGrid;

pub fn generate_chm(dsm: &ElevationGrid, dtm: &ElevationGrid) -> Result<ElevationGrid, ElevationError> {
    if !dsm.meta.is_congruent_with(&dtm.meta) {
        return Err(ElevationError::GridMismatch);
    }
    let diff = raster::ops::binary_op(dsm, dtm, |d, t| d - t);
    Ok(raster::ops::clamp_min(&diff, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta, NoDataSentinel};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, 10.0, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn chm_is_never_negative() {
        let dsm = ElevationGrid::filled(meta(2, 2), 5.0);
        let dtm = ElevationGrid::filled(meta(2, 2), 8.0);
        let chm = generate_chm(&dsm, &dtm).unwrap();
        assert_eq!(chm.get(0, 0), 0.0);
    }

    #[test]
    fn chm_propagates_nodata() {
        let mut dsm = ElevationGrid::filled(meta(2, 2), 5.0);
        dsm.set(0, 0, geo_primitives::NODATA_F32);
        let dtm = ElevationGrid::filled(meta(2, 2), 3.0);
        let chm = generate_chm(&dsm, &dtm).unwrap();
        assert!(chm.get(0, 0).is_nodata());
        assert_eq!(chm.get(1, 1), 2.0);
    }

    #[test]
    fn chm_rejects_incongruent_grids() {
        let dsm = ElevationGrid::filled(meta(2, 2), 5.0);
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        assert!(matches!(generate_chm(&dsm, &dtm), Err(ElevationError::GridMismatch)));
    }
}
