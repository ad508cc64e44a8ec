/// Aspect in degrees: compass direction of steepest descent,
/// 0 = north, increasing clockwise. Flat cells get a reserved sentinel.
use crate::gradient::horn_gradient;
use geo_primitives::NODATA_F32;
use raster::ElevationGrid;
use rayon::prelude::*;

pub const FLAT_ASPECT_SENTINEL: f32 = -1.0;
pub const DEFAULT_FLAT_EPSILON_DEGREES: f64 = 0.01;

pub fn aspect_degrees(dtm: &ElevationGrid, flat_epsilon_degrees: f64) -> ElevationGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            if let Some((dzdx, dzdy)) = horn_gradient(dtm, col, row) {
                let slope_deg = (dzdx * dzdx + dzdy * dzdy).sqrt().atan().to_degrees();
                if slope_deg < flat_epsilon_degrees {
                    out_row[col] = FLAT_ASPECT_SENTINEL;
                    continue;
                }
                // atan2(dz/dy, -dz/dx) points toward steepest descent from
                // east=0 ccw; rotate to compass bearing (north=0, clockwise).
                let bearing = 90.0 - dzdy.atan2(-dzdx).to_degrees();
                let bearing = ((bearing % 360.0) + 360.0) % 360.0;
                out_row[col] = bearing as f32;
            }
        }
    });
    ElevationGrid::from_vec(dtm.meta.clone(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn flat_plane_returns_sentinel_not_zero() {
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        let aspect = aspect_degrees(&dtm, DEFAULT_FLAT_EPSILON_DEGREES);
        assert_eq!(aspect.get(1, 1), FLAT_ASPECT_SENTINEL);
    }

    #[test]
    fn bearings_stay_within_compass_range() {
        let mut dtm = ElevationGrid::filled(meta(3, 3), 0.0);
        for col in 0..3 {
            dtm.set(col, 0, 10.0);
        }
        let aspect = aspect_degrees(&dtm, DEFAULT_FLAT_EPSILON_DEGREES);
        let v = aspect.get(1, 1);
        assert!((0.0..360.0).contains(&v), "aspect {v} out of compass range");
    }
}
