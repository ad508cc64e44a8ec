/// Slope in degrees, range [0, 90]. Edge cells and any NoData
/// in the 3x3 window become NoData.
use crate::gradient::horn_gradient;
use geo_primitives::NODATA_F32;
use raster::ElevationGrid;
use rayon::prelude::*;

pub fn slope_degrees(dtm: &ElevationGrid, z_factor: f64) -> ElevationGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            if let Some((dzdx, dzdy)) = horn_gradient(dtm, col, row) {
                let (dzdx, dzdy) = (dzdx * z_factor, dzdy * z_factor);
                let rise = (dzdx * dzdx + dzdy * dzdy).sqrt();
                out_row[col] = rise.atan().to_degrees() as f32;
            }
        }
    });
    ElevationGrid::from_vec(dtm.meta.clone(), data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta, NoDataSentinel};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn flat_dtm_has_zero_slope_everywhere_interior() {
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        let slope = slope_degrees(&dtm, 1.0);
        assert_eq!(slope.get(1, 1), 0.0);
    }

    #[test]
    fn edge_cells_are_nodata() {
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        let slope = slope_degrees(&dtm, 1.0);
        assert!(slope.get(0, 0).is_nodata());
    }
}
