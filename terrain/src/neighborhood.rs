/// TPI, TRI, and Roughness: square-neighborhood derivatives
/// sharing the same 3x3 (or r_i/r_o annular) window walk.
use geo_primitives::{NoDataSentinel, NODATA_F32};
use raster::ElevationGrid;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct TpiParams {
    pub inner_radius: i32,
    pub outer_radius: i32,
    pub min_valid_for_mean: usize,
}

impl Default for TpiParams {
    fn default() -> Self {
        Self { inner_radius: 0, outer_radius: 1, min_valid_for_mean: 0 }
    }
}

/// `TPI(x) = elevation(x) - mean(neighborhood excluding the center when
/// inner_radius == 0)`. NoData in the window -> NoData at center unless
/// `min_valid_for_mean` valid neighbors are present, in which case the
/// mean-of-valid is used instead.
pub fn tpi(dtm: &ElevationGrid, params: TpiParams) -> ElevationGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            let center = dtm.get(col, row);
            if center.is_nodata() {
                continue;
            }
            let (sum, count, all_valid) = annular_stats(dtm, col, row, params.inner_radius, params.outer_radius);
            if count == 0 {
                continue;
            }
            if !all_valid && count < params.min_valid_for_mean {
                continue;
            }
            out_row[col] = center - (sum / count as f32);
        }
    });
    ElevationGrid::from_vec(dtm.meta.clone(), data)
}

/// Mean absolute elevation difference to each of the 3x3 neighbors.
pub fn tri(dtm: &ElevationGrid) -> ElevationGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            if let Some(values) = crate::gradient::window3x3(dtm, col, row) {
                let center = values[4];
                let sum: f64 = values.iter().enumerate().filter(|&(i, _)| i != 4).map(|(_, &v)| (v - center).abs()).sum();
                out_row[col] = (sum / 8.0) as f32;
            }
        }
    });
    ElevationGrid::from_vec(dtm.meta.clone(), data)
}

/// Max - min elevation within a 3x3 window.
pub fn roughness(dtm: &ElevationGrid) -> ElevationGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            if let Some(values) = crate::gradient::window3x3(dtm, col, row) {
                let (mut lo, mut hi) = (f64::MAX, f64::MIN);
                for &v in &values {
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
                out_row[col] = (hi - lo) as f32;
            }
        }
    });
    ElevationGrid::from_vec(dtm.meta.clone(), data)
}

fn annular_stats(dtm: &ElevationGrid, col: usize, row: usize, r_i: i32, r_o: i32) -> (f32, usize, bool) {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    let mut total = 0usize;
    for dr in -r_o..=r_o {
        for dc in -r_o..=r_o {
            let d2 = dc * dc + dr * dr;
            if d2 == 0 && r_i == 0 {
                continue; // exclude the center cell itself
            }
            if (d2 as f64).sqrt() < r_i as f64 || (d2 as f64).sqrt() > r_o as f64 {
                continue;
            }
            total += 1;
            if let Some(v) = dtm.try_get(col as isize + dc as isize, row as isize + dr as isize) {
                if !v.is_nodata() {
                    sum += v;
                    count += 1;
                }
            }
        }
    }
    (sum, count, count == total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn flat_dtm_has_zero_tpi_tri_roughness() {
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        assert_eq!(tpi(&dtm, TpiParams::default()).get(1, 1), 0.0);
        assert_eq!(tri(&dtm).get(1, 1), 0.0);
        assert_eq!(roughness(&dtm).get(1, 1), 0.0);
    }

    #[test]
    fn single_spike_increases_tri_and_roughness() {
        let mut dtm = ElevationGrid::filled(meta(3, 3), 0.0);
        dtm.set(1, 1, 10.0);
        assert!(tri(&dtm).get(1, 1) > 0.0);
        assert!(roughness(&dtm).get(1, 1) > 0.0);
    }
}
