/// Local Relief Model: `LRM = DTM - smooth(DTM)`.
use geo_primitives::{NoDataSentinel, NODATA_F32};
use raster::ElevationGrid;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Uniform,
    Gaussian,
}

#[derive(Debug, Clone, Copy)]
pub struct LrmParams {
    pub window_size: Option<usize>,
    pub auto_sizing: bool,
    pub filter_type: FilterType,
    pub enhanced_normalization: bool,
    pub percentile_low: f64,
    pub percentile_high: f64,
}

impl Default for LrmParams {
    fn default() -> Self {
        Self {
            window_size: None,
            auto_sizing: true,
            filter_type: FilterType::Uniform,
            enhanced_normalization: false,
            percentile_low: 2.0,
            percentile_high: 98.0,
        }
    }
}

/// Window size from the grid's pixel size when `auto_sizing` and no
/// explicit `window_size` are given.
pub fn auto_window_size(pixel_size_m: f64) -> usize {
    if pixel_size_m <= 0.5 {
        61
    } else if pixel_size_m <= 1.0 {
        31
    } else if pixel_size_m <= 2.0 {
        21
    } else {
        11
    }
}

pub fn local_relief_model(dtm: &ElevationGrid, params: LrmParams) -> ElevationGrid {
    let pixel_size = (dtm.meta.affine.sx + dtm.meta.affine.sy) / 2.0;
    let window_size = params
        .window_size
        .unwrap_or_else(|| if params.auto_sizing { auto_window_size(pixel_size) } else { 11 });

    let smoothed = match params.filter_type {
        FilterType::Uniform => box_filter(dtm, window_size),
        FilterType::Gaussian => gaussian_filter(dtm, window_size, window_size as f64 / 6.0),
    };

    let mut lrm = raster::ops::binary_op(dtm, &smoothed, |d, s| d - s);
    if params.enhanced_normalization {
        lrm = enhance_normalize(&lrm, params.percentile_low, params.percentile_high);
    }
    lrm
}

/// Smoothing requires >= 50% valid coverage in the window, else NoData;
/// normalizes by the count of valid neighbors, treating
/// NoData as absent rather than zero.
fn box_filter(grid: &ElevationGrid, window_size: usize) -> ElevationGrid {
    windowed_filter(grid, window_size, |values| {
        let sum: f32 = values.iter().sum();
        sum / values.len() as f32
    })
}

fn gaussian_filter(grid: &ElevationGrid, window_size: usize, sigma: f64) -> ElevationGrid {
    let radius = (window_size / 2) as i32;
    let kernel: Vec<f64> = (-radius..=radius).map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp()).collect();
    windowed_filter_weighted(grid, radius, &kernel)
}

fn windowed_filter(grid: &ElevationGrid, window_size: usize, reduce: impl Fn(&[f32]) -> f32 + Sync) -> ElevationGrid {
    let radius = (window_size / 2) as i32;
    let (w, h) = (grid.width(), grid.height());
    let min_valid = (((2 * radius + 1) * (2 * radius + 1)) as f64 * 0.5).ceil() as usize;
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            let mut values = Vec::new();
            for dr in -radius..=radius {
                for dc in -radius..=radius {
                    if let Some(v) = grid.try_get(col as isize + dc as isize, row as isize + dr as isize) {
                        if !v.is_nodata() {
                            values.push(v);
                        }
                    }
                }
            }
            if values.len() >= min_valid {
                out_row[col] = reduce(&values);
            }
        }
    });
    ElevationGrid::from_vec(grid.meta.clone(), data)
}

fn windowed_filter_weighted(grid: &ElevationGrid, radius: i32, kernel_1d: &[f64]) -> ElevationGrid {
    let (w, h) = (grid.width(), grid.height());
    let window_area = ((2 * radius + 1) * (2 * radius + 1)) as f64;
    let min_valid = (window_area * 0.5).ceil() as usize;
    let mut data = vec![NODATA_F32; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            let mut weight_sum = 0.0f64;
            let mut value_sum = 0.0f64;
            let mut valid = 0usize;
            for (ri, dr) in (-radius..=radius).enumerate() {
                for (ci, dc) in (-radius..=radius).enumerate() {
                    if let Some(v) = grid.try_get(col as isize + dc as isize, row as isize + dr as isize) {
                        if !v.is_nodata() {
                            let weight = kernel_1d[ri] * kernel_1d[ci];
                            weight_sum += weight;
                            value_sum += weight * v as f64;
                            valid += 1;
                        }
                    }
                }
            }
            if valid >= min_valid && weight_sum > 0.0 {
                out_row[col] = (value_sum / weight_sum) as f32;
            }
        }
    });
    ElevationGrid::from_vec(grid.meta.clone(), data)
}

/// Clips at `(P_low, P_high)` percentiles of the valid distribution, then
/// scales symmetrically to [-1, 1] using `max(|P_low|, |P_high|)`.
fn enhance_normalize(lrm: &ElevationGrid, p_low: f64, p_high: f64) -> ElevationGrid {
    let (Some(lo), Some(hi)) = (lrm.percentile(p_low), lrm.percentile(p_high)) else {
        return lrm.clone();
    };
    let scale = lo.abs().max(hi.abs());
    if scale <= 0.0 {
        return lrm.clone();
    }
    lrm.map(|v| (v.clamp(lo, hi) / scale).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::NoDataSentinel;

    #[test]
    fn auto_window_size_matches_spec_table() {
        assert_eq!(auto_window_size(0.3), 61);
        assert_eq!(auto_window_size(1.0), 31);
        assert_eq!(auto_window_size(1.5), 21);
        assert_eq!(auto_window_size(5.0), 11);
    }

    #[test]
    fn flat_dtm_produces_zero_lrm_where_coverage_is_full() {
        use geo_primitives::{Affine, BandDType, Crs, GridMeta};
        let meta = GridMeta::new(Affine::north_up(0.0, 15.0, 1.0, 1.0), 15, 15, Crs::epsg(32633), BandDType::Float32);
        let dtm = ElevationGrid::filled(meta, 5.0);
        let lrm = local_relief_model(&dtm, LrmParams { window_size: Some(3), auto_sizing: false, ..LrmParams::default() });
        assert_eq!(lrm.get(7, 7), 0.0);
    }

    #[test]
    fn enhanced_normalization_stays_within_unit_range() {
        use geo_primitives::{Affine, BandDType, Crs, GridMeta};
        let meta = GridMeta::new(Affine::north_up(0.0, 15.0, 1.0, 1.0), 15, 15, Crs::epsg(32633), BandDType::Float32);
        let mut dtm = ElevationGrid::filled(meta, 5.0);
        dtm.set(7, 7, 50.0);
        let lrm = local_relief_model(
            &dtm,
            LrmParams { window_size: Some(3), auto_sizing: false, enhanced_normalization: true, ..LrmParams::default() },
        );
        let v = lrm.get(7, 7);
        assert!(v.is_nodata() || (-1.0..=1.0).contains(&v));
    }
}
