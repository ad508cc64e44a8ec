/// Per-product normalization policy: maps a raw f32
/// sample to `t ∈ [0, 1]` before colormap lookup.
use raster::ElevationGrid;

#[derive(Debug, Clone, Copy)]
pub enum Normalization {
    /// Percentile stretch of the valid distribution, e.g. DTM/DSM/CHM/TPI/TRI/Roughness.
    PercentileStretch { low: f64, high: f64 },
    /// Linear stretch over a fixed range, e.g. slope/hillshade/SVF.
    Linear { min: f64, max: f64 },
    /// Symmetric about zero using percentile bounds, e.g. LRM.
    SymmetricPercentile { low: f64, high: f64 },
}

impl Normalization {
    pub fn normalize(&self, grid: &ElevationGrid, value: f32) -> f64 {
        match *self {
            Normalization::PercentileStretch { low, high } => {
                let (lo, hi) = bounds(grid, low, high);
                scale(value as f64, lo, hi)
            }
            Normalization::Linear { min, max } => scale(value as f64, min, max),
            Normalization::SymmetricPercentile { low, high } => {
                let (lo, hi) = bounds(grid, low, high);
                let scale_abs = lo.abs().max(hi.abs());
                if scale_abs <= 0.0 {
                    0.5
                } else {
                    ((value as f64 / scale_abs) + 1.0) / 2.0
                }
            }
        }
    }
}

fn bounds(grid: &ElevationGrid, low_pct: f64, high_pct: f64) -> (f64, f64) {
    let lo = grid.percentile(low_pct).unwrap_or(0.0) as f64;
    let hi = grid.percentile(high_pct).unwrap_or(1.0) as f64;
    (lo, hi)
}

fn scale(value: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() < 1e-12 {
        return 0.5;
    }
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn linear_stretch_clamps_outside_range() {
        let grid = ElevationGrid::filled(meta(2, 2), 0.0);
        let n = Normalization::Linear { min: 0.0, max: 90.0 };
        assert_eq!(n.normalize(&grid, 120.0), 1.0);
        assert_eq!(n.normalize(&grid, -10.0), 0.0);
    }

    #[test]
    fn symmetric_percentile_centers_zero_at_half() {
        let mut grid = ElevationGrid::filled(meta(10, 10), 0.0);
        for i in 0..10 {
            grid.set(i, 0, i as f32 - 5.0);
        }
        let n = Normalization::SymmetricPercentile { low: 2.0, high: 98.0 };
        let mid = n.normalize(&grid, 0.0);
        assert!((mid - 0.5).abs() < 0.1, "zero should normalize near 0.5, got {mid}");
    }
}
