/// Masked pixelwise arithmetic: `binary_op(a, b, f)`.
use crate::grid::Raster;
use geo_primitives::{NoDataSentinel, NODATA_U32};

/// `a (op) b`, pixelwise. Cells where either input is NoData become NoData.
/// `a` and `b` must already be congruent (see `resample::align`).
pub fn binary_op(a: &Raster<f32>, b: &Raster<f32>, f: impl Fn(f32, f32) -> f32) -> Raster<f32> {
    debug_assert!(a.meta.is_congruent_with(&b.meta), "binary_op requires congruent grids");
    let mut out = Raster::<f32>::nodata_filled(a.meta.clone());
    for row in 0..a.height() {
        for col in 0..a.width() {
            let av = a.get(col, row);
            let bv = b.get(col, row);
            if av.is_nodata() || bv.is_nodata() {
                continue;
            }
            out.set(col, row, f(av, bv));
        }
    }
    out
}

pub fn unary_op(a: &Raster<f32>, f: impl Fn(f32) -> f32) -> Raster<f32> {
    a.map(f)
}

/// Clamp to a floor, e.g. `CHM = max(DSM - DTM, 0)`. NoData is
/// left untouched by `Raster::map`.
pub fn clamp_min(a: &Raster<f32>, floor: f32) -> Raster<f32> {
    unary_op(a, |v| v.max(floor))
}

/// Widening integer sum used by density accumulation: never overflows
/// because the accumulator is u32 while per-cell counts realistically stay
/// far below u32::MAX; explicit saturating add documents the intent —
/// overflow is forbidden here, not silently wrapped.
pub fn saturating_add_u32(a: u32, b: u32) -> u32 {
    if a == NODATA_U32 {
        return b;
    }
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, 0.0, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn binary_op_propagates_nodata_from_either_side() {
        let mut a = Raster::<f32>::filled(meta(2, 2), 10.0);
        let b = Raster::<f32>::filled(meta(2, 2), 4.0);
        a.set(0, 0, geo_primitives::NODATA_F32);
        let sum = binary_op(&a, &b, |x, y| x + y);
        assert!(sum.get(0, 0).is_nodata());
        assert_eq!(sum.get(1, 1), 14.0);
    }

    #[test]
    fn clamp_min_zeroes_negative_values_without_abs() {
        let a = Raster::<f32>::filled(meta(1, 1), -3.0);
        let out = clamp_min(&a, 0.0);
        assert_eq!(out.get(0, 0), 0.0);
    }

    #[test]
    fn clamp_min_preserves_nodata() {
        let a = Raster::<f32>::nodata_filled(meta(1, 1));
        let out = clamp_min(&a, 0.0);
        assert!(out.get(0, 0).is_nodata());
    }
}
