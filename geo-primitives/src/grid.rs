/// Raster grid metadata: the shape two rasters must share before any
/// pixelwise arithmetic combines them.
use crate::crs::Crs;
use crate::transform::Affine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandDType {
    Float32,
    Byte,
    UInt32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMeta {
    pub affine: Affine,
    pub width: usize,
    pub height: usize,
    pub crs: Crs,
    pub dtype: BandDType,
}

impl GridMeta {
    pub fn new(affine: Affine, width: usize, height: usize, crs: Crs, dtype: BandDType) -> Self {
        Self {
            affine,
            width,
            height,
            crs,
            dtype,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Two grids are pixel-aligned when they share CRS, pixel size, and an
    /// origin that differs by a whole number of pixels. Width and
    /// height need not match for alignment — only for direct pixelwise ops.
    pub fn is_pixel_aligned_with(&self, other: &GridMeta) -> bool {
        if self.crs != other.crs {
            return false;
        }
        let eps = 1e-6;
        if (self.affine.sx - other.affine.sx).abs() > eps
            || (self.affine.sy - other.affine.sy).abs() > eps
        {
            return false;
        }
        let dx = (self.affine.origin_x - other.affine.origin_x) / self.affine.sx;
        let dy = (self.affine.origin_y - other.affine.origin_y) / self.affine.sy;
        (dx - dx.round()).abs() < 1e-6 && (dy - dy.round()).abs() < 1e-6
    }

    /// Same shape and alignment: usable directly in a pixelwise binary op.
    pub fn is_congruent_with(&self, other: &GridMeta) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.is_pixel_aligned_with(other)
    }

    pub fn world_extent(&self) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.affine.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self
            .affine
            .pixel_to_world(self.width as f64, self.height as f64);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Affine;

    fn grid(ox: f64, oy: f64, sx: f64, sy: f64, w: usize, h: usize) -> GridMeta {
        GridMeta::new(
            Affine::north_up(ox, oy, sx, sy),
            w,
            h,
            Crs::epsg(32633),
            BandDType::Float32,
        )
    }

    #[test]
    fn congruent_grids_match_exactly() {
        let a = grid(0.0, 100.0, 1.0, 1.0, 10, 10);
        let b = grid(0.0, 100.0, 1.0, 1.0, 10, 10);
        assert!(a.is_congruent_with(&b));
    }

    #[test]
    fn offset_by_whole_pixels_is_aligned_but_not_congruent() {
        let a = grid(0.0, 100.0, 1.0, 1.0, 10, 10);
        let b = grid(5.0, 100.0, 1.0, 1.0, 8, 8);
        assert!(a.is_pixel_aligned_with(&b));
        assert!(!a.is_congruent_with(&b));
    }

    #[test]
    fn fractional_offset_breaks_alignment() {
        let a = grid(0.0, 100.0, 1.0, 1.0, 10, 10);
        let b = grid(0.5, 100.0, 1.0, 1.0, 10, 10);
        assert!(!a.is_pixel_aligned_with(&b));
    }

    #[test]
    fn mismatched_crs_breaks_alignment() {
        let a = grid(0.0, 100.0, 1.0, 1.0, 10, 10);
        let mut b = grid(0.0, 100.0, 1.0, 1.0, 10, 10);
        b.crs = Crs::epsg(4326);
        assert!(!a.is_pixel_aligned_with(&b));
    }
}
