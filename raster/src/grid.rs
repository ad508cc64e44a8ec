/// In-memory raster buffer: a `GridMeta` plus a row-major pixel vector.
use geo_primitives::{GridMeta, NoDataSentinel};

#[derive(Debug, Clone)]
pub struct Raster<T> {
    pub meta: GridMeta,
    data: Vec<T>,
}

pub type ElevationGrid = Raster<f32>;
pub type ByteGrid = Raster<u8>;
pub type CountGrid = Raster<u32>;

impl<T: Copy + NoDataSentinel> Raster<T> {
    pub fn filled(meta: GridMeta, value: T) -> Self {
        let len = meta.len();
        Self {
            data: vec![value; len],
            meta,
        }
    }

    pub fn nodata_filled(meta: GridMeta) -> Self {
        Self::filled(meta, T::nodata())
    }

    pub fn from_vec(meta: GridMeta, data: Vec<T>) -> Self {
        assert_eq!(data.len(), meta.len(), "raster buffer length must equal width*height");
        Self { data, meta }
    }

    pub fn width(&self) -> usize {
        self.meta.width
    }

    pub fn height(&self) -> usize {
        self.meta.height
    }

    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.meta.width + col
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> T {
        self.data[self.index(col, row)]
    }

    /// Bounds-checked read returning `None` outside the grid, used by
    /// neighborhood windows near edges.
    #[inline]
    pub fn try_get(&self, col: isize, row: isize) -> Option<T> {
        if col < 0 || row < 0 || col as usize >= self.meta.width || row as usize >= self.meta.height
        {
            return None;
        }
        Some(self.get(col as usize, row as usize))
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, value: T) {
        let idx = self.index(col, row);
        self.data[idx] = value;
    }

    #[inline]
    pub fn is_valid(&self, col: usize, row: usize) -> bool {
        !self.get(col, row).is_nodata()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nodata()).count()
    }

    pub fn map<U: Copy + NoDataSentinel>(&self, f: impl Fn(T) -> U) -> Raster<U> {
        let data = self
            .data
            .iter()
            .map(|&v| if v.is_nodata() { U::nodata() } else { f(v) })
            .collect();
        Raster {
            meta: self.meta.clone(),
            data,
        }
    }
}

impl Raster<f32> {
    /// Percentile of the valid (non-NoData) distribution, linear interpolation
    /// between order statistics (used by renderer stretch and LRM clipping).
    pub fn percentile(&self, p: f64) -> Option<f32> {
        let mut valid: Vec<f32> = self.data.iter().copied().filter(|v| !v.is_nodata()).collect();
        if valid.is_empty() {
            return None;
        }
        valid.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let rank = (p / 100.0) * (valid.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            return Some(valid[lo]);
        }
        let frac = (rank - lo as f64) as f32;
        Some(valid[lo] + (valid[hi] - valid[lo]) * frac)
    }

    pub fn min_max_valid(&self) -> Option<(f32, f32)> {
        let mut it = self.data.iter().copied().filter(|v| !v.is_nodata());
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, 0.0, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn fill_and_get_roundtrip() {
        let r = Raster::<f32>::filled(meta(3, 3), 5.0);
        assert_eq!(r.get(1, 1), 5.0);
        assert_eq!(r.valid_count(), 9);
    }

    #[test]
    fn nodata_filled_has_zero_valid_count() {
        let r = Raster::<f32>::nodata_filled(meta(2, 2));
        assert_eq!(r.valid_count(), 0);
    }

    #[test]
    fn try_get_out_of_bounds_is_none() {
        let r = Raster::<f32>::filled(meta(2, 2), 1.0);
        assert_eq!(r.try_get(-1, 0), None);
        assert_eq!(r.try_get(2, 0), None);
        assert_eq!(r.try_get(0, 0), Some(1.0));
    }

    #[test]
    fn percentile_of_uniform_data_is_that_value() {
        let r = Raster::<f32>::filled(meta(4, 4), 7.0);
        assert_eq!(r.percentile(50.0), Some(7.0));
    }

    #[test]
    fn percentile_ignores_nodata() {
        let mut r = Raster::<f32>::filled(meta(2, 2), 10.0);
        r.set(0, 0, geo_primitives::NODATA_F32);
        assert_eq!(r.valid_count(), 3);
        assert_eq!(r.percentile(100.0), Some(10.0));
    }
}
