/// Validity mask: density >= threshold -> 1, else 0.
use geo_primitives::NoDataSentinel;
use raster::{ByteGrid, CountGrid};

pub const DEFAULT_THRESHOLD: u32 = 2;

pub fn validity_mask(density: &CountGrid, threshold: u32) -> ByteGrid {
    let data: Vec<u8> = density
        .as_slice()
        .iter()
        .map(|&count| if count.is_nodata() { 0 } else if count >= threshold { 1 } else { 0 })
        .collect();
    ByteGrid::from_vec(density.meta.clone(), data)
}

/// True when every cell of `mask` is below threshold, i.e. the density
/// raster never cleared the bar anywhere.
pub fn is_entirely_invalid(mask: &ByteGrid) -> bool {
    mask.as_slice().iter().all(|&v| v == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, 10.0, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::UInt32)
    }

    #[test]
    fn threshold_splits_valid_and_invalid_cells() {
        let mut density = CountGrid::filled(meta(2, 2), 5);
        density.set(0, 0, 1);
        let mask = validity_mask(&density, 2);
        assert_eq!(mask.get(0, 0), 0);
        assert_eq!(mask.get(1, 1), 1);
    }

    #[test]
    fn all_below_threshold_is_entirely_invalid() {
        let density = CountGrid::filled(meta(2, 2), 1);
        let mask = validity_mask(&density, 2);
        assert!(is_entirely_invalid(&mask));
    }
}
