/// Horn's method 3x3 partial derivatives, chosen over Zevenbergen-Thorne as
/// the more common GIS default. This crate documents Horn's method in every
/// derivative's manifest entry.
use geo_primitives::NoDataSentinel;
use raster::ElevationGrid;

/// `(dz/dx, dz/dy)` at `(col, row)`, or `None` if the 3x3 window leaves the
/// grid or contains any NoData cell. The same edge/NoData policy is shared
/// by slope and aspect.
pub fn horn_gradient(dtm: &ElevationGrid, col: usize, row: usize) -> Option<(f64, f64)> {
    let w = window3x3(dtm, col, row)?;
    let cell_x = dtm.meta.affine.sx;
    let cell_y = dtm.meta.affine.sy;
    let dzdx = ((w[2] + 2.0 * w[5] + w[8]) - (w[0] + 2.0 * w[3] + w[6])) / (8.0 * cell_x);
    let dzdy = ((w[6] + 2.0 * w[7] + w[8]) - (w[0] + 2.0 * w[1] + w[2])) / (8.0 * cell_y);
    Some((dzdx, dzdy))
}

/// Row-major 3x3 window values `[z1..z9]` (z1 = top-left, z9 = bottom-right),
/// or `None` if any cell is out of bounds or NoData.
pub fn window3x3(grid: &ElevationGrid, col: usize, row: usize) -> Option<[f64; 9]> {
    let mut out = [0.0f64; 9];
    let mut i = 0;
    for dr in -1i32..=1 {
        for dc in -1i32..=1 {
            let v = grid.try_get(col as isize + dc as isize, row as isize + dr as isize)?;
            if v.is_nodata() {
                return None;
            }
            out[i] = v as f64;
            i += 1;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta() -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, 3.0, 1.0, 1.0), 3, 3, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn flat_plane_has_zero_gradient() {
        let dtm = ElevationGrid::filled(meta(), 10.0);
        let (dzdx, dzdy) = horn_gradient(&dtm, 1, 1).unwrap();
        assert!(dzdx.abs() < 1e-9 && dzdy.abs() < 1e-9);
    }

    #[test]
    fn edge_cell_has_no_gradient() {
        let dtm = ElevationGrid::filled(meta(), 10.0);
        assert_eq!(horn_gradient(&dtm, 0, 0), None);
    }
}
