/// Sky-View Factor: integrates the visible upper hemisphere
/// against the local horizon, one ray per azimuth direction.
use geo_primitives::{NoDataSentinel, NODATA_F32};
use raster::ElevationGrid;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct SvfParams {
    pub directions: usize,
    pub max_radius_cells: i32,
    pub noise_reduction_passes: u32,
}

impl Default for SvfParams {
    fn default() -> Self {
        Self { directions: 16, max_radius_cells: 10, noise_reduction_passes: 0 }
    }
}

/// `1.0` = fully open sky, approaching `0.0` for deep concavities. Cells
/// that can't muster at least half the requested directions (because the
/// search radius runs off the grid on every remaining side) are NoData.
pub fn sky_view_factor(dtm: &ElevationGrid, params: SvfParams) -> ElevationGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let cell_size = (dtm.meta.affine.sx + dtm.meta.affine.sy) / 2.0;
    let mut data = vec![NODATA_F32; w * h];

    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            let center = dtm.get(col, row);
            if center.is_nodata() {
                continue;
            }
            if let Some(value) = svf_at(dtm, col, row, center, cell_size, params) {
                out_row[col] = value;
            }
        }
    });

    let mut out = ElevationGrid::from_vec(dtm.meta.clone(), data);
    for _ in 0..params.noise_reduction_passes {
        out = smooth_valid(&out);
    }
    out
}

fn svf_at(dtm: &ElevationGrid, col: usize, row: usize, center: f32, cell_size: f64, params: SvfParams) -> Option<f32> {
    let mut usable_directions = 0usize;
    let mut openness_sum = 0.0f64;

    for k in 0..params.directions {
        let azimuth = 2.0 * std::f64::consts::PI * (k as f64) / (params.directions as f64);
        let (dx, dy) = (azimuth.cos(), azimuth.sin());
        if let Some(max_angle) = horizon_angle_along_ray(dtm, col, row, center, dx, dy, cell_size, params.max_radius_cells) {
            // Open sky contribution of this ray: sin^2 of the horizon angle
            // (cos^2 of the angle from zenith, the standard hemispherical-
            // integration weighting). max_angle is already pi/2 minus the
            // elevation angle to the horizon, so sin gives the open-sky share.
            openness_sum += max_angle.sin().powi(2).max(0.0);
            usable_directions += 1;
        }
    }

    if usable_directions < params.directions / 2 {
        return None;
    }
    Some((openness_sum / usable_directions as f64) as f32)
}

/// Walks outward from `(col, row)` along `(dx, dy)` up to `max_radius`
/// cells, tracking the steepest horizon angle seen. A NoData sample along
/// the ray contributes its current partial horizon and terminates the ray
/// early rather than failing the whole cell.
fn horizon_angle_along_ray(
    dtm: &ElevationGrid,
    col: usize,
    row: usize,
    center: f32,
    dx: f64,
    dy: f64,
    cell_size: f64,
    max_radius: i32,
) -> Option<f64> {
    let mut max_angle = 0.0f64; // 0 = horizon at eye level (fully open so far)
    let mut any_sample = false;
    for step in 1..=max_radius {
        let sample_col = col as f64 + dx * step as f64;
        let sample_row = row as f64 + dy * step as f64;
        if sample_col < 0.0 || sample_row < 0.0 {
            break;
        }
        let Some(v) = dtm.try_get(sample_col.round() as isize, sample_row.round() as isize) else { break };
        if v.is_nodata() {
            break;
        }
        any_sample = true;
        let horizontal_dist = step as f64 * cell_size;
        let rise = (v - center) as f64;
        let angle = (rise / horizontal_dist).atan();
        if angle > max_angle {
            max_angle = angle;
        }
    }
    if !any_sample && max_radius > 0 {
        return None;
    }
    Some(std::f64::consts::FRAC_PI_2 - max_angle)
}

fn smooth_valid(grid: &ElevationGrid) -> ElevationGrid {
    let (w, h) = (grid.width(), grid.height());
    let mut out = vec![NODATA_F32; w * h];
    for row in 0..h {
        for col in 0..w {
            if !grid.is_valid(col, row) {
                continue;
            }
            let mut sum = 0.0f32;
            let mut count = 0u32;
            for dr in -1i32..=1 {
                for dc in -1i32..=1 {
                    if let Some(v) = grid.try_get(col as isize + dc as isize, row as isize + dr as isize) {
                        if !v.is_nodata() {
                            sum += v;
                            count += 1;
                        }
                    }
                }
            }
            out[row * w + col] = sum / count as f32;
        }
    }
    ElevationGrid::from_vec(grid.meta.clone(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn flat_plane_is_fully_open_sky() {
        let dtm = ElevationGrid::filled(meta(21, 21), 0.0);
        let svf = sky_view_factor(&dtm, SvfParams { directions: 8, max_radius_cells: 5, noise_reduction_passes: 0 });
        let center = svf.get(10, 10);
        assert!(!center.is_nodata());
        assert!(center > 0.9, "flat terrain should be nearly fully open, got {center}");
    }

    #[test]
    fn output_stays_in_unit_range() {
        let mut dtm = ElevationGrid::filled(meta(21, 21), 0.0);
        for r in 0..21 {
            for c in 0..21 {
                if (c as i32 - 10).abs() + (r as i32 - 10).abs() > 6 {
                    dtm.set(c, r, 20.0);
                }
            }
        }
        let svf = sky_view_factor(&dtm, SvfParams::default());
        let v = svf.get(10, 10);
        assert!(v.is_nodata() || (0.0..=1.0).contains(&v));
    }
}
