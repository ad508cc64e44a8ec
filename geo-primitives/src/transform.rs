/// Pixel <-> world affine transform, GDAL's six-coefficient convention.
///
/// world_x = origin_x + col * sx + row * rot_x
/// world_y = origin_y + col * rot_y + row * sy
///
/// `sy` is stored positive; callers apply it as a south-up pixel size the
/// way every producer in this workspace does (row 0 is the north edge).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub origin_x: f64,
    pub origin_y: f64,
    pub sx: f64,
    pub sy: f64,
    pub rot_x: f64,
    pub rot_y: f64,
}

impl Affine {
    /// North-up, axis-aligned grid: the only kind this pipeline produces.
    pub fn north_up(origin_x: f64, origin_y: f64, sx: f64, sy: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            sx,
            sy,
            rot_x: 0.0,
            rot_y: 0.0,
        }
    }

    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.sx + row * self.rot_x,
            self.origin_y + col * self.rot_y - row * self.sy,
        )
    }

    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        // Axis-aligned inverse; rot_x/rot_y are always 0.0 in this pipeline.
        let col = (x - self.origin_x) / self.sx;
        let row = (self.origin_y - y) / self.sy;
        (col, row)
    }

    /// The GDAL-order six coefficients, as written into world files (`.pgw`) and manifests.
    pub fn gdal_coefficients(&self) -> [f64; 6] {
        [self.origin_x, self.sx, self.rot_x, self.origin_y, self.rot_y, -self.sy]
    }

    /// World-file text: six newline-separated coefficients, center-of-pixel convention.
    pub fn world_file_contents(&self) -> String {
        let c = self.gdal_coefficients();
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n",
            c[1],
            c[2],
            c[4],
            c[5],
            c[0] + c[1] / 2.0,
            c[3] + c[5] / 2.0
        )
    }

    pub fn approx_eq(&self, other: &Affine, eps: f64) -> bool {
        (self.origin_x - other.origin_x).abs() < eps
            && (self.origin_y - other.origin_y).abs() < eps
            && (self.sx - other.sx).abs() < eps
            && (self.sy - other.sy).abs() < eps
            && (self.rot_x - other.rot_x).abs() < eps
            && (self.rot_y - other.rot_y).abs() < eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_pixel_world() {
        let a = Affine::north_up(500000.0, 4649000.0, 1.0, 1.0);
        let (x, y) = a.pixel_to_world(10.0, 20.0);
        let (col, row) = a.world_to_pixel(x, y);
        assert!((col - 10.0).abs() < 1e-9);
        assert!((row - 20.0).abs() < 1e-9);
    }

    #[test]
    fn world_file_matches_gdal_convention() {
        let a = Affine::north_up(0.0, 100.0, 2.0, 2.0);
        let text = a.world_file_contents();
        let lines: Vec<f64> = text.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(lines[0], 2.0);
        assert_eq!(lines[3], -2.0);
    }
}
