/// Colormaps used by the per-product renderers. Each map
/// is a small set of control points in `t ∈ [0, 1]`, linearly interpolated.
pub type Rgb = [u8; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Colormap {
    Viridis,
    Inferno,
    Cividis,
    GreenRamp,
    Coolwarm,
    Cyclic,
    Grayscale,
}

impl Colormap {
    pub fn sample(&self, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        match self {
            Colormap::Viridis => interpolate(&VIRIDIS, t),
            Colormap::Inferno => interpolate(&INFERNO, t),
            Colormap::Cividis => interpolate(&CIVIDIS, t),
            Colormap::GreenRamp => interpolate(&GREEN_RAMP, t),
            Colormap::Coolwarm => interpolate(&COOLWARM, t),
            Colormap::Cyclic => interpolate(&CYCLIC, t),
            Colormap::Grayscale => {
                let v = (t * 255.0).round() as u8;
                [v, v, v]
            }
        }
    }
}

fn interpolate(stops: &[Rgb], t: f64) -> Rgb {
    if stops.len() == 1 {
        return stops[0];
    }
    let scaled = t * (stops.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(stops.len() - 1);
    let frac = scaled - lo as f64;
    let mut out = [0u8; 3];
    for i in 0..3 {
        let a = stops[lo][i] as f64;
        let b = stops[hi][i] as f64;
        out[i] = (a + (b - a) * frac).round() as u8;
    }
    out
}

const VIRIDIS: [Rgb; 6] = [[68, 1, 84], [65, 68, 135], [42, 120, 142], [34, 168, 132], [122, 209, 81], [253, 231, 37]];
const INFERNO: [Rgb; 6] = [[0, 0, 4], [87, 16, 110], [188, 55, 84], [237, 104, 37], [250, 179, 21], [252, 255, 164]];
const CIVIDIS: [Rgb; 5] = [[0, 32, 76], [62, 74, 104], [123, 117, 119], [189, 164, 97], [255, 234, 70]];
const GREEN_RAMP: [Rgb; 4] = [[247, 252, 245], [161, 217, 155], [65, 171, 93], [0, 68, 27]];
const COOLWARM: [Rgb; 5] = [[59, 76, 192], [146, 178, 247], [221, 221, 221], [244, 157, 122], [180, 4, 38]];
const CYCLIC: [Rgb; 5] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 0, 255], [255, 0, 0]];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_endpoints_match_control_points() {
        assert_eq!(Colormap::Viridis.sample(0.0), VIRIDIS[0]);
        assert_eq!(Colormap::Viridis.sample(1.0), *VIRIDIS.last().unwrap());
    }

    #[test]
    fn grayscale_is_linear() {
        assert_eq!(Colormap::Grayscale.sample(0.5), [128, 128, 128]);
    }

    #[test]
    fn cyclic_wraps_back_to_its_start_color() {
        assert_eq!(Colormap::Cyclic.sample(0.0), Colormap::Cyclic.sample(1.0));
    }
}
