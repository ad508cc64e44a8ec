/// Lambertian hillshade: single-direction, multi-directional
/// (mean of N >= 2 directions), and RGB-composite (3 azimuths -> R/G/B).
use crate::gradient::horn_gradient;
use geo_primitives::{NoDataSentinel, NODATA_U8};
use raster::ByteGrid;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct HillshadeParams {
    pub azimuth_degrees: f64,
    pub altitude_degrees: f64,
    pub z_factor: f64,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self { azimuth_degrees: 315.0, altitude_degrees: 45.0, z_factor: 1.0 }
    }
}

/// Single-direction hillshade, output byte range [0, 254]. 255 is reserved
/// as the NoData sentinel (`NODATA_U8`) and is never emitted as a shade
/// value, even for a cell whose cosine-incidence would otherwise round to
/// full illumination -- a real shade of 255 would otherwise be
/// indistinguishable from NoData once written through `raster::write_byte`.
pub fn hillshade(dtm: &raster::ElevationGrid, params: HillshadeParams) -> ByteGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_U8; w * h];
    data.par_chunks_mut(w).enumerate().for_each(|(row, out_row)| {
        for col in 0..w {
            if let Some(value) = shade_at(dtm, col, row, params) {
                out_row[col] = value;
            }
        }
    });
    ByteGrid::from_vec(dtm.meta.clone(), data)
}

/// Mean of N independent directional hillshades (N >= 2).
pub fn multi_directional(dtm: &raster::ElevationGrid, azimuths: &[f64], altitude_degrees: f64, z_factor: f64) -> ByteGrid {
    assert!(azimuths.len() >= 2, "multi-directional hillshade requires at least 2 azimuths");
    let layers: Vec<ByteGrid> = azimuths
        .iter()
        .map(|&az| hillshade(dtm, HillshadeParams { azimuth_degrees: az, altitude_degrees, z_factor }))
        .collect();
    combine_mean(dtm, &layers)
}

/// RGB-composite mode assigns three azimuths to R/G/B; returned as three
/// separate byte grids since this workspace's raster type is single-band.
pub fn rgb_composite(dtm: &raster::ElevationGrid, azimuths: [f64; 3], altitude_degrees: f64, z_factor: f64) -> [ByteGrid; 3] {
    let make = |az: f64| hillshade(dtm, HillshadeParams { azimuth_degrees: az, altitude_degrees, z_factor });
    [make(azimuths[0]), make(azimuths[1]), make(azimuths[2])]
}

fn combine_mean(dtm: &raster::ElevationGrid, layers: &[ByteGrid]) -> ByteGrid {
    let (w, h) = (dtm.width(), dtm.height());
    let mut data = vec![NODATA_U8; w * h];
    for row in 0..h {
        for col in 0..w {
            let mut sum = 0u32;
            let mut count = 0u32;
            for layer in layers {
                let v = layer.get(col, row);
                if !v.is_nodata() {
                    sum += v as u32;
                    count += 1;
                }
            }
            if count > 0 {
                data[row * w + col] = (sum / count) as u8;
            }
        }
    }
    ByteGrid::from_vec(dtm.meta.clone(), data)
}

fn shade_at(dtm: &raster::ElevationGrid, col: usize, row: usize, params: HillshadeParams) -> Option<u8> {
    let (dzdx, dzdy) = horn_gradient(dtm, col, row)?;
    let (dzdx, dzdy) = (dzdx * params.z_factor, dzdy * params.z_factor);

    let zenith = (90.0 - params.altitude_degrees).to_radians();
    let azimuth = params.azimuth_degrees.to_radians();
    let slope_rad = (dzdx * dzdx + dzdy * dzdy).sqrt().atan();
    let aspect_rad = dzdy.atan2(-dzdx);

    let cos_incidence = zenith.cos() * slope_rad.cos() + zenith.sin() * slope_rad.sin() * (azimuth - aspect_rad).cos();
    let shade = (cos_incidence.max(0.0) * 255.0).round();
    Some(shade.clamp(0.0, 254.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};
    use raster::ElevationGrid;

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn edge_pixels_are_nodata() {
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        let hs = hillshade(&dtm, HillshadeParams::default());
        assert!(hs.get(0, 0).is_nodata());
        assert!(!hs.get(1, 1).is_nodata());
    }

    #[test]
    fn multi_directional_combines_at_least_two_layers() {
        let dtm = ElevationGrid::filled(meta(3, 3), 5.0);
        let combined = multi_directional(&dtm, &[0.0, 90.0, 180.0], 45.0, 1.0);
        assert!(combined.get(1, 1) <= 255);
    }
}
