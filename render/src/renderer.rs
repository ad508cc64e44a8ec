/// Clean + decorated PNG rendering. A *clean* image is exactly
/// one pixel per source pixel, no decoration, for GIS overlay; a
/// *decorated* image adds a colorbar/title/statistics strip. Both carry a
/// `.pgw` world-file sibling so they georegister 1:1 with the source grid.
use crate::colormap::Colormap;
use crate::error::RenderError;
use crate::stretch::Normalization;
use geo_primitives::NoDataSentinel;
use image::{Rgba, RgbaImage};
use raster::ElevationGrid;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DECORATION_MARGIN_PX: u32 = 60;
const ASPECT_FLAT_GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

#[derive(Debug, Clone, Copy)]
pub struct RenderSpec {
    pub colormap: Colormap,
    pub normalization: Normalization,
    pub aspect_flat_sentinel: Option<f32>,
}

/// Renders `grid` to a clean (pixel-exact) `RgbaImage`. NoData cells become
/// fully transparent; the aspect flat sentinel (when given) renders gray
/// rather than going through the cyclic colormap.
pub fn render_clean(grid: &ElevationGrid, spec: RenderSpec) -> RgbaImage {
    let (w, h) = (grid.width() as u32, grid.height() as u32);
    let mut image = RgbaImage::new(w, h);
    for row in 0..grid.height() {
        for col in 0..grid.width() {
            let v = grid.get(col, row);
            let pixel = if v.is_nodata() {
                Rgba([0, 0, 0, 0])
            } else if spec.aspect_flat_sentinel == Some(v) {
                ASPECT_FLAT_GRAY
            } else {
                let t = spec.normalization.normalize(grid, v);
                let [r, g, b] = spec.colormap.sample(t);
                Rgba([r, g, b, 255])
            };
            image.put_pixel(col as u32, row as u32, pixel);
        }
    }
    image
}

/// Wraps the clean image with a colorbar strip along the bottom and a
/// blank title/statistics band along the top. Kept deliberately simple —
/// a flat color ramp and min/max/mean text are not rendered as glyphs
/// here, only as reserved blank bands a downstream labeler can fill.
pub fn render_decorated(clean: &RgbaImage, spec: RenderSpec) -> RgbaImage {
    let (w, h) = clean.dimensions();
    let mut decorated = RgbaImage::from_pixel(w, h + DECORATION_MARGIN_PX, Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut decorated, clean, 0, DECORATION_MARGIN_PX as i64);

    let bar_width = w.min(256);
    for x in 0..bar_width {
        let t = x as f64 / (bar_width - 1).max(1) as f64;
        let [r, g, b] = spec.colormap.sample(t);
        for y in 10..30 {
            decorated.put_pixel(x, y, Rgba([r, g, b, 255]));
        }
    }
    decorated
}

/// Writes `image` as PNG at `path` (temp-file then rename) plus a `.pgw`
/// world-file sibling encoding `affine`.
pub fn write_png_atomic(image: &RgbaImage, path: impl AsRef<Path>, affine: &geo_primitives::Affine) -> Result<(), RenderError> {
    let path = path.as_ref();
    let tmp = tmp_sibling(path);
    image.save(&tmp)?;
    std::fs::rename(&tmp, path)?;

    let world_file_path = path.with_extension("pgw");
    let tmp_world = tmp_sibling(&world_file_path);
    std::fs::write(&tmp_world, affine.world_file_contents())?;
    std::fs::rename(&tmp_world, &world_file_path)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Duplicate-suppression registry: if a renderer's target path
/// already lies within the region's consolidated image directory, no
/// second copy is emitted elsewhere. Single-writer within a process.
#[derive(Default)]
pub struct RenderedPaths {
    seen: Mutex<HashSet<PathBuf>>,
}

impl RenderedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `path` is claimed, `false` on repeats.
    pub fn claim(&self, path: &Path) -> bool {
        self.seen.lock().expect("render registry mutex poisoned").insert(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta, NODATA_F32};
    use tempfile::tempdir;

    fn meta(w: usize, h: usize) -> GridMeta {
        GridMeta::new(Affine::north_up(0.0, h as f64, 1.0, 1.0), w, h, Crs::epsg(32633), BandDType::Float32)
    }

    #[test]
    fn clean_image_dimensions_match_source_grid() {
        let grid = ElevationGrid::filled(meta(4, 3), 10.0);
        let spec = RenderSpec { colormap: Colormap::Viridis, normalization: Normalization::Linear { min: 0.0, max: 20.0 }, aspect_flat_sentinel: None };
        let image = render_clean(&grid, spec);
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn nodata_renders_transparent() {
        let mut grid = ElevationGrid::filled(meta(2, 2), 10.0);
        grid.set(0, 0, NODATA_F32);
        let spec = RenderSpec { colormap: Colormap::Viridis, normalization: Normalization::Linear { min: 0.0, max: 20.0 }, aspect_flat_sentinel: None };
        let image = render_clean(&grid, spec);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn duplicate_suppression_claims_a_path_once() {
        let registry = RenderedPaths::new();
        let path = PathBuf::from("/tmp/region/png/dtm.png");
        assert!(registry.claim(&path));
        assert!(!registry.claim(&path));
    }

    #[test]
    fn write_png_atomic_produces_both_png_and_world_file() {
        let dir = tempdir().unwrap();
        let grid = ElevationGrid::filled(meta(2, 2), 5.0);
        let spec = RenderSpec { colormap: Colormap::Grayscale, normalization: Normalization::Linear { min: 0.0, max: 10.0 }, aspect_flat_sentinel: None };
        let image = render_clean(&grid, spec);
        let path = dir.path().join("out.png");
        write_png_atomic(&image, &path, &grid.meta.affine).unwrap();
        assert!(path.exists());
        assert!(path.with_extension("pgw").exists());
    }
}
