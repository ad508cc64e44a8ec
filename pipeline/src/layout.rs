/// Canonical per-region output layout. The orchestrator is the
/// only component that mutates this tree; producers never write outside
/// the subtree their `ProductKind` names.
use std::path::{Path, PathBuf};

use crate::types::{Mode, ProductKind};

pub struct RegionLayout {
    root: PathBuf,
    region: String,
}

impl RegionLayout {
    pub fn new(output_root: impl AsRef<Path>, region: &str) -> Self {
        Self { root: output_root.as_ref().join(region), region: region.to_string() }
    }

    pub fn region_dir(&self) -> &Path {
        &self.root
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join("manifests")
    }

    pub fn png_dir(&self) -> PathBuf {
        self.root.join("png")
    }

    pub fn cropped_cloud_path(&self, mode: Mode) -> PathBuf {
        self.root.join("cropped").join(format!("{}_cropped{}.las", self.region, mode.suffix()))
    }

    /// GeoTIFF/GeoJSON/LAS artifact path for a non-rendered or raster node.
    pub fn artifact_path(&self, product: ProductKind, mode: Mode) -> PathBuf {
        let dir = self.root.join(product.output_subdir());
        let ext = match product {
            ProductKind::Footprint => "geojson",
            ProductKind::Crop => "las",
            _ => "tif",
        };
        let basename = match product {
            ProductKind::Density => format!("{}_density{}", self.region, mode.suffix()),
            ProductKind::Mask => format!("{}_valid_mask{}", self.region, mode.suffix()),
            ProductKind::Footprint => format!("{}_valid_footprint{}", self.region, mode.suffix()),
            ProductKind::Crop => format!("{}_cropped{}", self.region, mode.suffix()),
            other => format!("{}{}", other.as_str(), mode.suffix()),
        };
        dir.join(format!("{basename}.{ext}"))
    }

    /// Consolidated PNG path, `png/<product>.png`. Every mode
    /// shares the same `png/` directory; the `_clean` discriminator still
    /// applies to the basename.
    pub fn png_path(&self, product: ProductKind, mode: Mode, decorated: bool) -> PathBuf {
        let suffix = if decorated { "_decorated" } else { "" };
        self.png_dir().join(format!("{}{}{}.png", product.as_str(), mode.suffix(), suffix))
    }

    pub fn world_file_path(&self, product: ProductKind, mode: Mode, decorated: bool) -> PathBuf {
        self.png_path(product, mode, decorated).with_extension("pgw")
    }

    /// Scratch space for intermediate clouds a producer needs but never
    /// persists as a named artifact (e.g. the ground-classified cloud on
    /// the way to a DTM). Not part of the canonical layout spec names, so
    /// it lives under its own subdirectory rather than crowding `cropped/`.
    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.root.join("scratch").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_mode_suffixes_the_basename_not_the_directory() {
        let layout = RegionLayout::new("/out", "site-a");
        let standard = layout.artifact_path(ProductKind::Dtm, Mode::Standard);
        let clean = layout.artifact_path(ProductKind::Dtm, Mode::Clean);
        assert_eq!(standard.parent(), clean.parent());
        assert_ne!(standard, clean);
        assert!(clean.to_string_lossy().contains("dtm_clean"));
    }

    #[test]
    fn rasters_land_under_their_own_named_subdirectory() {
        let layout = RegionLayout::new("/out", "site-a");
        let path = layout.artifact_path(ProductKind::Slope, Mode::Standard);
        assert!(path.starts_with("/out/site-a/slope"));
    }
}
