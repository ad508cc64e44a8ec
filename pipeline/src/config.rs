/// Optional TOML config file, loaded once at startup and layered underneath
/// explicit CLI flags: a flag the user actually passed always wins, a config
/// file value fills in anything the user left at its CLI default, and the
/// hard-coded `BuildParams`/`PipelineOptions` defaults are the final
/// fallback. Grounded on the pack's `core-config` crate (`serde` + `toml`,
/// "missing file is not an error, just defaults").
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::params::BuildParams;
use crate::types::PipelineOptions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub resolution_m: Option<f64>,
    pub node_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub density_threshold: Option<u32>,
    pub simplify_tolerance_m: Option<f64>,
    pub min_ring_area_m2: Option<f64>,
    pub dtm_hole_fill_max_radius: Option<usize>,
    pub dtm_hole_fill_passes: Option<u32>,
    pub slope_z_factor: Option<f64>,
    pub aspect_flat_epsilon_degrees: Option<f64>,
    pub hillshade_azimuth_degrees: Option<f64>,
    pub hillshade_altitude_degrees: Option<f64>,
    pub hillshade_z_factor: Option<f64>,
    pub degrade_to_standard_on_empty_footprint: Option<bool>,
}

/// Reads `path` if given and present on disk; a missing path (the common
/// case — most invocations have no config file at all) yields the all-`None`
/// default rather than an error.
pub fn load(path: Option<&Path>) -> Result<PipelineConfig, String> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PipelineConfig::default()),
        Err(e) => return Err(format!("reading config file {}: {e}", path.display())),
    };
    toml::from_str(&content).map_err(|e| format!("parsing config file {}: {e}", path.display()))
}

impl PipelineConfig {
    /// Fills in `params`/`options` fields the CLI left at an unset `None`
    /// override. Fields the CLI already pinned down are never touched here.
    pub fn apply(&self, params: &mut BuildParams, options: &mut PipelineOptions) {
        if let Some(v) = self.resolution_m {
            options.resolution_m = v;
        }
        if let Some(v) = self.node_timeout_secs {
            options.node_timeout_secs = v;
        }
        if let Some(v) = self.max_retries {
            options.max_retries = v;
        }
        if let Some(v) = self.density_threshold {
            params.footprint.density_threshold = v;
        }
        if let Some(v) = self.simplify_tolerance_m {
            params.footprint.simplify_tolerance_m = v;
        }
        if let Some(v) = self.min_ring_area_m2 {
            params.footprint.min_ring_area_m2 = v;
        }
        if let Some(v) = self.dtm_hole_fill_max_radius {
            params.dtm_hole_fill_max_radius = v;
        }
        if let Some(v) = self.dtm_hole_fill_passes {
            params.dtm_hole_fill_passes = v;
        }
        if let Some(v) = self.slope_z_factor {
            params.slope_z_factor = v;
        }
        if let Some(v) = self.aspect_flat_epsilon_degrees {
            params.aspect_flat_epsilon_degrees = v;
        }
        if let Some(v) = self.hillshade_azimuth_degrees {
            params.hillshade.azimuth_degrees = v;
        }
        if let Some(v) = self.hillshade_altitude_degrees {
            params.hillshade.altitude_degrees = v;
        }
        if let Some(v) = self.hillshade_z_factor {
            params.hillshade.z_factor = v;
        }
        if let Some(v) = self.degrade_to_standard_on_empty_footprint {
            options.degrade_to_standard_on_empty_footprint = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_path_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load(Some(&dir.path().join("nonexistent.toml"))).unwrap();
        assert!(cfg.resolution_m.is_none());
    }

    #[test]
    fn no_config_path_yields_defaults() {
        let cfg = load(None).unwrap();
        assert!(cfg.max_retries.is_none());
    }

    #[test]
    fn loaded_values_override_only_their_own_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "resolution_m = 0.5\ndensity_threshold = 5\n").unwrap();
        let cfg = load(Some(&path)).unwrap();

        let mut params = BuildParams::default();
        let mut options = PipelineOptions::default();
        let original_passes = params.dtm_hole_fill_passes;
        cfg.apply(&mut params, &mut options);

        assert_eq!(options.resolution_m, 0.5);
        assert_eq!(params.footprint.density_threshold, 5);
        assert_eq!(params.dtm_hole_fill_passes, original_passes);
    }
}
