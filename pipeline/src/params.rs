/// Typed, canonicalizable parameter bag for every producer. One struct per
/// product kind, all bundled so the CLI and test harness can override any
/// of them without threading a dozen separate arguments.
use footprint::FootprintParams;
use geo_primitives::canonical::{CanonicalParams, CanonicalValue};
use relief::lrm::{FilterType as LrmFilterType, LrmParams};
use relief::svf::SvfParams;
use terrain::hillshade::HillshadeParams;
use terrain::neighborhood::TpiParams;

use crate::types::ProductKind;

#[derive(Debug, Clone)]
pub struct BuildParams {
    pub footprint: FootprintParams,
    pub dtm_hole_fill_max_radius: usize,
    pub dtm_hole_fill_passes: u32,
    pub slope_z_factor: f64,
    pub aspect_flat_epsilon_degrees: f64,
    pub hillshade: HillshadeParams,
    pub tpi: TpiParams,
    pub svf: SvfParams,
    pub lrm: LrmParams,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            footprint: FootprintParams::default(),
            dtm_hole_fill_max_radius: 100,
            dtm_hole_fill_passes: 2,
            slope_z_factor: 1.0,
            aspect_flat_epsilon_degrees: 0.01,
            hillshade: HillshadeParams::default(),
            tpi: TpiParams::default(),
            svf: SvfParams::default(),
            lrm: LrmParams::default(),
        }
    }
}

/// Canonical, sorted-key parameter record for one product kind, fed into
/// `geo_primitives::canonical::fingerprint` alongside the source cloud
/// identity, mode, and upstream fingerprints.
pub fn canonical_params_for(product: ProductKind, params: &BuildParams, resolution_m: f64) -> CanonicalParams {
    let p = CanonicalParams::new().with("resolution_m", CanonicalValue::from_f64(resolution_m));
    match product {
        ProductKind::Density => p,
        ProductKind::Mask => p.with("density_threshold", CanonicalValue::from_f64(params.footprint.density_threshold as f64)),
        ProductKind::Footprint => p
            .with("density_threshold", CanonicalValue::from_f64(params.footprint.density_threshold as f64))
            .with("simplify_tolerance_m", CanonicalValue::from_f64(params.footprint.simplify_tolerance_m))
            .with("min_ring_area_m2", CanonicalValue::from_f64(params.footprint.min_ring_area_m2)),
        ProductKind::Crop => p,
        ProductKind::Dtm => p
            .with("hole_fill_max_radius", CanonicalValue::from_f64(params.dtm_hole_fill_max_radius as f64))
            .with("hole_fill_passes", CanonicalValue::from_f64(params.dtm_hole_fill_passes as f64))
            .with("aggregator", CanonicalValue::from_str("tin")),
        ProductKind::Dsm => p.with("aggregator", CanonicalValue::from_str("max")),
        ProductKind::Chm => p,
        ProductKind::Slope => p.with("z_factor", CanonicalValue::from_f64(params.slope_z_factor)),
        ProductKind::Aspect => p.with("flat_epsilon_degrees", CanonicalValue::from_f64(params.aspect_flat_epsilon_degrees)),
        ProductKind::Hillshade => p
            .with("azimuth_degrees", CanonicalValue::from_f64(params.hillshade.azimuth_degrees))
            .with("altitude_degrees", CanonicalValue::from_f64(params.hillshade.altitude_degrees))
            .with("z_factor", CanonicalValue::from_f64(params.hillshade.z_factor))
            .with("formulation", CanonicalValue::from_str("horn")),
        ProductKind::Tpi => p
            .with("inner_radius", CanonicalValue::from_f64(params.tpi.inner_radius as f64))
            .with("outer_radius", CanonicalValue::from_f64(params.tpi.outer_radius as f64))
            .with("min_valid_for_mean", CanonicalValue::from_f64(params.tpi.min_valid_for_mean as f64)),
        ProductKind::Tri | ProductKind::Roughness => p,
        ProductKind::Svf => p
            .with("directions", CanonicalValue::from_f64(params.svf.directions as f64))
            .with("max_radius_cells", CanonicalValue::from_f64(params.svf.max_radius_cells as f64))
            .with("noise_reduction_passes", CanonicalValue::from_f64(params.svf.noise_reduction_passes as f64)),
        ProductKind::Lrm => {
            let filter = match params.lrm.filter_type {
                LrmFilterType::Uniform => "uniform",
                LrmFilterType::Gaussian => "gaussian",
            };
            let mut q = p
                .with("auto_sizing", CanonicalValue::from_bool(params.lrm.auto_sizing))
                .with("filter_type", CanonicalValue::from_str(filter))
                .with("enhanced_normalization", CanonicalValue::from_bool(params.lrm.enhanced_normalization))
                .with("percentile_low", CanonicalValue::from_f64(params.lrm.percentile_low))
                .with("percentile_high", CanonicalValue::from_f64(params.lrm.percentile_high));
            if let Some(w) = params.lrm.window_size {
                q = q.with("window_size", CanonicalValue::from_f64(w as f64));
            }
            q
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_params_ignore_irrelevant_fields_across_products() {
        let params = BuildParams::default();
        let a = canonical_params_for(ProductKind::Dtm, &params, 1.0);
        let b = canonical_params_for(ProductKind::Dtm, &params, 1.0);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn different_resolution_changes_canonical_bytes() {
        let params = BuildParams::default();
        let a = canonical_params_for(ProductKind::Dsm, &params, 1.0);
        let b = canonical_params_for(ProductKind::Dsm, &params, 2.0);
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }
}
