//! Cross-module contracts the orchestrator depends on but that don't need a
//! real point cloud or GDAL to exercise: DAG shape, fingerprint determinism,
//! manifest/layout freshness, and CLI argument resolution.
use clap::Parser;
use geo_primitives::{fingerprint, PipelineError};
use pipeline::cli::{Cli, Command};
use pipeline::dag;
use pipeline::layout::RegionLayout;
use pipeline::manifest::{self, InputRef, Manifest};
use pipeline::params::{canonical_params_for, BuildParams};
use pipeline::types::{Mode, ProductKind};

#[test]
fn clean_mode_resolution_puts_the_whole_crop_chain_before_every_requested_product() {
    let order = dag::resolve(&[ProductKind::Slope, ProductKind::Svf, ProductKind::Hillshade], true).unwrap();
    let crop_pos = order.iter().position(|p| *p == ProductKind::Crop).unwrap();
    for requested in [ProductKind::Slope, ProductKind::Svf, ProductKind::Hillshade, ProductKind::Dtm] {
        let pos = order.iter().position(|p| *p == requested).unwrap();
        assert!(crop_pos < pos, "{requested:?} should come after crop");
    }
    // density -> mask -> footprint -> crop, in that order, with no duplicates.
    let chain: Vec<_> = [ProductKind::Density, ProductKind::Mask, ProductKind::Footprint, ProductKind::Crop]
        .iter()
        .map(|p| order.iter().position(|o| o == p).unwrap())
        .collect();
    assert!(chain.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(order.iter().filter(|p| **p == ProductKind::Crop).count(), 1);
}

#[test]
fn standard_mode_never_pulls_in_the_footprint_chain() {
    let order = dag::resolve(&[ProductKind::Dtm, ProductKind::Chm], false).unwrap();
    assert!(!order.contains(&ProductKind::Density));
    assert!(!order.contains(&ProductKind::Mask));
    assert!(!order.contains(&ProductKind::Footprint));
    assert!(!order.contains(&ProductKind::Crop));
}

/// Mirrors the fingerprint assembly `Orchestrator::build` performs: cloud
/// identity + product + mode suffix + canonical parameter bytes. Same
/// inputs must fingerprint identically across independent calls, and
/// changing the mode suffix (the clean-mode re-entry discriminator) alone
/// must change it.
#[test]
fn fingerprint_is_stable_for_identical_inputs_and_diverges_across_modes() {
    let params = BuildParams::default();
    let canonical = canonical_params_for(ProductKind::Dtm, &params, 1.0);
    let bytes = canonical.canonical_bytes();
    let cloud_identity = "/clouds/site-a.laz:120000".as_bytes();
    let product = ProductKind::Dtm.as_str().as_bytes();

    let fp_standard_a = fingerprint(&[cloud_identity, product, Mode::Standard.suffix().as_bytes(), &bytes]);
    let fp_standard_b = fingerprint(&[cloud_identity, product, Mode::Standard.suffix().as_bytes(), &bytes]);
    let fp_clean = fingerprint(&[cloud_identity, product, Mode::Clean.suffix().as_bytes(), &bytes]);

    assert_eq!(fp_standard_a, fp_standard_b);
    assert_ne!(fp_standard_a, fp_clean);
}

#[test]
fn an_artifact_is_fresh_only_when_its_manifest_and_file_both_match() {
    let dir = tempfile::tempdir().unwrap();
    let layout = RegionLayout::new(dir.path(), "site-a");
    let artifact_path = layout.artifact_path(ProductKind::Dtm, Mode::Standard);
    std::fs::create_dir_all(artifact_path.parent().unwrap()).unwrap();
    std::fs::write(&artifact_path, b"fake geotiff bytes").unwrap();

    let record = Manifest {
        fingerprint: "deadbeef".into(),
        product_kind: ProductKind::Dtm.as_str().to_string(),
        parameters: serde_json::json!({"resolution_m": 1.0}),
        inputs: vec![InputRef { path: "/clouds/site-a.laz".into(), content_hash: "cafebabe".into() }],
        produced_at_unix_secs: 1_700_000_000,
        producer_version: "0.1.0".into(),
    };
    manifest::write_manifest(&layout.manifests_dir(), &record).unwrap();

    assert!(manifest::artifact_is_fresh(&layout.manifests_dir(), "deadbeef", &artifact_path));
    // A different fingerprint for the same artifact file is never fresh.
    assert!(!manifest::artifact_is_fresh(&layout.manifests_dir(), "wrong-fingerprint", &artifact_path));
    // The clean-mode sibling path was never written, so it can't be fresh either.
    let clean_path = layout.artifact_path(ProductKind::Dtm, Mode::Clean);
    assert!(!manifest::artifact_is_fresh(&layout.manifests_dir(), "deadbeef", &clean_path));
}

fn parse_build(extra_args: &[&str]) -> pipeline::cli::BuildArgs {
    let mut argv = vec!["pipeline", "build", "--region", "site-a", "--cloud", "/clouds/site-a.laz"];
    argv.extend_from_slice(extra_args);
    let cli = Cli::try_parse_from(argv).unwrap();
    match cli.command {
        Command::Build(args) => args,
        other => panic!("expected Build, got {other:?}"),
    }
}

#[test]
fn build_args_default_to_the_full_requestable_catalog() {
    let args = parse_build(&[]);
    let products = args.resolve_products().unwrap();
    assert_eq!(products.len(), ProductKind::requestable().len());
    assert!(products.contains(&ProductKind::Dtm));
    assert!(!products.contains(&ProductKind::Density), "internal nodes are never directly requestable");
}

#[test]
fn build_args_rejects_an_unknown_product_name_before_any_build_work_starts() {
    let args = parse_build(&["--product", "not-a-real-product"]);
    assert!(args.resolve_products().is_err());
}

#[test]
fn a_dependency_failure_propagates_but_cancellation_does_not() {
    let dependency_failed = PipelineError::ExternalFailure("gdal driver unavailable".into());
    let cancelled = PipelineError::Cancelled;
    assert!(dependency_failed.propagates_to_dependents());
    assert!(!cancelled.propagates_to_dependents());
    assert!(dependency_failed.is_retryable());
}
