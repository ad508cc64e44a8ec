/// Read-only region introspection, for a user who wants to ask what exists
/// without triggering a build. Every function here only reads what
/// `Orchestrator::build` already persisted -- manifests and artifacts -- and
/// never touches the lock directory or the point cloud itself beyond the
/// metadata cache's already-cached header read.
use std::path::PathBuf;

use geo_primitives::{BoundingBox, Crs};
use metacache::MetadataCache;
use serde::Serialize;

use crate::error::PipelineBuildError;
use crate::layout::RegionLayout;
use crate::manifest::{self, Manifest};
use crate::types::{Mode, ProductKind, Region};

#[derive(Debug, Clone, Serialize)]
pub struct RegionDescription {
    pub name: String,
    pub source_cloud: PathBuf,
    pub bounds: BoundingBox,
    pub crs: Crs,
    pub point_count: u64,
    pub artifact_count: usize,
    pub last_built_at_unix_secs: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub product: ProductKind,
    pub mode: Mode,
    pub fingerprint: String,
    pub path: PathBuf,
    pub produced_at_unix_secs: i64,
}

/// Bounds/CRS/point-count straight from the metadata cache (recomputing it
/// if this is the first time this cloud has been touched), plus a summary
/// of what's already on disk for this region.
pub fn describe_region(
    region: &Region,
    layout: &RegionLayout,
    cache: &MetadataCache,
) -> Result<RegionDescription, PipelineBuildError> {
    let entry = cache.get_or_compute(&region.source_cloud).map_err(|e| PipelineBuildError::External(e.to_string()))?;
    let artifacts = list_artifacts(layout, None)?;
    let last_built_at = artifacts.iter().map(|a| a.produced_at_unix_secs).max();

    Ok(RegionDescription {
        name: region.name.clone(),
        source_cloud: region.source_cloud.clone(),
        bounds: entry.bounds,
        crs: entry.crs,
        point_count: entry.point_count,
        artifact_count: artifacts.len(),
        last_built_at_unix_secs: last_built_at,
    })
}

/// Every artifact whose manifest is still fresh against the artifact file
/// it describes, optionally restricted to one product kind. Walks the
/// manifest directory rather than the catalog of `ProductKind`s, so an
/// artifact from a mode or product this build of the binary no longer
/// recognizes is silently skipped instead of erroring the whole scan.
pub fn list_artifacts(layout: &RegionLayout, filter: Option<ProductKind>) -> Result<Vec<ArtifactSummary>, PipelineBuildError> {
    let manifests_dir = layout.manifests_dir();
    if !manifests_dir.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(&manifests_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let bytes = std::fs::read(&path)?;
        let Ok(record) = serde_json::from_slice::<Manifest>(&bytes) else { continue };
        let Some(product) = ProductKind::parse(&record.product_kind) else { continue };
        if let Some(wanted) = filter {
            if wanted != product {
                continue;
            }
        }

        for mode in [Mode::Standard, Mode::Clean] {
            let artifact_path = layout.artifact_path(product, mode);
            if manifest::artifact_is_fresh(&manifests_dir, &record.fingerprint, &artifact_path) {
                found.push(ArtifactSummary {
                    product,
                    mode,
                    fingerprint: record.fingerprint.clone(),
                    path: artifact_path,
                    produced_at_unix_secs: record.produced_at_unix_secs,
                });
                break;
            }
        }
    }
    Ok(found)
}

/// The standard-mode footprint GeoJSON path, if a footprint has ever been
/// built for this region. `None` rather than an error when absent: "no
/// footprint yet" is routine, not a failure.
pub fn region_footprint(layout: &RegionLayout) -> Option<PathBuf> {
    let candidate = layout.artifact_path(ProductKind::Footprint, Mode::Standard);
    candidate.exists().then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_artifacts_on_a_fresh_region_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RegionLayout::new(dir.path(), "site-a");
        let found = list_artifacts(&layout, None).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn list_artifacts_finds_a_manifest_with_a_matching_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RegionLayout::new(dir.path(), "site-a");
        let artifact_path = layout.artifact_path(ProductKind::Dtm, Mode::Standard);
        std::fs::create_dir_all(artifact_path.parent().unwrap()).unwrap();
        std::fs::write(&artifact_path, b"fake tif").unwrap();

        let record = Manifest {
            fingerprint: "fp1".into(),
            product_kind: "dtm".into(),
            parameters: serde_json::json!({}),
            inputs: vec![],
            produced_at_unix_secs: 42,
            producer_version: "0.1.0".into(),
        };
        manifest::write_manifest(&layout.manifests_dir(), &record).unwrap();

        let found = list_artifacts(&layout, Some(ProductKind::Dtm)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fingerprint, "fp1");
        assert_eq!(found[0].mode, Mode::Standard);
    }
}
