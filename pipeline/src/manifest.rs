/// Per-artifact JSON manifest: `{fingerprint, product_kind,
/// parameters, inputs, produced_at, producer_version}`. Written and read
/// atomically the same way `raster::io` writes GeoTIFFs — temp file, then
/// rename — so a reader never observes a half-written manifest.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineBuildError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRef {
    pub path: PathBuf,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub fingerprint: String,
    pub product_kind: String,
    pub parameters: serde_json::Value,
    pub inputs: Vec<InputRef>,
    pub produced_at_unix_secs: i64,
    pub producer_version: String,
}

pub const PRODUCER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn content_hash(path: &Path) -> Result<String, PipelineBuildError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn manifest_path(manifests_dir: &Path, fingerprint: &str) -> PathBuf {
    manifests_dir.join(format!("{fingerprint}.json"))
}

pub fn write_manifest(manifests_dir: &Path, manifest: &Manifest) -> Result<(), PipelineBuildError> {
    fs::create_dir_all(manifests_dir)?;
    let path = manifest_path(manifests_dir, &manifest.fingerprint);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_vec_pretty(manifest)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

pub fn read_manifest(manifests_dir: &Path, fingerprint: &str) -> Option<Manifest> {
    let path = manifest_path(manifests_dir, fingerprint);
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// An artifact is reusable when its manifest exists, names this exact
/// fingerprint, and the artifact file it describes is still present
/// — an artifact exists with a matching manifest.
pub fn artifact_is_fresh(manifests_dir: &Path, fingerprint: &str, artifact_path: &Path) -> bool {
    match read_manifest(manifests_dir, fingerprint) {
        Some(m) => m.fingerprint == fingerprint && artifact_path.exists(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            fingerprint: "abc123".into(),
            product_kind: "dtm".into(),
            parameters: serde_json::json!({"resolution_m": 1.0}),
            inputs: vec![InputRef { path: "in.las".into(), content_hash: "deadbeef".into() }],
            produced_at_unix_secs: 0,
            producer_version: PRODUCER_VERSION.into(),
        };
        write_manifest(dir.path(), &manifest).unwrap();
        let read_back = read_manifest(dir.path(), "abc123").unwrap();
        assert_eq!(read_back.fingerprint, manifest.fingerprint);
    }

    #[test]
    fn missing_manifest_is_not_fresh() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!artifact_is_fresh(dir.path(), "nope", Path::new("/nonexistent")));
    }
}
