/// Disk-backed append-or-replace log for `MetadataCache`. Each line is one
/// JSON record; loading replays the log and keeps only the last record per
/// key, so a replace is just another append — no in-place rewrite, no
/// compaction.
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MetacacheError;
use crate::key::CloudKey;
use crate::store::{CacheEntry, MetadataCache};

#[derive(Serialize, Deserialize)]
struct LogRecord {
    key: CloudKeyRecord,
    entry: CacheEntry,
}

#[derive(Serialize, Deserialize)]
struct CloudKeyRecord {
    path: String,
    mtime_unix_nanos: i128,
    size: u64,
}

impl From<&CloudKey> for CloudKeyRecord {
    fn from(k: &CloudKey) -> Self {
        Self { path: k.path.display().to_string(), mtime_unix_nanos: k.mtime_unix_nanos, size: k.size }
    }
}

/// Replays `log_path` into a fresh `MetadataCache` that also appends future
/// entries back to the same file. Missing file means an empty cache, not
/// an error — the very first run of a region has no log.
pub fn load(log_path: impl AsRef<Path>) -> Result<MetadataCache, MetacacheError> {
    let log_path = log_path.as_ref();
    let cache = MetadataCache::with_log(log_path);
    if !log_path.exists() {
        return Ok(cache);
    }
    let file = File::open(log_path)?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: LogRecord = serde_json::from_str(&line).map_err(|e| MetacacheError::Corrupt(e.to_string()))?;
        let key = CloudKey {
            path: record.key.path.into(),
            mtime_unix_nanos: record.key.mtime_unix_nanos,
            size: record.key.size,
        };
        cache.replace(key, record.entry);
    }
    Ok(cache)
}

/// Appends one record for `(key, entry)`. The single writer serializes
/// appends by holding `&mut` over the log file for the duration of the call.
pub fn append(log_path: impl AsRef<Path>, key: &CloudKey, entry: &CacheEntry) -> Result<(), MetacacheError> {
    let record = LogRecord { key: key.into(), entry: entry.clone() };
    let line = serde_json::to_string(&record).map_err(|e| MetacacheError::Corrupt(e.to_string()))?;
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{BoundingBox, Crs};

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            bounds: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            crs: Crs::epsg(32633),
            point_count: 100,
            has_classification: false,
        }
    }

    #[test]
    fn load_of_missing_log_is_an_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = load(dir.path().join("missing.log")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn append_then_load_recovers_the_latest_entry_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("cache.log");
        let key = CloudKey { path: "/clouds/a.laz".into(), mtime_unix_nanos: 1, size: 100 };

        append(&log_path, &key, &sample_entry()).unwrap();
        let mut replaced = sample_entry();
        replaced.point_count = 200;
        append(&log_path, &key, &replaced).unwrap();

        let cache = load(&log_path).unwrap();
        assert_eq!(cache.len(), 1);
        let restored = cache.snapshot_by_key(&key).unwrap();
        assert_eq!(restored.point_count, 200);
    }
}
