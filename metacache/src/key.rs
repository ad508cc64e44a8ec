/// Cache key: a cloud's path plus the mtime/size pair that invalidates an
/// entry when the file on disk changes underneath it.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::MetacacheError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CloudKey {
    pub path: PathBuf,
    pub mtime_unix_nanos: i128,
    pub size: u64,
}

impl CloudKey {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MetacacheError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        let mtime = metadata.modified()?;
        let mtime_unix_nanos = mtime
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos() as i128)
            .unwrap_or_else(|e| -(e.duration().as_nanos() as i128));
        Ok(Self {
            path: path.to_path_buf(),
            mtime_unix_nanos,
            size: metadata.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn key_changes_when_file_contents_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.laz");
        {
            let mut f = fs::File::create(&path).unwrap();
            f.write_all(b"abc").unwrap();
        }
        let k1 = CloudKey::from_path(&path).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        {
            let mut f = fs::File::create(&path).unwrap();
            f.write_all(b"abcdef").unwrap();
        }
        let k2 = CloudKey::from_path(&path).unwrap();
        assert_ne!(k1, k2);
    }
}
