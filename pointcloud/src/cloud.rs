/// LAS/LAZ point cloud access. A `PointCloud` is an immutable
/// path plus lazily-discovered metadata; the points themselves are never
/// fully materialized — every consumer streams.
use crate::error::PointCloudError;
use geo_primitives::{BoundingBox, Crs};
use las::Reader;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub classification: u8,
    pub return_number: u8,
    pub number_of_returns: u8,
}

impl Point {
    pub fn is_ground(&self) -> bool {
        self.classification == 2
    }

    pub fn is_first_return(&self) -> bool {
        self.return_number <= 1
    }
}

#[derive(Debug, Clone)]
pub struct PointCloud {
    path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CloudMetadata {
    pub bounds: BoundingBox,
    pub crs: Crs,
    pub point_count: u64,
    pub has_classification: bool,
}

impl PointCloud {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PointCloudError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PointCloudError::CloudNotFound(path.display().to_string()));
        }
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<Reader, PointCloudError> {
        Reader::from_path(&self.path).map_err(PointCloudError::from)
    }

    /// `bounds_and_crs(cloud) -> (bbox, crs, point_count)`.
    /// Idempotent: reads only the LAS header, never the point records.
    pub fn bounds_and_crs(&self) -> Result<CloudMetadata, PointCloudError> {
        let reader = self.reader()?;
        let header = reader.header();
        let version = header.version();
        if version.major != 1 || version.minor < 2 || version.minor > 4 {
            return Err(PointCloudError::UnsupportedLasVersion(format!(
                "{}.{}",
                version.major, version.minor
            )));
        }

        let epsg = header
            .vlrs()
            .iter()
            .find_map(|vlr| crate::crs_vlr::epsg_from_vlr(vlr))
            .ok_or_else(|| PointCloudError::CrsMissing(self.path.display().to_string()))?;

        let b = header.bounds();
        let bounds = BoundingBox::new(b.min.x, b.min.y, b.max.x, b.max.y);
        // Every LAS 1.2-1.4 point record format carries a classification byte;
        // header-only inspection can't say whether it was ever populated, so
        // this only promises "format supports it", not "ground points exist".
        let has_classification = true;
        Ok(CloudMetadata {
            bounds,
            crs: Crs::epsg(epsg),
            point_count: header.number_of_points(),
            has_classification,
        })
    }

    /// Streams every point through `visit`, in LAS file order, without
    /// materializing the whole cloud.
    pub fn for_each_point(&self, mut visit: impl FnMut(Point)) -> Result<(), PointCloudError> {
        let mut reader = self.reader()?;
        for wrapped in reader.points() {
            let p = wrapped?;
            visit(Point {
                x: p.x,
                y: p.y,
                z: p.z,
                classification: u8::from(p.classification),
                return_number: p.return_number,
                number_of_returns: p.number_of_returns,
            });
        }
        Ok(())
    }

    pub fn point_count(&self) -> Result<u64, PointCloudError> {
        Ok(self.reader()?.header().number_of_points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_file_fails_with_cloud_not_found() {
        let err = PointCloud::open("/nonexistent/path/does-not-exist.laz").unwrap_err();
        assert!(matches!(err, PointCloudError::CloudNotFound(_)));
    }

    #[test]
    fn point_ground_classification_matches_asprs_code_two() {
        let p = Point {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            classification: 2,
            return_number: 1,
            number_of_returns: 1,
        };
        assert!(p.is_ground());
        assert!(p.is_first_return());
    }
}
