/// Polygon crop (`clip_by_polygon`). Filters a
/// point cloud down to whatever falls inside an authoritative footprint
/// polygon, writing a new LAS/LAZ file with the surviving points.
use crate::cloud::PointCloud;
use crate::error::PointCloudError;
use geo::{Contains, Coord, LineString, Polygon};
use las::{Builder, Writer};
use std::path::Path;

/// `clip_by_polygon(cloud, polygon) -> cloud'`. An empty result
/// is a soft failure (`empty_output`), not an error here — the caller
/// decides whether that's fatal for the product it's building.
pub fn clip_by_polygon(
    cloud: &PointCloud,
    polygon: &Polygon<f64>,
    out_path: impl AsRef<Path>,
) -> Result<PointCloud, PointCloudError> {
    let out_path = out_path.as_ref();
    let reader = las::Reader::from_path(cloud.path())?;
    let header = Builder::from(reader.header().clone()).into_header()?;
    let mut writer = Writer::from_path(out_path, header)?;

    let mut kept = 0u64;
    cloud.for_each_point(|p| {
        if polygon.contains(&Coord { x: p.x, y: p.y }) {
            let record = las::point::Point {
                x: p.x,
                y: p.y,
                z: p.z,
                return_number: p.return_number,
                number_of_returns: p.number_of_returns,
                classification: las::point::Classification::new(p.classification)
                    .unwrap_or(las::point::Classification::new(0).expect("code 0 is always valid")),
                ..Default::default()
            };
            if writer.write_point(record).is_ok() {
                kept += 1;
            }
        }
    })?;
    drop(writer);

    if kept == 0 {
        return Err(PointCloudError::EmptyOutput(format!(
            "clip_by_polygon: every point in {} fell outside the crop polygon",
            cloud.path().display()
        )));
    }
    PointCloud::open(out_path)
}

/// Builds a simple (non-multi) polygon from an ordered ring of world
/// coordinates, closing the ring if the caller didn't already.
pub fn polygon_from_ring(mut ring: Vec<(f64, f64)>) -> Polygon<f64> {
    if ring.first() != ring.last() {
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
    }
    let coords: Vec<Coord<f64>> = ring.into_iter().map(|(x, y)| Coord { x, y }).collect();
    Polygon::new(LineString::new(coords), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_from_ring_closes_open_rings() {
        let poly = polygon_from_ring(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let ext = poly.exterior();
        assert_eq!(ext.0.first(), ext.0.last());
    }

    #[test]
    fn square_polygon_contains_center_point() {
        let poly = polygon_from_ring(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(poly.contains(&Coord { x: 5.0, y: 5.0 }));
        assert!(!poly.contains(&Coord { x: 50.0, y: 50.0 }));
    }
}
