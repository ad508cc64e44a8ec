/// Ground classification: `ground_classify(cloud, params) -> cloud'`.
/// Implements a progressive morphological filter (pmf), a simple cloth
/// simulation filter (csf), and a spline-smoothed variant (smrf) sharing the
/// same coarse-grid erosion/dilation core.
use crate::cloud::{Point, PointCloud};
use crate::error::PointCloudError;
use indicatif::{ProgressBar, ProgressStyle};
use las::{Builder, Classification, Writer};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    Csf { cloth_resolution: f64, rigidness: u32, max_iterations: u32 },
    Pmf { cell_size: f64, max_window: f64, slope: f64, initial_distance: f64, max_distance: f64 },
    Smrf { cell_size: f64, slope_threshold: f64, window_radii: Vec<f64> },
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Pmf {
            cell_size: 1.0,
            max_window: 20.0,
            slope: 0.15,
            initial_distance: 0.5,
            max_distance: 3.0,
        }
    }
}

const ASPRS_GROUND: u8 = 2;
const ASPRS_UNCLASSIFIED: u8 = 1;
const MIN_POINTS_FOR_CLASSIFICATION: usize = 16;

/// Runs `algorithm` over every point in `cloud` and writes a new LAS/LAZ file
/// at `out_path` with `classification` rewritten to ground (2) or
/// unclassified (1). Points keep their original coordinates and returns.
pub fn ground_classify(
    cloud: &PointCloud,
    algorithm: Algorithm,
    out_path: impl AsRef<Path>,
) -> Result<PointCloud, PointCloudError> {
    let total = cloud.point_count().unwrap_or(0);
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} points ({percent}%) {msg}")
            .unwrap()
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Loading points for ground classification");

    let mut points = Vec::new();
    let mut loaded = 0u64;
    cloud.for_each_point(|p| {
        points.push(p);
        loaded += 1;
        if loaded % 50_000 == 0 {
            pb.set_position(loaded);
        }
    })?;
    pb.finish_with_message("Points loaded");

    if points.len() < MIN_POINTS_FOR_CLASSIFICATION {
        return Err(PointCloudError::InsufficientPoints(points.len()));
    }

    let ground_mask = match algorithm {
        Algorithm::Pmf { cell_size, max_window, slope, initial_distance, max_distance } => {
            progressive_morphological_filter(&points, cell_size, max_window, slope, initial_distance, max_distance)
        }
        Algorithm::Csf { cloth_resolution, rigidness, max_iterations } => {
            cloth_simulation_filter(&points, cloth_resolution, rigidness, max_iterations)
        }
        Algorithm::Smrf { cell_size, slope_threshold, window_radii } => {
            simple_morphological_filter(&points, cell_size, slope_threshold, &window_radii)
        }
    };

    write_classified(cloud.path(), &points, &ground_mask, out_path.as_ref())?;
    PointCloud::open(out_path)
}

/// Progressive morphological filter (Zhang et al. 2003): repeatedly erode
/// then dilate a coarse min-elevation surface with a growing window,
/// flagging a point as ground when its height above the surface stays below
/// a slope-scaled threshold throughout.
fn progressive_morphological_filter(
    points: &[Point],
    cell_size: f64,
    max_window: f64,
    slope: f64,
    initial_distance: f64,
    max_distance: f64,
) -> Vec<bool> {
    let (cols, rows, min_x, min_y) = grid_dims(points, cell_size);
    let mut surface = min_surface(points, cols, rows, min_x, min_y, cell_size);

    let mut window = cell_size;
    while window <= max_window {
        let eroded = morphological_pass(&surface, cols, rows, window, cell_size, f32::max, f32::MIN);
        let opened = morphological_pass(&eroded, cols, rows, window, cell_size, f32::min, f32::MAX);
        let threshold = (initial_distance + slope * window) as f32;
        let threshold = threshold.min(max_distance as f32);
        for i in 0..surface.len() {
            if surface[i].is_finite() && opened[i].is_finite() && surface[i] - opened[i] > threshold {
                surface[i] = opened[i];
            }
        }
        window *= 2.0;
    }

    points
        .iter()
        .map(|p| {
            let idx = cell_index(p.x, p.y, min_x, min_y, cell_size, cols, rows);
            match idx {
                Some(i) if surface[i].is_finite() => (p.z as f32 - surface[i]).abs() <= max_distance as f32,
                _ => false,
            }
        })
        .collect()
}

/// Cloth-simulation filter approximation: drapes a rigid grid from above and
/// lets it settle toward the point cloud under a fixed number of relaxation
/// iterations, capped by `rigidness`. Coarser but much cheaper than a real
/// physics solve; adequate for pre-filtering before DTM interpolation.
fn cloth_simulation_filter(points: &[Point], cloth_resolution: f64, rigidness: u32, max_iterations: u32) -> Vec<bool> {
    let (cols, rows, min_x, min_y) = grid_dims(points, cloth_resolution);
    let ground_surface = min_surface(points, cols, rows, min_x, min_y, cloth_resolution);
    let mut cloth = vec![f32::MAX; cols * rows];
    for c in cloth.iter_mut() {
        if *c == f32::MAX {
            *c = ground_surface.iter().copied().filter(|v| v.is_finite()).fold(f32::MAX, f32::min);
        }
    }

    for _ in 0..max_iterations {
        for i in 0..cloth.len() {
            if ground_surface[i].is_finite() {
                let pull = (ground_surface[i] - cloth[i]) / rigidness.max(1) as f32;
                cloth[i] += pull;
                if cloth[i] > ground_surface[i] {
                    cloth[i] = ground_surface[i];
                }
            }
        }
    }

    points
        .iter()
        .map(|p| {
            let idx = cell_index(p.x, p.y, min_x, min_y, cloth_resolution, cols, rows);
            match idx {
                Some(i) if cloth[i].is_finite() => (p.z as f32 - cloth[i]).abs() <= cloth_resolution as f32 * 2.0,
                _ => false,
            }
        })
        .collect()
}

/// Simple morphological/SMRF-style pass over a ladder of window radii,
/// tightening the allowed slope-scaled residual at each step.
fn simple_morphological_filter(points: &[Point], cell_size: f64, slope_threshold: f64, window_radii: &[f64]) -> Vec<bool> {
    let (cols, rows, min_x, min_y) = grid_dims(points, cell_size);
    let mut surface = min_surface(points, cols, rows, min_x, min_y, cell_size);
    let radii = if window_radii.is_empty() { &[1.0, 2.0, 4.0, 8.0][..] } else { window_radii };

    for &radius in radii {
        let opened = morphological_pass(&surface, cols, rows, radius, cell_size, f32::min, f32::MAX);
        let threshold = (slope_threshold * radius) as f32;
        for i in 0..surface.len() {
            if surface[i].is_finite() && opened[i].is_finite() && surface[i] - opened[i] > threshold {
                surface[i] = opened[i];
            }
        }
    }

    points
        .iter()
        .map(|p| {
            let idx = cell_index(p.x, p.y, min_x, min_y, cell_size, cols, rows);
            match idx {
                Some(i) if surface[i].is_finite() => (p.z as f32 - surface[i]).abs() <= slope_threshold as f32 * 4.0,
                _ => false,
            }
        })
        .collect()
}

fn grid_dims(points: &[Point], cell_size: f64) -> (usize, usize, f64, f64) {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let cols = (((max_x - min_x) / cell_size).ceil() as usize + 1).max(1);
    let rows = (((max_y - min_y) / cell_size).ceil() as usize + 1).max(1);
    (cols, rows, min_x, min_y)
}

fn cell_index(x: f64, y: f64, min_x: f64, min_y: f64, cell_size: f64, cols: usize, rows: usize) -> Option<usize> {
    let col = ((x - min_x) / cell_size) as usize;
    let row = ((y - min_y) / cell_size) as usize;
    if col < cols && row < rows {
        Some(row * cols + col)
    } else {
        None
    }
}

fn min_surface(points: &[Point], cols: usize, rows: usize, min_x: f64, min_y: f64, cell_size: f64) -> Vec<f32> {
    let mut surface = vec![f32::MAX; cols * rows];
    for p in points {
        if let Some(idx) = cell_index(p.x, p.y, min_x, min_y, cell_size, cols, rows) {
            if (p.z as f32) < surface[idx] {
                surface[idx] = p.z as f32;
            }
        }
    }
    for v in surface.iter_mut() {
        if *v == f32::MAX {
            *v = f32::NAN;
        }
    }
    surface
}

/// Grid erosion/dilation with a square structuring element sized by `window`
/// (in world units), reducing each cell to `reduce` over its neighborhood.
fn morphological_pass(
    surface: &[f32],
    cols: usize,
    rows: usize,
    window: f64,
    cell_size: f64,
    reduce: fn(f32, f32) -> f32,
    identity: f32,
) -> Vec<f32> {
    let radius = ((window / cell_size) / 2.0).round().max(1.0) as i64;
    let mut out = vec![f32::NAN; cols * rows];
    for row in 0..rows as i64 {
        for col in 0..cols as i64 {
            let mut acc = identity;
            let mut any = false;
            for dr in -radius..=radius {
                for dc in -radius..=radius {
                    let (r, c) = (row + dr, col + dc);
                    if r >= 0 && r < rows as i64 && c >= 0 && c < cols as i64 {
                        let v = surface[(r as usize) * cols + c as usize];
                        if v.is_finite() {
                            acc = reduce(acc, v);
                            any = true;
                        }
                    }
                }
            }
            out[(row as usize) * cols + col as usize] = if any { acc } else { f32::NAN };
        }
    }
    out
}

fn write_classified(
    source_path: &Path,
    points: &[Point],
    ground_mask: &[bool],
    out_path: &Path,
) -> Result<(), PointCloudError> {
    let reader = las::Reader::from_path(source_path)?;
    let builder = Builder::from(reader.header().clone());
    let header = builder.into_header()?;
    let mut writer = Writer::from_path(out_path, header)?;
    for (p, is_ground) in points.iter().zip(ground_mask.iter()) {
        let mut record = las::point::Point {
            x: p.x,
            y: p.y,
            z: p.z,
            return_number: p.return_number,
            number_of_returns: p.number_of_returns,
            ..Default::default()
        };
        record.classification = Classification::new(if *is_ground { ASPRS_GROUND } else { ASPRS_UNCLASSIFIED })
            .map_err(|e| PointCloudError::ExternalFailure(e.to_string()))?;
        writer.write_point(record)?;
    }
    drop(writer); // las::Writer flushes and finalizes the header on drop
    Ok(())
}

/// Writes a new LAS/LAZ file containing only already ground-classified
/// (ASPRS code 2) points, for when `ground_classify` can be skipped because
/// the source cloud already carries classification.
pub fn extract_ground(cloud: &PointCloud, out_path: impl AsRef<Path>) -> Result<PointCloud, PointCloudError> {
    let out_path = out_path.as_ref();
    let reader = las::Reader::from_path(cloud.path())?;
    let header = Builder::from(reader.header().clone()).into_header()?;
    let mut writer = Writer::from_path(out_path, header)?;

    let mut kept = 0u64;
    cloud.for_each_point(|p| {
        if p.is_ground() {
            let mut record = las::point::Point {
                x: p.x,
                y: p.y,
                z: p.z,
                return_number: p.return_number,
                number_of_returns: p.number_of_returns,
                ..Default::default()
            };
            record.classification = Classification::new(ASPRS_GROUND).expect("code 2 is always valid");
            if writer.write_point(record).is_ok() {
                kept += 1;
            }
        }
    })?;
    drop(writer);

    if kept == 0 {
        return Err(PointCloudError::EmptyOutput(format!(
            "extract_ground: no ground-classified points in {}",
            cloud.path().display()
        )));
    }
    PointCloud::open(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_plane_with_one_spike() -> Vec<Point> {
        let mut pts = Vec::new();
        for x in 0..10 {
            for y in 0..10 {
                pts.push(Point { x: x as f64, y: y as f64, z: 0.0, classification: 0, return_number: 1, number_of_returns: 1 });
            }
        }
        pts.push(Point { x: 5.0, y: 5.0, z: 10.0, classification: 0, return_number: 1, number_of_returns: 1 });
        pts
    }

    #[test]
    fn pmf_classifies_flat_plane_as_ground_and_spike_as_non_ground() {
        let points = flat_plane_with_one_spike();
        let mask = progressive_morphological_filter(&points, 1.0, 8.0, 0.15, 0.5, 3.0);
        let ground_count = mask.iter().filter(|&&g| g).count();
        assert!(ground_count >= 90, "expected most of the flat plane to be classified ground, got {ground_count}");
        assert!(!mask.last().unwrap(), "the elevated spike must not be classified ground");
    }

    #[test]
    fn grid_dims_covers_full_point_extent() {
        let points = flat_plane_with_one_spike();
        let (cols, rows, min_x, min_y) = grid_dims(&points, 1.0);
        assert!(cols >= 10 && rows >= 10);
        assert_eq!(min_x, 0.0);
        assert_eq!(min_y, 0.0);
    }
}
