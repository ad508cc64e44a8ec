/// Mask -> polygon vectorization. Traces the boundary of
/// the valid-cell region via edge cancellation (adjacent valid cells share
/// an edge traversed in opposite directions, so only the outer/inner
/// boundary edges survive), then simplifies and filters small rings.
use crate::error::FootprintError;
use geo::{Area, Simplify};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use raster::ByteGrid;
use std::collections::HashMap;

pub const DEFAULT_SIMPLIFY_TOLERANCE_M: f64 = 0.5;
pub const DEFAULT_MIN_RING_AREA_M2: f64 = 100.0;

type PixelVertex = (i64, i64);

/// Vectorizes `mask`'s cells equal to 1 into a (multi-)polygon in the mask's
/// CRS, simplified at `tolerance` and with rings smaller than `min_area`
/// dropped. Returns `footprint_degenerate` if nothing survives.
pub fn vectorize_mask(mask: &ByteGrid, tolerance: f64, min_area: f64) -> Result<MultiPolygon<f64>, FootprintError> {
    let edges = boundary_edges(mask);
    if edges.is_empty() {
        return Err(FootprintError::FootprintDegenerate("no boundary edges in validity mask".into()));
    }

    let rings = trace_rings(edges);
    let mut exteriors: Vec<LineString<f64>> = Vec::new();
    let mut interiors: Vec<LineString<f64>> = Vec::new();

    for ring_px in rings {
        let world_ring: Vec<Coord<f64>> = ring_px
            .iter()
            .map(|&(c, r)| {
                let (x, y) = mask.meta.affine.pixel_to_world(c as f64, r as f64);
                Coord { x, y }
            })
            .collect();
        let ring = LineString::new(world_ring);
        let simplified = ring.simplify(&tolerance);
        let area = simplified.signed_area().abs();
        if area < min_area {
            continue;
        }
        if ring.signed_area() >= 0.0 {
            exteriors.push(simplified);
        } else {
            interiors.push(simplified);
        }
    }

    if exteriors.is_empty() {
        return Err(FootprintError::FootprintDegenerate(format!(
            "every traced ring fell below the minimum area of {min_area} m^2"
        )));
    }

    let polygons: Vec<Polygon<f64>> = exteriors
        .into_iter()
        .map(|ext| {
            let holes: Vec<LineString<f64>> = interiors
                .iter()
                .filter(|hole| ring_bbox_inside(hole, &ext))
                .cloned()
                .collect();
            Polygon::new(ext, holes)
        })
        .collect();
    Ok(MultiPolygon::new(polygons))
}

fn ring_bbox_inside(hole: &LineString<f64>, exterior: &LineString<f64>) -> bool {
    use geo::BoundingRect;
    match (hole.bounding_rect(), exterior.bounding_rect()) {
        (Some(h), Some(e)) => e.min().x <= h.min().x && e.min().y <= h.min().y && e.max().x >= h.max().x && e.max().y >= h.max().y,
        _ => false,
    }
}

/// Directed unit-square edges per valid cell, canceling any edge that's
/// also present in the opposite direction (i.e. shared with another valid
/// cell). What remains is exactly the region's boundary.
fn boundary_edges(mask: &ByteGrid) -> HashMap<PixelVertex, PixelVertex> {
    let mut counts: HashMap<(PixelVertex, PixelVertex), i32> = HashMap::new();
    for row in 0..mask.height() {
        for col in 0..mask.width() {
            if mask.get(col, row) != 1 {
                continue;
            }
            let (c, r) = (col as i64, row as i64);
            let corners = [(c, r), (c + 1, r), (c + 1, r + 1), (c, r + 1)];
            for i in 0..4 {
                let from = corners[i];
                let to = corners[(i + 1) % 4];
                *counts.entry((from, to)).or_insert(0) += 1;
            }
        }
    }

    let mut next: HashMap<PixelVertex, PixelVertex> = HashMap::new();
    for (&(from, to), &count) in counts.iter() {
        let reverse_count = counts.get(&(to, from)).copied().unwrap_or(0);
        if count > reverse_count {
            next.insert(from, to);
        }
    }
    next
}

/// Walks `next` (vertex -> next vertex) into closed loops.
fn trace_rings(mut next: HashMap<PixelVertex, PixelVertex>) -> Vec<Vec<PixelVertex>> {
    let mut rings = Vec::new();
    while let Some(&start) = next.keys().next() {
        let mut ring = vec![start];
        let mut current = start;
        loop {
            let Some(n) = next.remove(&current) else { break };
            current = n;
            if current == start {
                ring.push(start);
                break;
            }
            ring.push(current);
        }
        if ring.len() > 3 {
            rings.push(ring);
        }
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::{Affine, BandDType, Crs, GridMeta};

    fn solid_square_mask(size: usize) -> ByteGrid {
        let meta = GridMeta::new(Affine::north_up(0.0, size as f64, 1.0, 1.0), size, size, Crs::epsg(32633), BandDType::Byte);
        ByteGrid::filled(meta, 1)
    }

    #[test]
    fn solid_mask_vectorizes_to_one_exterior_ring() {
        let mask = solid_square_mask(10);
        let multi = vectorize_mask(&mask, 0.1, 1.0).unwrap();
        assert_eq!(multi.0.len(), 1);
        assert!(multi.0[0].exterior().signed_area().abs() > 50.0);
    }

    #[test]
    fn empty_mask_is_footprint_degenerate() {
        let meta = GridMeta::new(Affine::north_up(0.0, 5.0, 1.0, 1.0), 5, 5, Crs::epsg(32633), BandDType::Byte);
        let mask = ByteGrid::nodata_filled(meta);
        let err = vectorize_mask(&mask, 0.1, 1.0).unwrap_err();
        assert!(matches!(err, FootprintError::FootprintDegenerate(_)));
    }
}
