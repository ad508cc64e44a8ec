/// One execution function per DAG node kind. Every function reads whatever
/// upstream artifacts it needs
/// straight back off disk rather than threading in-memory state through the
/// DAG — the orchestrator only calls a node DONE once its artifact and
/// manifest are both persisted, so disk is the single source of truth
/// between nodes (mirrors how `StreamManager` never hands a running stream
/// its predecessor's in-memory state, only its config).
use std::path::Path;

use geo_primitives::{BandDType, Crs, GridMeta, PipelineError};
use geo_types::MultiPolygon;
use pointcloud::PointCloud;
use raster::WriteOptions;
use tracing::info;

use crate::params::BuildParams;

/// Grid shared by every rasterized product for one region at one
/// resolution. Density's origin-snapping rule is the
/// canonical grid definition for this pipeline; every elevation and
/// derivative product reuses it so they all land pixel-congruent.
pub fn working_grid(bounds: &geo_primitives::BoundingBox, crs: Crs, resolution_m: f64) -> GridMeta {
    footprint::density::density_grid(bounds, crs, resolution_m)
}

pub fn produce_density(cloud: &PointCloud, grid: &GridMeta, out_path: &Path) -> Result<(), PipelineError> {
    let density = footprint::density::density_raster(cloud, grid)?;
    raster::write_u32(&density, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "density raster written");
    Ok(())
}

pub fn produce_mask(density_path: &Path, threshold: u32, out_path: &Path) -> Result<(), PipelineError> {
    let density = raster::read_u32(density_path)?;
    let mask = footprint::mask::validity_mask(&density, threshold);
    if footprint::mask::is_entirely_invalid(&mask) {
        return Err(PipelineError::EmptyFootprint);
    }
    raster::write_byte(&mask, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "validity mask written");
    Ok(())
}

pub fn produce_footprint(
    mask_path: &Path,
    simplify_tolerance_m: f64,
    min_ring_area_m2: f64,
    out_path: &Path,
) -> Result<(), PipelineError> {
    let mask = raster::read_byte(mask_path)?;
    let polygon = footprint::polygon::vectorize_mask(&mask, simplify_tolerance_m, min_ring_area_m2)?;
    footprint::write_footprint_geojson(&polygon, out_path)?;
    info!(path = %out_path.display(), "footprint polygon written");
    Ok(())
}

/// Clips the *original* source cloud (never the density/mask rasters) by
/// the footprint polygon read back off disk, producing the clean cloud
/// that clean-mode re-entry rebuilds every other product from.
pub fn produce_crop(source_cloud: &PointCloud, footprint_path: &Path, out_path: &Path) -> Result<(), PipelineError> {
    let polygon = read_footprint_polygon(footprint_path)?;
    let exterior = polygon
        .0
        .first()
        .ok_or(PipelineError::FootprintDegenerate)?
        .clone();
    pointcloud::clip_by_polygon(source_cloud, &exterior, out_path)?;
    info!(path = %out_path.display(), "cropped cloud written");
    Ok(())
}

fn read_footprint_polygon(path: &Path) -> Result<MultiPolygon<f64>, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|e| PipelineError::IoTransient(e.to_string()))?;
    let parsed: geojson::GeoJson = text.parse().map_err(|e: geojson::Error| PipelineError::ExternalFailure(e.to_string()))?;
    let collection: geo_types::GeometryCollection<f64> =
        geojson::quick_collection(&parsed).map_err(|e| PipelineError::ExternalFailure(e.to_string()))?;
    for geometry in collection {
        match geometry {
            geo_types::Geometry::MultiPolygon(mp) => return Ok(mp),
            geo_types::Geometry::Polygon(p) => return Ok(MultiPolygon::new(vec![p])),
            _ => continue,
        }
    }
    Err(PipelineError::InvariantViolation("footprint geojson contained no polygon geometry".into()))
}

pub fn produce_dtm(
    cloud: &PointCloud,
    grid: &GridMeta,
    params: &BuildParams,
    scratch_path: &Path,
    out_path: &Path,
) -> Result<(), PipelineError> {
    let dtm_params = elevation::dtm::DtmParams {
        aggregator: pointcloud::rasterize::Aggregator::Tin,
        hole_fill_max_radius: params.dtm_hole_fill_max_radius,
        hole_fill_passes: params.dtm_hole_fill_passes,
    };
    let dtm = elevation::generate_dtm(cloud, grid, dtm_params, scratch_path)?;
    raster::write_f32(&dtm, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "DTM written");
    Ok(())
}

pub fn produce_dsm(cloud: &PointCloud, grid: &GridMeta, out_path: &Path) -> Result<(), PipelineError> {
    let dsm = elevation::generate_dsm(cloud, grid)?;
    raster::write_f32(&dsm, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "DSM written");
    Ok(())
}

pub fn produce_chm(dsm_path: &Path, dtm_path: &Path, out_path: &Path) -> Result<(), PipelineError> {
    let dsm = raster::read_f32(dsm_path)?;
    let dtm = raster::read_f32(dtm_path)?;
    let chm = elevation::generate_chm(&dsm, &dtm)?;
    raster::write_f32(&chm, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "CHM written");
    Ok(())
}

pub fn produce_slope(dtm_path: &Path, z_factor: f64, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let slope = terrain::slope_degrees(&dtm, z_factor);
    raster::write_f32(&slope, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "slope written");
    Ok(())
}

pub fn produce_aspect(dtm_path: &Path, flat_epsilon_degrees: f64, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let aspect = terrain::aspect_degrees(&dtm, flat_epsilon_degrees);
    raster::write_f32(&aspect, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "aspect written");
    Ok(())
}

/// Single-direction hillshade only. The `multi_directional`/`rgb_composite`
/// modes are additional outputs this pipeline never requests as a
/// standalone DAG node; the single-direction byte grid is the one that gets
/// a canonical artifact path and a PNG.
pub fn produce_hillshade(dtm_path: &Path, params: terrain::hillshade::HillshadeParams, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let shade = terrain::hillshade(&dtm, params);
    raster::write_byte(&shade, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "hillshade written");
    Ok(())
}

pub fn produce_tpi(dtm_path: &Path, params: terrain::neighborhood::TpiParams, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let tpi = terrain::neighborhood::tpi(&dtm, params);
    raster::write_f32(&tpi, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "TPI written");
    Ok(())
}

pub fn produce_tri(dtm_path: &Path, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let tri = terrain::neighborhood::tri(&dtm);
    raster::write_f32(&tri, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "TRI written");
    Ok(())
}

pub fn produce_roughness(dtm_path: &Path, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let roughness = terrain::neighborhood::roughness(&dtm);
    raster::write_f32(&roughness, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "roughness written");
    Ok(())
}

pub fn produce_svf(dtm_path: &Path, params: relief::svf::SvfParams, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let svf = relief::sky_view_factor(&dtm, params);
    raster::write_f32(&svf, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "SVF written");
    Ok(())
}

pub fn produce_lrm(dtm_path: &Path, params: relief::lrm::LrmParams, out_path: &Path) -> Result<(), PipelineError> {
    let dtm = raster::read_f32(dtm_path)?;
    let lrm = relief::local_relief_model(&dtm, params);
    raster::write_f32(&lrm, out_path, &WriteOptions::default())?;
    info!(path = %out_path.display(), "LRM written");
    Ok(())
}

/// Renders a rasterized product's clean + decorated PNGs plus `.pgw`
/// world-file siblings. `Hillshade` stores its artifact as a
/// byte grid, not the `ElevationGrid` the renderer expects, so it's lifted
/// through `Raster::map` before the shared render path runs.
pub fn produce_render(
    product: render::Product,
    artifact_path: &Path,
    clean_png_path: &Path,
    decorated_png_path: &Path,
    registry: &render::RenderedPaths,
) -> Result<(), PipelineError> {
    let spec = render::render_spec_for(product);
    let grid = if product == render::Product::Hillshade {
        let byte_grid = raster::read_byte(artifact_path)?;
        byte_grid.map(|v| v as f32)
    } else {
        raster::read_f32(artifact_path)?
    };

    let clean = render::render_clean(&grid, spec);
    if registry.claim(clean_png_path) {
        render::write_png_atomic(&clean, clean_png_path, &grid.meta.affine)?;
    }

    let decorated = render::render_decorated(&clean, spec);
    if registry.claim(decorated_png_path) {
        render::write_png_atomic(&decorated, decorated_png_path, &grid.meta.affine)?;
    }
    info!(path = %clean_png_path.display(), "PNG rendered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_primitives::BoundingBox;

    #[test]
    fn working_grid_matches_densitys_origin_snap() {
        let bounds = BoundingBox::new(100.3, 200.7, 150.9, 260.2);
        let grid = working_grid(&bounds, Crs::epsg(32633), 1.0);
        assert_eq!(grid.affine.origin_x, 100.0);
        assert_eq!(grid.dtype, BandDType::UInt32);
    }
}
