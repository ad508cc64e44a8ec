/// GeoJSON serialization of the footprint polygon. GeoJSON is the primary
/// vector format here; GPKG/Shapefile are alternatives this crate doesn't
/// implement.
use crate::error::FootprintError;
use geo_types::MultiPolygon;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use std::io::Write;
use std::path::Path;

pub fn write_footprint_geojson(polygon: &MultiPolygon<f64>, path: impl AsRef<Path>) -> Result<(), FootprintError> {
    let value = Value::from(polygon);
    let geometry = Geometry::new(value);
    let feature = Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: None,
        foreign_members: None,
    };
    let collection = FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    };

    let path = path.as_ref();
    let tmp_path = path.with_extension("geojson.tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(collection.to_string().as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
