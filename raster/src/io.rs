/// Tiled GeoTIFF read/write. Writes are atomic: a
/// temp file is written next to the destination and renamed into place,
/// so no reader ever observes a partial raster.
use crate::error::RasterError;
use crate::grid::Raster;
use gdal::cpl::CslStringList;
use gdal::raster::RasterCreationOption;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use geo_primitives::{Affine, BandDType, Crs, GridMeta, NoDataSentinel, NODATA_F32};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compression: String,
    pub tiled: bool,
    pub overview_levels: Vec<i32>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: "LZW".to_string(),
            tiled: true,
            overview_levels: vec![2, 4, 8],
        }
    }
}

/// Reads a single-band float raster, surfacing its NoData value and CRS.
/// Fails with `CrsMissing` when the dataset declares no spatial reference,
/// per the "CRS must be declared" read contract.
pub fn read_f32(path: &Path) -> Result<Raster<f32>, RasterError> {
    let (dataset, affine, epsg) = open_georeferenced(path)?;
    let band = dataset.rasterband(1)?;
    let (width, height) = dataset.raster_size();
    let nodata = band.no_data_value().unwrap_or(NODATA_F32 as f64) as f32;
    let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let mut data = buffer.data;
    if (nodata - NODATA_F32).abs() > f32::EPSILON {
        for v in data.iter_mut() {
            if (*v - nodata).abs() < f32::EPSILON {
                *v = NODATA_F32;
            }
        }
    }
    let meta = GridMeta::new(affine, width, height, Crs::epsg(epsg), BandDType::Float32);
    Ok(Raster::from_vec(meta, data))
}

/// Reads a single-band byte raster (validity masks, hillshade).
pub fn read_byte(path: &Path) -> Result<Raster<u8>, RasterError> {
    let (dataset, affine, epsg) = open_georeferenced(path)?;
    let band = dataset.rasterband(1)?;
    let (width, height) = dataset.raster_size();
    let nodata = band.no_data_value().map(|v| v as u8).unwrap_or(geo_primitives::NODATA_U8);
    let buffer = band.read_as::<u8>((0, 0), (width, height), (width, height), None)?;
    let mut data = buffer.data;
    if nodata != geo_primitives::NODATA_U8 {
        for v in data.iter_mut() {
            if *v == nodata {
                *v = geo_primitives::NODATA_U8;
            }
        }
    }
    let meta = GridMeta::new(affine, width, height, Crs::epsg(epsg), BandDType::Byte);
    Ok(Raster::from_vec(meta, data))
}

/// Reads a single-band unsigned-integer raster (the density count grid).
pub fn read_u32(path: &Path) -> Result<Raster<u32>, RasterError> {
    let (dataset, affine, epsg) = open_georeferenced(path)?;
    let band = dataset.rasterband(1)?;
    let (width, height) = dataset.raster_size();
    let nodata = band.no_data_value().map(|v| v as u32).unwrap_or(geo_primitives::NODATA_U32);
    let buffer = band.read_as::<u32>((0, 0), (width, height), (width, height), None)?;
    let mut data = buffer.data;
    if nodata != geo_primitives::NODATA_U32 {
        for v in data.iter_mut() {
            if *v == nodata {
                *v = geo_primitives::NODATA_U32;
            }
        }
    }
    let meta = GridMeta::new(affine, width, height, Crs::epsg(epsg), BandDType::UInt32);
    Ok(Raster::from_vec(meta, data))
}

fn open_georeferenced(path: &Path) -> Result<(Dataset, Affine, u32), RasterError> {
    let dataset = Dataset::open(path)?;
    let geo_transform = dataset.geo_transform()?;
    let srs = dataset
        .spatial_ref()
        .map_err(|_| RasterError::CrsMissing(path.display().to_string()))?;
    let epsg: u32 = srs.authority_code().map_err(|e| RasterError::Gdal(e.to_string()))?.try_into().unwrap_or(0);
    let affine = Affine {
        origin_x: geo_transform[0],
        sx: geo_transform[1],
        rot_x: geo_transform[2],
        origin_y: geo_transform[3],
        rot_y: geo_transform[4],
        sy: -geo_transform[5],
    };
    Ok((dataset, affine, epsg))
}

/// Writes a single-band float raster as a tiled, LZW-compressed GeoTIFF
/// with explicit NoData, atomically.
pub fn write_f32(raster: &Raster<f32>, path: &Path, options: &WriteOptions) -> Result<(), RasterError> {
    write_band(raster, path, options, NODATA_F32 as f64)
}

/// Writes a single-band byte raster (hillshade, byte-coded masks).
pub fn write_byte(raster: &Raster<u8>, path: &Path, options: &WriteOptions) -> Result<(), RasterError> {
    write_band(raster, path, options, geo_primitives::NODATA_U8 as f64)
}

/// Writes a single-band unsigned-integer raster (the point-density count grid).
pub fn write_u32(raster: &Raster<u32>, path: &Path, options: &WriteOptions) -> Result<(), RasterError> {
    write_band(raster, path, options, geo_primitives::NODATA_U32 as f64)
}

fn write_band<T>(
    raster: &Raster<T>,
    path: &Path,
    options: &WriteOptions,
    nodata: f64,
) -> Result<(), RasterError>
where
    T: Copy + NoDataSentinel + gdal::raster::GdalType,
{
    let tmp_path = tmp_sibling(path);
    {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut creation_opts = CslStringList::new();
        if options.tiled {
            creation_opts.set_name_value("TILED", "YES")?;
        }
        creation_opts.set_name_value("COMPRESS", &options.compression)?;

        let mut dataset = driver.create_with_band_type_with_options::<T, _>(
            &tmp_path,
            raster.width(),
            raster.height(),
            1,
            &creation_opts
                .iter()
                .map(|s| RasterCreationOption {
                    key: s.split('=').next().unwrap_or_default(),
                    value: s.split('=').nth(1).unwrap_or_default(),
                })
                .collect::<Vec<_>>(),
        )?;

        let gt = raster.meta.affine.gdal_coefficients();
        dataset.set_geo_transform(&gt)?;
        if let Crs::Epsg(code) = raster.meta.crs {
            dataset.set_spatial_ref(&SpatialRef::from_epsg(code)?)?;
        }

        let mut band = dataset.rasterband(1)?;
        band.set_no_data_value(Some(nodata))?;
        band.write((0, 0), (raster.width(), raster.height()), raster.as_slice())?;

        if !options.overview_levels.is_empty() {
            dataset.build_overviews("NEAREST", &options.overview_levels, &[])?;
        }
    } // dataset dropped here, flushing to disk before rename

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = tmp.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    tmp.set_file_name(format!(".{file_name}.tmp"));
    tmp
}
