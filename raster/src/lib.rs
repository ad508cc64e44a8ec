//! Raster I/O and arithmetic. Reads/writes tiled GeoTIFF via
//! GDAL, aligns and resamples grids, and performs masked pixelwise
//! arithmetic that honors the NoData sentinel throughout.

pub mod error;
pub mod grid;
pub mod io;
pub mod ops;
pub mod resample;

pub use error::RasterError;
pub use grid::{ByteGrid, CountGrid, ElevationGrid, Raster};
pub use io::{read_byte, read_f32, read_u32, write_byte, write_f32, write_u32, WriteOptions};
pub use resample::Resampler;
