//! Topographic derivatives, all operating on a DTM unless noted.

pub mod aspect;
pub mod gradient;
pub mod hillshade;
pub mod neighborhood;
pub mod slope;

pub use aspect::{aspect_degrees, FLAT_ASPECT_SENTINEL};
pub use hillshade::{hillshade, multi_directional, rgb_composite, HillshadeParams};
pub use neighborhood::{roughness, tpi, tri, TpiParams};
pub use slope::slope_degrees;
