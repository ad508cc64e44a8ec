//! Sky-View Factor and Local Relief Model.

pub mod lrm;
pub mod svf;

pub use lrm::{auto_window_size, local_relief_model, FilterType, LrmParams};
pub use svf::{sky_view_factor, SvfParams};
