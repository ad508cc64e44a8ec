pub mod error;
pub mod key;
pub mod persist;
pub mod store;

pub use error::MetacacheError;
pub use key::CloudKey;
pub use store::{CacheEntry, MetadataCache};
