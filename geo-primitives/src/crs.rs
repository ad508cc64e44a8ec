/// Coordinate reference system handle: an EPSG code or raw WKT, never both absent.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    Epsg(u32),
    Wkt(String),
}

impl Crs {
    pub fn epsg(code: u32) -> Self {
        Crs::Epsg(code)
    }

    /// A stable string used in fingerprint canonicalization and manifest output.
    pub fn canonical_tag(&self) -> String {
        match self {
            Crs::Epsg(code) => format!("EPSG:{code}"),
            Crs::Wkt(wkt) => format!("WKT:{wkt}"),
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_tag_is_stable() {
        assert_eq!(Crs::epsg(32633).canonical_tag(), "EPSG:32633");
    }

    #[test]
    fn distinct_crs_have_distinct_tags() {
        assert_ne!(Crs::epsg(4326).canonical_tag(), Crs::epsg(32633).canonical_tag());
    }
}
