/// EPSG lookup from the CRS-carrying VLRs a LAS/LAZ header can hold: the
/// legacy GeoTIFF GeoKeys VLR. Clouds with no discoverable CRS are rejected
/// rather than guessed at.
use las::Vlr;

const LASF_PROJECTION: &str = "LASF_Projection";
const GEO_KEY_DIRECTORY_RECORD_ID: u16 = 34735;
const WKT_RECORD_ID: u16 = 2112;

const GEO_KEY_PROJECTED_CRS: u16 = 3072;
const GEO_KEY_GEODETIC_CRS: u16 = 2048;

/// Returns the EPSG code carried by `vlr`, if any. Tries OGC WKT first (LAS
/// 1.4's preferred form), then falls back to the legacy GeoKeys directory.
pub fn epsg_from_vlr(vlr: &Vlr) -> Option<u32> {
    if vlr.record_id == WKT_RECORD_ID {
        return epsg_from_wkt(&vlr.data);
    }
    if vlr.user_id == LASF_PROJECTION && vlr.record_id == GEO_KEY_DIRECTORY_RECORD_ID {
        return epsg_from_geo_keys(&vlr.data);
    }
    None
}

/// Scans WKT text for an `AUTHORITY["EPSG","<code>"]` (or `ID["EPSG",<code>]`)
/// clause. This is a lightweight textual scan, not a full WKT parser — the
/// pipeline only needs the authority code, never the rest of the definition.
fn epsg_from_wkt(data: &[u8]) -> Option<u32> {
    let text = String::from_utf8_lossy(data);
    for marker in ["AUTHORITY[\"EPSG\",\"", "ID[\"EPSG\","] {
        if let Some(pos) = text.find(marker) {
            let rest = &text[pos + marker.len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(code) = digits.parse::<u32>() {
                return Some(code);
            }
        }
    }
    None
}

/// Parses the binary GeoKeyDirectory (GeoTIFF spec 2.1) and pulls the
/// projected or geographic CRS key, whichever is present.
fn epsg_from_geo_keys(data: &[u8]) -> Option<u32> {
    if data.len() < 8 {
        return None;
    }
    let read_u16 = |i: usize| -> u16 { u16::from_le_bytes([data[i], data[i + 1]]) };
    let num_keys = read_u16(6);
    let mut projected = None;
    let mut geodetic = None;
    for i in 0..num_keys as usize {
        let offset = 8 + i * 8;
        if offset + 8 > data.len() {
            break;
        }
        let key_id = read_u16(offset);
        let tiff_tag_location = read_u16(offset + 2);
        let value = read_u16(offset + 6);
        if tiff_tag_location != 0 {
            continue; // value is stored out-of-line; not produced by any writer we target
        }
        match key_id {
            GEO_KEY_PROJECTED_CRS => projected = Some(value as u32),
            GEO_KEY_GEODETIC_CRS => geodetic = Some(value as u32),
            _ => {}
        }
    }
    projected.filter(|&v| v != 0 && v < 32767).or(geodetic.filter(|&v| v != 0 && v < 32767))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo_key_directory(key_id: u16, value: u16) -> Vec<u8> {
        let mut data = vec![1, 1, 0, 0, 0, 0, 1, 0]; // header: version, rev, minor, num_keys=1
        data.extend_from_slice(&key_id.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes()); // tiff_tag_location = 0 (inline)
        data.extend_from_slice(&1u16.to_le_bytes()); // count
        data.extend_from_slice(&value.to_le_bytes());
        data
    }

    #[test]
    fn extracts_epsg_from_projected_geo_key() {
        let data = geo_key_directory(GEO_KEY_PROJECTED_CRS, 32633);
        assert_eq!(epsg_from_geo_keys(&data), Some(32633));
    }

    #[test]
    fn extracts_epsg_from_wkt_authority_clause() {
        let wkt = b"PROJCS[\"WGS 84 / UTM zone 33N\",AUTHORITY[\"EPSG\",\"32633\"]]";
        assert_eq!(epsg_from_wkt(wkt), Some(32633));
    }

    #[test]
    fn rejects_user_defined_geo_key_sentinel() {
        let data = geo_key_directory(GEO_KEY_PROJECTED_CRS, 32767);
        assert_eq!(epsg_from_geo_keys(&data), None);
    }
}
