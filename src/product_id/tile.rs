//! MGRS tile helpers.
use crate::error::FormatError;

const FAMILY: &str = "MGRS tile";

/// Split a grid tile id into UTM zone, latitude band and 100km square.
///
/// `"31TCJ"` gives `("31", "T", "CJ")`; single digit zones written without padding
/// (`"1234"`) give `("1", "2", "34")`.
pub fn split_tile_id(tile_id: &str) -> Result<(&str, &str, &str), FormatError> {
    if !tile_id.is_ascii() {
        return Err(FormatError::new(FAMILY, "tile id", tile_id));
    }
    match tile_id.len() {
        5 => Ok((&tile_id[..2], &tile_id[2..3], &tile_id[3..])),
        4 => Ok((&tile_id[..1], &tile_id[1..2], &tile_id[2..])),
        _ => Err(FormatError::new(FAMILY, "tile id", tile_id)),
    }
}

/// UTM zone with its zero padding removed, as used by the AWS tile buckets.
pub fn unpadded_zone(zone: &str) -> &str {
    let trimmed = zone.trim_start_matches('0');
    if trimmed.is_empty() {
        zone
    } else {
        trimmed
    }
}

pub(crate) fn expect_tile_id<'a>(
    family: &'static str,
    value: &'a str,
) -> Result<&'a str, FormatError> {
    let bytes = value.as_bytes();
    let valid = bytes.len() == 5
        && bytes[..2].iter().all(|b| b.is_ascii_digit())
        && bytes[2..].iter().all(|b| b.is_ascii_uppercase());
    if !valid {
        return Err(FormatError::new(family, "tile id", value));
    }
    Ok(value)
}
