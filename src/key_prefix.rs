//! Object key derivation for each provider.
//!
//! Everything here is a pure function of a product descriptor and its options: no
//! network access, no caching. Steps that need a listing (the AWS S2 sequence folder,
//! the COGS product folder) are split into a prefix to list and a selection function
//! applied to the listing result.
pub mod aws;
pub mod dias;
pub mod ewoc;

use crate::error::{Error, Result};

/// Last path component of a common prefix, without its trailing delimiter.
pub fn folder_name(common_prefix: &str) -> &str {
    common_prefix
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Pick the candidate whose folder name parses to the greatest integer.
///
/// Non numeric folders are ignored. No candidate at all is a [`Error::NotFound`].
pub fn select_greatest_sequence(
    bucket: &str,
    prefix: &str,
    candidates: &[String],
) -> Result<u32> {
    candidates
        .iter()
        .filter_map(|candidate| folder_name(candidate).parse::<u32>().ok())
        .max()
        .ok_or_else(|| Error::NotFound {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name("tiles/8/V/PH/2024/5/4/0/"), "0");
        assert_eq!(folder_name("abc"), "abc");
    }

    #[test]
    fn test_select_greatest_sequence() {
        let candidates = vec![
            "tiles/8/V/PH/2024/5/4/0/".to_string(),
            "tiles/8/V/PH/2024/5/4/10/".to_string(),
            "tiles/8/V/PH/2024/5/4/2/".to_string(),
            "tiles/8/V/PH/2024/5/4/tmp/".to_string(),
        ];
        assert_eq!(select_greatest_sequence("b", "p", &candidates).unwrap(), 10);
    }

    #[test]
    fn test_select_without_candidates() {
        let err = select_greatest_sequence("sentinel-s2-l1c", "tiles/8/V/PH/2024/5/4/", &[])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
