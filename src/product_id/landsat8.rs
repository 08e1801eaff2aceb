//! Landsat 8-9 Collection 2 identifiers (`LXSS_LLLL_PPPRRR_YYYYMMDD_yyyymmdd_CC_TX`).
use super::{expect_digits, expect_tokens, parse_date, DATE_FORMAT};
use crate::error::FormatError;
use chrono::NaiveDate;
use std::fmt;

const FAMILY: &str = "Landsat C2";

token_enum!(L8ProcessingLevel, "processing level" { L2sp => "L2SP", L2sr => "L2SR" });

token_enum!(CollectionCategory, "collection category" { T1 => "T1", T2 => "T2" });

/// Items published with each Level-2 product, and the suffix of the file holding them.
pub const PRODUCT_ITEMS: &[(&str, &str)] = &[
    ("ANG", "ANG.txt"),
    ("MTL_XML", "MTL.xml"),
    ("MTL_TXT", "MTL.txt"),
    ("MTL_JSON", "MTL.json"),
    ("QA_PIXEL", "QA_PIXEL.TIF"),
    ("QA_RADSAT", "QA_RADSAT.TIF"),
    ("SR_B1", "SR_B1.TIF"),
    ("SR_B2", "SR_B2.TIF"),
    ("SR_B3", "SR_B3.TIF"),
    ("SR_B4", "SR_B4.TIF"),
    ("SR_B5", "SR_B5.TIF"),
    ("SR_B6", "SR_B6.TIF"),
    ("SR_B7", "SR_B7.TIF"),
    ("SR_QA_AEROSOL", "SR_QA_AEROSOL.TIF"),
    ("SR_STAC", "SR_stac.json"),
    ("ST_ATRAN", "ST_ATRAN.TIF"),
    ("ST_B10", "ST_B10.TIF"),
    ("ST_CDIST", "ST_CDIST.TIF"),
    ("ST_DRAD", "ST_DRAD.TIF"),
    ("ST_EMIS", "ST_EMIS.TIF"),
    ("ST_EMSD", "ST_EMSD.TIF"),
    ("ST_QA", "ST_QA.TIF"),
    ("ST_TRAD", "ST_TRAD.TIF"),
    ("ST_URAD", "ST_URAD.TIF"),
    ("ST_STAC", "ST_stac.json"),
    ("THUMB_LARGE", "thumb_large.jpeg"),
    ("THUMB_SMALL", "thumb_small.jpeg"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L8C2ProductId {
    sensor: String,
    processing_level: L8ProcessingLevel,
    wrs2_path: String,
    wrs2_row: String,
    acquisition_date: NaiveDate,
    processing_date: NaiveDate,
    category: CollectionCategory,
}

impl L8C2ProductId {
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = expect_tokens(FAMILY, raw, 7)?;

        let sensor = tokens[0].as_bytes();
        let valid_sensor = sensor.len() == 4
            && sensor[0] == b'L'
            && matches!(sensor[1], b'C' | b'O' | b'T')
            && sensor[2] == b'0'
            && matches!(sensor[3], b'8' | b'9');
        if !valid_sensor {
            return Err(FormatError::new(FAMILY, "platform", tokens[0]));
        }

        let path_row = expect_digits(FAMILY, "path/row", tokens[2], 6)?;

        if tokens[5] != "02" {
            return Err(FormatError::new(FAMILY, "collection", tokens[5]));
        }

        Ok(Self {
            sensor: tokens[0].to_string(),
            processing_level: L8ProcessingLevel::parse(FAMILY, tokens[1])?,
            wrs2_path: path_row[..3].to_string(),
            wrs2_row: path_row[3..].to_string(),
            acquisition_date: parse_date(FAMILY, "acquisition date", tokens[3])?,
            processing_date: parse_date(FAMILY, "processing date", tokens[4])?,
            category: CollectionCategory::parse(FAMILY, tokens[6])?,
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// Platform number, `8` or `9`.
    pub fn platform(&self) -> char {
        char::from(self.sensor.as_bytes()[3])
    }

    pub fn processing_level(&self) -> L8ProcessingLevel {
        self.processing_level
    }

    pub fn wrs2_path(&self) -> &str {
        &self.wrs2_path
    }

    pub fn wrs2_row(&self) -> &str {
        &self.wrs2_row
    }

    pub fn acquisition_date(&self) -> NaiveDate {
        self.acquisition_date
    }

    pub fn processing_date(&self) -> NaiveDate {
        self.processing_date
    }

    pub fn collection(&self) -> &'static str {
        "02"
    }

    pub fn collection_category(&self) -> CollectionCategory {
        self.category
    }

    /// File name of a single product item, e.g. `ST_B10`.
    pub fn item_filename(&self, item: &str) -> Result<String, FormatError> {
        let (_, suffix) = PRODUCT_ITEMS
            .iter()
            .find(|(name, _)| *name == item)
            .ok_or_else(|| FormatError::new(FAMILY, "product item", item))?;
        Ok(format!("{self}_{suffix}"))
    }

    pub fn sr_items(&self) -> Vec<String> {
        self.items_with_prefix("SR_")
    }

    pub fn st_items(&self) -> Vec<String> {
        self.items_with_prefix("ST_")
    }

    fn items_with_prefix(&self, prefix: &str) -> Vec<String> {
        PRODUCT_ITEMS
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(_, suffix)| format!("{self}_{suffix}"))
            .collect()
    }
}

impl fmt::Display for L8C2ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}{}_{}_{}_02_{}",
            self.sensor,
            self.processing_level,
            self.wrs2_path,
            self.wrs2_row,
            self.acquisition_date.format(DATE_FORMAT),
            self.processing_date.format(DATE_FORMAT),
            self.category,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L8_ID: &str = "LC08_L2SP_227099_20211017_20211026_02_T2";

    #[test]
    fn test_parse() {
        let id = L8C2ProductId::parse(L8_ID).unwrap();
        assert_eq!(id.platform(), '8');
        assert_eq!(id.processing_level(), L8ProcessingLevel::L2sp);
        assert_eq!(id.wrs2_path(), "227");
        assert_eq!(id.wrs2_row(), "099");
        assert_eq!(id.collection_category(), CollectionCategory::T2);
        assert_eq!(id.acquisition_date(), NaiveDate::from_ymd_opt(2021, 10, 17).unwrap());
        assert_eq!(id.to_string(), L8_ID);
    }

    #[test]
    fn test_rejects_bad_category() {
        let err = L8C2ProductId::parse("LC08_L2SP_227099_20211017_20211026_02_T3").unwrap_err();
        assert_eq!(err.field, "collection category");
        assert_eq!(err.value, "T3");
    }

    #[test]
    fn test_rejects_bad_tokens() {
        assert!(!L8C2ProductId::is_valid("LC07_L2SP_227099_20211017_20211026_02_T2"));
        assert!(!L8C2ProductId::is_valid("LC08_L1TP_227099_20211017_20211026_02_T2"));
        assert!(!L8C2ProductId::is_valid("LC08_L2SP_227099_20211017_20211026_01_T2"));
        assert!(!L8C2ProductId::is_valid("LC08_L2SP_22709_20211017_20211026_02_T2"));
        assert!(L8C2ProductId::is_valid("LC09_L2SR_227099_20211017_20211026_02_T1"));
    }

    #[test]
    fn test_items() {
        let id = L8C2ProductId::parse(L8_ID).unwrap();
        assert_eq!(
            id.item_filename("ST_B10").unwrap(),
            "LC08_L2SP_227099_20211017_20211026_02_T2_ST_B10.TIF"
        );
        assert_eq!(
            id.item_filename("SR_STAC").unwrap(),
            "LC08_L2SP_227099_20211017_20211026_02_T2_SR_stac.json"
        );
        assert_eq!(
            id.item_filename("THUMB_SMALL").unwrap(),
            "LC08_L2SP_227099_20211017_20211026_02_T2_thumb_small.jpeg"
        );
        assert_eq!(id.item_filename("SR_B9").unwrap_err().field, "product item");
        assert_eq!(id.sr_items().len(), 9);
        assert!(id.st_items().iter().all(|item| item.contains("_ST_")));
    }
}
