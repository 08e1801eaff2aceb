//! Sentinel-1 product identifiers, e.g.
//! `S1A_IW_GRDH_1SDV_20210708T060105_20210708T060130_038682_04908E_8979.SAFE`
use super::{expect_digits, expect_len, expect_tokens, parse_datetime, DATETIME_FORMAT};
use crate::error::FormatError;
use chrono::NaiveDateTime;
use std::fmt;

const FAMILY: &str = "Sentinel-1";

token_enum!(S1Mission, "mission" { S1A => "S1A", S1B => "S1B" });

token_enum!(BeamMode, "beam mode" { SM => "SM", IW => "IW", EW => "EW", WV => "WV" });

token_enum!(S1ProductType, "product type" { Slc => "SLC", Grd => "GRD", Ocn => "OCN" });

token_enum!(ResolutionClass, "resolution class" { Full => "F", High => "H", Medium => "M" });

token_enum!(ProcessingLevel, "processing level" { Level1 => "1", Level2 => "2" });

token_enum!(ProductClass, "product class" { Standard => "S", Annotation => "A" });

token_enum!(Polarisation, "polarisation" {
    SingleHh => "SH",
    SingleVv => "SV",
    DualHh => "DH",
    DualVv => "DV",
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S1ProductId {
    mission: S1Mission,
    beam_mode: BeamMode,
    product_type: S1ProductType,
    resolution_class: ResolutionClass,
    processing_level: ProcessingLevel,
    product_class: ProductClass,
    polarisation: Polarisation,
    start_time: NaiveDateTime,
    stop_time: NaiveDateTime,
    absolute_orbit: String,
    datatake_id: String,
    unique_id: String,
}

impl S1ProductId {
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = expect_tokens(FAMILY, raw, 9)?;

        let product = expect_len(FAMILY, "product type", tokens[2], 4)?;
        let level = expect_len(FAMILY, "processing level", tokens[3], 4)?;

        let datatake_id = expect_len(FAMILY, "mission datatake id", tokens[7], 6)?;
        if !datatake_id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(FormatError::new(FAMILY, "mission datatake id", datatake_id));
        }

        Ok(Self {
            mission: S1Mission::parse(FAMILY, tokens[0])?,
            beam_mode: BeamMode::parse(FAMILY, tokens[1])?,
            product_type: S1ProductType::parse(FAMILY, &product[..3])?,
            resolution_class: ResolutionClass::parse(FAMILY, &product[3..])?,
            processing_level: ProcessingLevel::parse(FAMILY, &level[..1])?,
            product_class: ProductClass::parse(FAMILY, &level[1..2])?,
            polarisation: Polarisation::parse(FAMILY, &level[2..])?,
            start_time: parse_datetime(FAMILY, "start time", tokens[4])?,
            stop_time: parse_datetime(FAMILY, "stop time", tokens[5])?,
            absolute_orbit: expect_digits(FAMILY, "absolute orbit", tokens[6], 6)?.to_string(),
            datatake_id: datatake_id.to_string(),
            unique_id: expect_len(FAMILY, "product unique id", tokens[8], 4)?.to_string(),
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn mission(&self) -> S1Mission {
        self.mission
    }

    pub fn beam_mode(&self) -> BeamMode {
        self.beam_mode
    }

    pub fn product_type(&self) -> S1ProductType {
        self.product_type
    }

    pub fn resolution_class(&self) -> ResolutionClass {
        self.resolution_class
    }

    pub fn processing_level(&self) -> ProcessingLevel {
        self.processing_level
    }

    pub fn product_class(&self) -> ProductClass {
        self.product_class
    }

    pub fn polarisation(&self) -> Polarisation {
        self.polarisation
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn stop_time(&self) -> NaiveDateTime {
        self.stop_time
    }

    pub fn absolute_orbit(&self) -> &str {
        &self.absolute_orbit
    }

    pub fn datatake_id(&self) -> &str {
        &self.datatake_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }
}

impl fmt::Display for S1ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}{}_{}{}{}_{}_{}_{}_{}_{}",
            self.mission,
            self.beam_mode,
            self.product_type,
            self.resolution_class,
            self.processing_level,
            self.product_class,
            self.polarisation,
            self.start_time.format(DATETIME_FORMAT),
            self.stop_time.format(DATETIME_FORMAT),
            self.absolute_orbit,
            self.datatake_id,
            self.unique_id,
        )
    }
}
