//! Sentinel-2 product identifiers, e.g.
//! `S2B_MSIL2A_20210714T131719_N0301_R124_T28WDB_20210714T160455.SAFE`
use super::{expect_digits, expect_len, expect_tokens, parse_datetime, tile, DATETIME_FORMAT};
use crate::error::FormatError;
use chrono::NaiveDateTime;
use std::fmt;

const FAMILY: &str = "Sentinel-2";

token_enum!(S2Mission, "mission" { S2A => "S2A", S2B => "S2B" });

token_enum!(S2ProductLevel, "product level" { L1C => "L1C", L2A => "L2A" });

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S2ProductId {
    mission: S2Mission,
    product_level: S2ProductLevel,
    sensing_start: NaiveDateTime,
    baseline: String,
    relative_orbit: String,
    tile_id: String,
    discriminator: String,
}

impl S2ProductId {
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = expect_tokens(FAMILY, raw, 7)?;

        let level = tokens[1]
            .strip_prefix("MSI")
            .ok_or_else(|| FormatError::new(FAMILY, "product level", tokens[1]))?;

        let baseline = tokens[3]
            .strip_prefix('N')
            .ok_or_else(|| FormatError::new(FAMILY, "baseline", tokens[3]))?;

        let orbit = tokens[4]
            .strip_prefix('R')
            .ok_or_else(|| FormatError::new(FAMILY, "relative orbit", tokens[4]))?;
        let orbit = expect_digits(FAMILY, "relative orbit", orbit, 3)?;
        let orbit_number: u16 = orbit
            .parse()
            .map_err(|_| FormatError::new(FAMILY, "relative orbit", orbit))?;
        if !(1..=143).contains(&orbit_number) {
            return Err(FormatError::new(FAMILY, "relative orbit", orbit));
        }

        let tile_id = tokens[5]
            .strip_prefix('T')
            .ok_or_else(|| FormatError::new(FAMILY, "tile id", tokens[5]))?;

        Ok(Self {
            mission: S2Mission::parse(FAMILY, tokens[0])?,
            product_level: S2ProductLevel::parse(FAMILY, level)?,
            sensing_start: parse_datetime(FAMILY, "datatake sensing start", tokens[2])?,
            baseline: expect_digits(FAMILY, "baseline", baseline, 4)?.to_string(),
            relative_orbit: orbit.to_string(),
            tile_id: tile::expect_tile_id(FAMILY, tile_id)?.to_string(),
            discriminator: expect_len(FAMILY, "product discriminator", tokens[6], 15)?.to_string(),
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn mission(&self) -> S2Mission {
        self.mission
    }

    pub fn product_level(&self) -> S2ProductLevel {
        self.product_level
    }

    pub fn is_l1c(&self) -> bool {
        self.product_level == S2ProductLevel::L1C
    }

    pub fn sensing_start(&self) -> NaiveDateTime {
        self.sensing_start
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Relative orbit as written in the identifier, zero padded to three digits.
    pub fn relative_orbit(&self) -> &str {
        &self.relative_orbit
    }

    /// MGRS tile without the leading `T`.
    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }
}

impl fmt::Display for S2ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_MSI{}_{}_N{}_R{}_T{}_{}",
            self.mission,
            self.product_level,
            self.sensing_start.format(DATETIME_FORMAT),
            self.baseline,
            self.relative_orbit,
            self.tile_id,
            self.discriminator,
        )
    }
}
