//! Identifiers of the analysis ready products written by the EWoC processors.
//!
//! ```text
//! S2A_MSIL2A_20181217T105441_N9999R051T31TCJ_31TCJ      optical
//! S1A_20181208T060900_DES_110_02493002BF1C1710_31TCJ    SAR
//! LC08_L2SP_20190720_19902902T1_31TCJ                   thermal
//! ```
use super::{expect_tokens, parse_date, parse_datetime, tile, DATETIME_FORMAT};
use crate::error::FormatError;
use chrono::NaiveDateTime;
use std::fmt;

token_enum!(ArdPlatform, "platform" { S2A => "S2A", S2B => "S2B", Lc08 => "LC08" });

token_enum!(S1ArdPlatform, "platform" { S1A => "S1A", S1B => "S1B" });

token_enum!(OrbitDirection, "orbit direction" { Ascending => "ASC", Descending => "DES" });

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EwocArdProductId {
    platform: ArdPlatform,
    product: String,
    acquisition: NaiveDateTime,
    discriminator: String,
    tile_id: String,
}

impl EwocArdProductId {
    const FAMILY: &'static str = "EWoC ARD";

    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = expect_tokens(Self::FAMILY, raw, 5)?;
        Ok(Self {
            platform: ArdPlatform::parse(Self::FAMILY, tokens[0])?,
            product: tokens[1].to_string(),
            acquisition: parse_datetime(Self::FAMILY, "acquisition datetime", tokens[2])?,
            discriminator: tokens[3].to_string(),
            tile_id: tile::expect_tile_id(Self::FAMILY, tokens[4])?.to_string(),
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn platform(&self) -> ArdPlatform {
        self.platform
    }

    pub fn acquisition(&self) -> NaiveDateTime {
        self.acquisition
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }
}

impl fmt::Display for EwocArdProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            self.platform,
            self.product,
            self.acquisition.format(DATETIME_FORMAT),
            self.discriminator,
            self.tile_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EwocS1ArdProductId {
    platform: S1ArdPlatform,
    acquisition: NaiveDateTime,
    orbit_direction: OrbitDirection,
    relative_orbit: String,
    discriminator: String,
    tile_id: String,
}

impl EwocS1ArdProductId {
    const FAMILY: &'static str = "EWoC S1 ARD";

    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = expect_tokens(Self::FAMILY, raw, 6)?;
        Ok(Self {
            platform: S1ArdPlatform::parse(Self::FAMILY, tokens[0])?,
            acquisition: parse_datetime(Self::FAMILY, "acquisition datetime", tokens[1])?,
            orbit_direction: OrbitDirection::parse(Self::FAMILY, tokens[2])?,
            relative_orbit: tokens[3].to_string(),
            discriminator: tokens[4].to_string(),
            tile_id: tile::expect_tile_id(Self::FAMILY, tokens[5])?.to_string(),
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn platform(&self) -> S1ArdPlatform {
        self.platform
    }

    pub fn acquisition(&self) -> NaiveDateTime {
        self.acquisition
    }

    pub fn orbit_direction(&self) -> OrbitDirection {
        self.orbit_direction
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }
}

impl fmt::Display for EwocS1ArdProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}_{}",
            self.platform,
            self.acquisition.format(DATETIME_FORMAT),
            self.orbit_direction,
            self.relative_orbit,
            self.discriminator,
            self.tile_id
        )
    }
}

/// Thermal ARD products carry only the acquisition day; such values are read as midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EwocTirArdProductId {
    product: String,
    acquisition: String,
    acquisition_time: NaiveDateTime,
    discriminator: String,
    tile_id: String,
}

impl EwocTirArdProductId {
    const FAMILY: &'static str = "EWoC TIR ARD";

    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let tokens = expect_tokens(Self::FAMILY, raw, 5)?;
        if tokens[0] != "LC08" {
            return Err(FormatError::new(Self::FAMILY, "platform", tokens[0]));
        }
        let acquisition_time = match tokens[2].len() {
            8 => parse_date(Self::FAMILY, "acquisition datetime", tokens[2])?
                .and_time(chrono::NaiveTime::MIN),
            _ => parse_datetime(Self::FAMILY, "acquisition datetime", tokens[2])?,
        };
        Ok(Self {
            product: tokens[1].to_string(),
            acquisition: tokens[2].to_string(),
            acquisition_time,
            discriminator: tokens[3].to_string(),
            tile_id: tile::expect_tile_id(Self::FAMILY, tokens[4])?.to_string(),
        })
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn platform(&self) -> ArdPlatform {
        ArdPlatform::Lc08
    }

    pub fn acquisition(&self) -> NaiveDateTime {
        self.acquisition_time
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }
}

impl fmt::Display for EwocTirArdProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LC08_{}_{}_{}_{}",
            self.product, self.acquisition, self.discriminator, self.tile_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_optical_ard() {
        let raw = "S2A_MSIL2A_20181217T105441_N9999R051T31TCJ_31TCJ";
        let id = EwocArdProductId::parse(raw).unwrap();
        assert_eq!(id.platform(), ArdPlatform::S2A);
        assert_eq!(id.discriminator(), "N9999R051T31TCJ");
        assert_eq!(id.tile_id(), "31TCJ");
        assert_eq!(id.to_string(), raw);
        assert!(!EwocArdProductId::is_valid("S1A_MSIL2A_20181217T105441_N9999R051T31TCJ_31TCJ"));
    }

    #[test]
    fn test_sar_ard() {
        let raw = "S1A_20181208T060900_DES_110_02493002BF1C1710_31TCJ";
        let id = EwocS1ArdProductId::parse(raw).unwrap();
        assert_eq!(id.orbit_direction(), OrbitDirection::Descending);
        assert_eq!(id.discriminator(), "02493002BF1C1710");
        assert_eq!(id.to_string(), raw);

        let err = EwocS1ArdProductId::parse("S1A_20181208T060900_NORTH_110_02493002BF1C1710_31TCJ")
            .unwrap_err();
        assert_eq!(err.field, "orbit direction");
    }

    #[test]
    fn test_tir_ard() {
        let raw = "LC08_L2SP_20190720_19902902T1_31TCJ";
        let id = EwocTirArdProductId::parse(raw).unwrap();
        assert_eq!(
            id.acquisition(),
            NaiveDate::from_ymd_opt(2019, 7, 20)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(id.tile_id(), "31TCJ");
        assert_eq!(id.to_string(), raw);
        assert!(!EwocTirArdProductId::is_valid("S2A_L2SP_20190720_19902902T1_31TCJ"));
        assert!(!EwocTirArdProductId::is_valid("LC08_L2SP_2019072_19902902T1_31TCJ"));
    }
}
