//! Layout of the EWoC private buckets.
use crate::error::Result;
use crate::product_id::split_tile_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ENDPOINT_URL: &str = "https://s3.waw2-1.cloudferro.com";
pub const DEFAULT_BUCKET_PREFIX: &str = "ewoc-";
pub const AGERA5_PREFIX: &str = "AgERA5/";

/// The three private buckets, with `-dev` twins for ARD and PRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EwocBucketKind {
    AuxData,
    Ard,
    Prd,
}

impl EwocBucketKind {
    pub fn bucket_name(&self, bucket_prefix: &str, dev_mode: bool) -> String {
        match (self, dev_mode) {
            (Self::AuxData, _) => format!("{bucket_prefix}aux-data"),
            (Self::Ard, false) => format!("{bucket_prefix}ard"),
            (Self::Ard, true) => format!("{bucket_prefix}ard-dev"),
            (Self::Prd, false) => format!("{bucket_prefix}prd"),
            (Self::Prd, true) => format!("{bucket_prefix}prd-dev"),
        }
    }
}

impl FromStr for EwocBucketKind {
    type Err = crate::error::Error;

    fn from_str(kind: &str) -> Result<Self> {
        match kind {
            "aux-data" | "aux" => Ok(Self::AuxData),
            "ard" => Ok(Self::Ard),
            "prd" => Ok(Self::Prd),
            _ => Err(crate::error::Error::Configuration(format!(
                "Unknown EWoC bucket: {kind}"
            ))),
        }
    }
}

/// ARD product families, each stored under its own top level folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArdKind {
    Sar,
    Optical,
    Tir,
}

impl ArdKind {
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Sar => "SAR",
            Self::Optical => "OPTICAL",
            Self::Tir => "TIR",
        }
    }

    /// Processing level reported in collection files.
    pub fn level(&self) -> &'static str {
        match self {
            Self::Sar => "SIGMA0",
            Self::Optical => "SMAC",
            Self::Tir => "L2SP",
        }
    }
}

impl FromStr for ArdKind {
    type Err = crate::error::Error;

    fn from_str(kind: &str) -> Result<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "sar" => Ok(Self::Sar),
            "optical" => Ok(Self::Optical),
            "tir" => Ok(Self::Tir),
            _ => Err(crate::error::Error::Configuration(format!(
                "Unknown ARD kind: {kind}"
            ))),
        }
    }
}

impl fmt::Display for ArdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// `31TCJ` becomes `31/T/CJ`.
pub fn tile_to_ard_path_component(tile_id: &str) -> Result<String> {
    let (zone, band, square) = split_tile_id(tile_id)?;
    Ok(format!("{zone}/{band}/{square}"))
}

/// `<production>/SAR/31/T/CJ`
pub fn ard_prefix(production_id: &str, kind: ArdKind, tile_id: &str) -> Result<String> {
    Ok(format!(
        "{}/{}/{}",
        production_id,
        kind.folder(),
        tile_to_ard_path_component(tile_id)?
    ))
}

/// Name of the product folder holding an ARD object, e.g.
/// `<production>/SAR/31/T/CJ/2018/20181208/<product>/<file>.tif` gives `<product>`.
pub fn ard_product_name(key: &str) -> Option<&str> {
    key.split('/').nth(7)
}

/// Folder holding `key`.
pub fn parent_prefix(key: &str) -> &str {
    key.rsplit_once('/').map(|(parent, _)| parent).unwrap_or_default()
}

/// Acquisition day folder of an AgERA5 product, `AgERA5/2019/20190101/...`.
pub fn agera5_date(key: &str) -> Option<&str> {
    key.split('/').nth(2)
}

/// SRTM tile archives in the auxiliary bucket, per resolution.
pub fn srtm_key(tile_id: &str, one_arc_second: bool) -> String {
    if one_arc_second {
        format!("srtm30/{tile_id}.SRTMGL1.hgt.zip")
    } else {
        format!("srtm90/{tile_id}.zip")
    }
}
