//! Key layouts of the AWS open data buckets.
use super::{folder_name, select_greatest_sequence};
use crate::error::{Error, Result};
use crate::product_id::tile::{split_tile_id, unpadded_zone};
use crate::product_id::{L8C2ProductId, S1ProductId, S2ProductId};
use chrono::Datelike;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// The AWS buckets products are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsBucket {
    SentinelS1L1c,
    SentinelS2L1c,
    SentinelS2L2a,
    SentinelCogs,
    UsgsLandsat,
    CopernicusDem30m,
    CopernicusDem90m,
}

impl AwsBucket {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SentinelS1L1c => "sentinel-s1-l1c",
            Self::SentinelS2L1c => "sentinel-s2-l1c",
            Self::SentinelS2L2a => "sentinel-s2-l2a",
            Self::SentinelCogs => "sentinel-cogs",
            Self::UsgsLandsat => "usgs-landsat",
            Self::CopernicusDem30m => "copernicus-dem-30m",
            Self::CopernicusDem90m => "copernicus-dem-90m",
        }
    }

    pub fn region(&self) -> &'static str {
        match self {
            Self::SentinelS1L1c | Self::SentinelS2L1c | Self::SentinelS2L2a => "eu-central-1",
            Self::CopernicusDem30m | Self::CopernicusDem90m => "eu-central-1",
            Self::SentinelCogs | Self::UsgsLandsat => "us-west-2",
        }
    }

    pub fn requester_pays(&self) -> bool {
        matches!(
            self,
            Self::SentinelS1L1c | Self::SentinelS2L1c | Self::SentinelS2L2a | Self::UsgsLandsat
        )
    }

    pub fn for_s2(id: &S2ProductId, cogs: bool) -> Result<Self> {
        match (id.is_l1c(), cogs) {
            (true, false) => Ok(Self::SentinelS2L1c),
            (false, false) => Ok(Self::SentinelS2L2a),
            (false, true) => Ok(Self::SentinelCogs),
            (true, true) => Err(Error::Configuration(format!(
                "{} is not published as a cloud optimized product",
                id
            ))),
        }
    }
}

impl FromStr for AwsBucket {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        [
            Self::SentinelS1L1c,
            Self::SentinelS2L1c,
            Self::SentinelS2L2a,
            Self::SentinelCogs,
            Self::UsgsLandsat,
            Self::CopernicusDem30m,
            Self::CopernicusDem90m,
        ]
        .into_iter()
        .find(|bucket| bucket.name() == name)
        .ok_or_else(|| Error::Configuration(format!("Unsupported AWS bucket: {name}")))
    }
}

impl fmt::Display for AwsBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `GRD/2021/7/8/IW/DV/<id>/`
pub fn s1_prefix(id: &S1ProductId) -> String {
    let start = id.start_time();
    format!(
        "{}/{}/{}/{}/{}/{}/{}/",
        id.product_type(),
        start.year(),
        start.month(),
        start.day(),
        id.beam_mode(),
        id.polarisation(),
        id
    )
}

/// The two listings making up a product in the legacy S2 buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S2LegacyPrefixes {
    pub product: String,
    pub tile: String,
}

/// `products/2021/7/14/<id>/`
pub fn s2_product_prefix(id: &S2ProductId) -> String {
    let start = id.sensing_start();
    format!(
        "products/{}/{}/{}/{}/",
        start.year(),
        start.month(),
        start.day(),
        id
    )
}

/// `tiles/28/W/DB/2021/7/14/`, listed to find the sequence folder.
pub fn s2_tile_date_prefix(id: &S2ProductId) -> Result<String> {
    let (zone, band, square) = split_tile_id(id.tile_id())?;
    let start = id.sensing_start();
    Ok(format!(
        "tiles/{}/{}/{}/{}/{}/{}/",
        unpadded_zone(zone),
        band,
        square,
        start.year(),
        start.month(),
        start.day()
    ))
}

pub fn s2_legacy_prefixes(id: &S2ProductId, sequence: u32) -> Result<S2LegacyPrefixes> {
    Ok(S2LegacyPrefixes {
        product: s2_product_prefix(id),
        tile: format!("{}{}/", s2_tile_date_prefix(id)?, sequence),
    })
}

/// Choose the sequence folder among the common prefixes listed under [`s2_tile_date_prefix`].
pub fn select_s2_sequence(bucket: AwsBucket, tile_date_prefix: &str, candidates: &[String]) -> Result<u32> {
    select_greatest_sequence(bucket.name(), tile_date_prefix, candidates)
}

/// Key of the scene classification mask of a legacy L2A product.
pub fn s2_l2a_mask_key(prefixes: &S2LegacyPrefixes) -> String {
    format!("{}R20m/SCL.jp2", prefixes.tile)
}

/// `sentinel-s2-l2a-cogs/28/W/DB/2021/7/`, listed to find the product folder.
pub fn s2_cogs_month_prefix(id: &S2ProductId) -> Result<String> {
    let (zone, band, square) = split_tile_id(id.tile_id())?;
    let start = id.sensing_start();
    Ok(format!(
        "sentinel-s2-l2a-cogs/{}/{}/{}/{}/{}/",
        unpadded_zone(zone),
        band,
        square,
        start.year(),
        start.month()
    ))
}

/// Choose the COG product folder acquired on the same day as `id`, greatest sequence first.
///
/// Folder names carry the tile without the zone padding, e.g. `S2A_8VPH_20240504_0_L2A`.
pub fn select_s2_cogs_product(
    id: &S2ProductId,
    month_prefix: &str,
    candidates: &[String],
) -> Result<String> {
    let (zone, band, square) = split_tile_id(id.tile_id())?;
    let tile = format!("{}{band}{square}", unpadded_zone(zone));
    let pattern = format!(
        r"^{}_{}_{}_(\d+)_L2A$",
        id.mission(),
        regex::escape(&tile),
        id.sensing_start().format("%Y%m%d")
    );
    let re = Regex::new(&pattern).map_err(|e| Error::Configuration(e.to_string()))?;

    candidates
        .iter()
        .filter_map(|candidate| {
            let name = folder_name(candidate);
            let sequence: u32 = re.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((sequence, candidate))
        })
        .max_by_key(|(sequence, _)| *sequence)
        .map(|(_, candidate)| {
            let mut prefix = candidate.clone();
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
            prefix
        })
        .ok_or_else(|| Error::NotFound {
            bucket: AwsBucket::SentinelCogs.name().to_string(),
            prefix: month_prefix.to_string(),
        })
}

pub const COGS_MASK_FILENAME: &str = "SCL.tif";

/// `collection02/level-2/standard/oli-tirs/2021/227/099/<id>/`
pub fn l8c2_prefix(id: &L8C2ProductId) -> String {
    format!(
        "collection02/level-2/standard/oli-tirs/{}/{}/{}/{}/",
        id.acquisition_date().year(),
        id.wrs2_path(),
        id.wrs2_row(),
        id
    )
}

pub fn l8c2_gdal_path(id: &L8C2ProductId, item: &str) -> Result<String> {
    Ok(format!(
        "/vsis3/{}/{}{}",
        AwsBucket::UsgsLandsat.name(),
        l8c2_prefix(id),
        id.item_filename(item)?
    ))
}

/// Grid spacing of the Copernicus DEM tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemResolution {
    OneArcSecond,
    ThreeArcSeconds,
}

impl DemResolution {
    pub fn bucket(&self) -> AwsBucket {
        match self {
            Self::OneArcSecond => AwsBucket::CopernicusDem30m,
            Self::ThreeArcSeconds => AwsBucket::CopernicusDem90m,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::OneArcSecond => "10",
            Self::ThreeArcSeconds => "30",
        }
    }
}

impl FromStr for DemResolution {
    type Err = Error;

    fn from_str(resolution: &str) -> Result<Self> {
        match resolution {
            "1s" => Ok(Self::OneArcSecond),
            "3s" => Ok(Self::ThreeArcSeconds),
            _ => Err(Error::Configuration(format!(
                "DEM resolution must be 1s or 3s, got {resolution}"
            ))),
        }
    }
}

/// How downloaded DEM tiles are named locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemNaming {
    #[default]
    Aws,
    /// `Copernicus_DSM_10_N43_00_E001_00_DEM.tif`, the layout Sen2Cor looks for.
    Sen2Cor,
}

/// `Copernicus_DSM_COG_10_N43_00_E001_00_DEM` for the tile id `N43E001`.
pub fn copdem_tile_name(tile_id: &str, resolution: DemResolution) -> Result<String> {
    if tile_id.len() != 7 || !tile_id.is_ascii() {
        return Err(crate::error::FormatError::new("Copernicus DEM", "tile id", tile_id).into());
    }
    Ok(format!(
        "Copernicus_DSM_COG_{}_{}_00_{}_00_DEM",
        resolution.code(),
        &tile_id[..3],
        &tile_id[3..]
    ))
}

pub fn copdem_key(tile_id: &str, resolution: DemResolution) -> Result<String> {
    let name = copdem_tile_name(tile_id, resolution)?;
    Ok(format!("{name}/{name}.tif"))
}

pub fn copdem_filename(tile_id: &str, resolution: DemResolution, naming: DemNaming) -> Result<String> {
    let name = copdem_tile_name(tile_id, resolution)?;
    Ok(match naming {
        DemNaming::Aws => format!("{name}.tif"),
        DemNaming::Sen2Cor => format!("{}.tif", name.replacen("_COG", "", 1)),
    })
}

pub fn copdem_gdal_path(tile_id: &str, resolution: DemResolution) -> Result<String> {
    Ok(format!(
        "/vsis3/{}/{}",
        resolution.bucket().name(),
        copdem_key(tile_id, resolution)?
    ))
}
