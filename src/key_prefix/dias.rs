//! Date partitioned layout of the DIAS product bucket.
use crate::product_id::{S1ProductId, S2ProductId, SAFE_SUFFIX};

pub const BUCKET: &str = "DIAS";
pub const ENDPOINT_URL: &str = "http://data.cloudferro.com";

const S1_PREFIX: &str = "Sentinel-1/SAR";
const S2_PREFIX: &str = "Sentinel-2/MSI";
const SRTM1S_PREFIX: &str = "auxdata/SRTMGL1/dem";

/// Key fragment selecting the scene classification mask inside a L2A product.
pub const L2A_MASK_FILTER: &str = "SCL_20m";

/// `Sentinel-1/SAR/GRD/2021/07/08/<id>.SAFE/`
pub fn s1_prefix(id: &S1ProductId) -> String {
    format!(
        "{}/{}/{}/{}{}/",
        S1_PREFIX,
        id.product_type(),
        id.start_time().format("%Y/%m/%d"),
        id,
        SAFE_SUFFIX
    )
}

/// `Sentinel-2/MSI/L2A/2021/07/14/<id>.SAFE/`
pub fn s2_prefix(id: &S2ProductId) -> String {
    format!(
        "{}/{}/{}/{}{}/",
        S2_PREFIX,
        id.product_level(),
        id.sensing_start().format("%Y/%m/%d"),
        id,
        SAFE_SUFFIX
    )
}

pub fn srtm1s_filename(tile_id: &str) -> String {
    format!("{tile_id}.SRTMGL1.hgt.zip")
}

pub fn srtm1s_key(tile_id: &str) -> String {
    format!("{}/{}", SRTM1S_PREFIX, srtm1s_filename(tile_id))
}
