use super::unzip;
use crate::config::Settings;
use crate::download_plan::TransferSummary;
use crate::error::{Error, FormatError, Result};
use crate::key_prefix::aws::DemResolution;
use crate::key_prefix::ewoc::{self, ArdKind, EwocBucketKind};
use crate::object_store::ObjectStore;
use crate::product_id::{
    parse_date, EwocArdProductId, EwocS1ArdProductId, EwocTirArdProductId, ProductId,
};
use crate::s3::{S3Client, S3ObjOps};
use chrono::{NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::pin::pin;
use tracing::info;

/// Suffix of the rasters making up an ARD product.
pub const ARD_RASTER_SUFFIX: &str = ".tif";

/// Product list handed to the processing chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Collection<T> {
    pub entries: Vec<T>,
}

impl<T: Serialize + for<'de> Deserialize<'de>> Collection<T> {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("Invalid collection {}: {}", path.as_ref().display(), e))
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ArdEntry {
    pub date: NaiveDateTime,
    pub tile: String,
    pub level: String,
    pub path: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Agera5Entry {
    pub product: String,
    pub date: NaiveDate,
    pub path: String,
    pub tile: String,
    pub epsg: u32,
}

pub type ArdCollection = Collection<ArdEntry>;
pub type Agera5Collection = Collection<Agera5Entry>;

/// An ARD product found in the ARD bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArdProduct {
    pub id: ProductId,
    /// Folder holding the product rasters.
    pub prefix: String,
}

impl ArdProduct {
    fn parse(kind: ArdKind, name: &str, prefix: &str) -> Result<Self, FormatError> {
        let id = match kind {
            ArdKind::Sar => ProductId::EwocS1Ard(EwocS1ArdProductId::parse(name)?),
            ArdKind::Optical => ProductId::EwocArd(EwocArdProductId::parse(name)?),
            ArdKind::Tir => ProductId::EwocTirArd(EwocTirArdProductId::parse(name)?),
        };
        Ok(Self {
            id,
            prefix: prefix.to_string(),
        })
    }

    pub fn acquisition(&self) -> Option<NaiveDateTime> {
        match &self.id {
            ProductId::EwocArd(id) => Some(id.acquisition()),
            ProductId::EwocS1Ard(id) => Some(id.acquisition()),
            ProductId::EwocTirArd(id) => Some(id.acquisition()),
            _ => None,
        }
    }
}

/// One of the private EWoC buckets.
pub struct EwocBucket<C> {
    store: ObjectStore<C>,
    kind: EwocBucketKind,
}

impl EwocBucket<S3Client> {
    pub async fn connect(settings: &Settings, kind: EwocBucketKind) -> Result<Self> {
        let config = settings.ewoc_store(kind)?;
        let client = S3Client::from_config(&config).await?;
        Self::with_client(client, &config.bucket, kind).await
    }
}

impl<C: S3ObjOps> EwocBucket<C> {
    pub async fn with_client(client: C, bucket: &str, kind: EwocBucketKind) -> Result<Self> {
        let store = ObjectStore::connect(client, bucket).await?;
        info!(bucket, "EWoC bucket ready");
        Ok(Self { store, kind })
    }

    pub fn store(&self) -> &ObjectStore<C> {
        &self.store
    }

    fn expect_kind(&self, kind: EwocBucketKind) -> Result<()> {
        if self.kind != kind {
            return Err(Error::Configuration(format!(
                "Operation not available on bucket {}",
                self.store.bucket()
            )));
        }
        Ok(())
    }

    fn s3_path(&self, prefix: &str) -> String {
        format!("s3://{}/{}", self.store.bucket(), prefix)
    }

    /// Folders holding at least one object under `prefix`, sorted.
    async fn product_prefixes(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let mut prefixes = BTreeSet::new();
        let mut keys = pin!(self.store.list(prefix, false));
        while let Some(key) = keys.try_next().await? {
            prefixes.insert(ewoc::parent_prefix(&key).to_string());
        }
        Ok(prefixes)
    }

    /// Download and unpack SRTM tiles from the auxiliary bucket.
    ///
    /// 1s tiles, e.g. `N43E001`, are unpacked into `out_dir`. 3s tiles, e.g. `srtm_01_16`,
    /// go to `out_dir/srtm3s`.
    pub async fn download_srtm_tiles(
        &self,
        tile_ids: &[String],
        out_dir: &Path,
        resolution: DemResolution,
    ) -> Result<()> {
        self.expect_kind(EwocBucketKind::AuxData)?;
        let one_arc_second = resolution == DemResolution::OneArcSecond;
        let extract_dir = if one_arc_second {
            out_dir.to_path_buf()
        } else {
            out_dir.join("srtm3s")
        };
        for tile_id in tile_ids {
            let key = ewoc::srtm_key(tile_id, one_arc_second);
            let archive = crate::object_store::local_path(out_dir, &key);
            info!(key, path = %archive.display(), "SRTM tile");
            self.store.download_file(&key, &archive, false).await?;
            unzip(&archive, &extract_dir)?;
        }
        Ok(())
    }

    /// AgERA5 product folders, such as `AgERA5/2019/20190101`.
    pub async fn list_agera5_products(&self) -> Result<Vec<String>> {
        self.expect_kind(EwocBucketKind::AuxData)?;
        Ok(self
            .product_prefixes(ewoc::AGERA5_PREFIX)
            .await?
            .into_iter()
            .collect())
    }

    pub async fn agera5_collection(&self) -> Result<Agera5Collection> {
        let mut entries = vec![];
        for prefix in self.list_agera5_products().await? {
            let day = ewoc::agera5_date(&format!("{prefix}/"))
                .unwrap_or_default()
                .to_string();
            let date = parse_date("AgERA5", "date", &day)?;
            entries.push(Agera5Entry {
                product: format!("AgERA5_{day}"),
                date,
                path: self.s3_path(&prefix),
                tile: "global".to_string(),
                epsg: 4326,
            });
        }
        Ok(Collection { entries })
    }

    /// ARD products of one tile and production.
    pub async fn ard_products(
        &self,
        kind: ArdKind,
        tile_id: &str,
        production_id: &str,
    ) -> Result<Vec<ArdProduct>> {
        self.expect_kind(EwocBucketKind::Ard)?;
        let ard_prefix = ewoc::ard_prefix(production_id, kind, tile_id)?;
        let mut products = vec![];
        for prefix in self.product_prefixes(&ard_prefix).await? {
            let name = ewoc::ard_product_name(&format!("{prefix}/"))
                .unwrap_or_default()
                .to_string();
            products.push(ArdProduct::parse(kind, &name, &prefix)?);
        }
        info!(%kind, tile_id, production_id, count = products.len(), "ARD products");
        Ok(products)
    }

    pub async fn ard_collection(
        &self,
        kind: ArdKind,
        tile_id: &str,
        production_id: &str,
    ) -> Result<ArdCollection> {
        let entries = self
            .ard_products(kind, tile_id, production_id)
            .await?
            .into_iter()
            .filter_map(|product| {
                Some(ArdEntry {
                    date: product.acquisition()?,
                    tile: tile_id.to_string(),
                    level: kind.level().to_string(),
                    path: self.s3_path(&product.prefix),
                })
            })
            .collect();
        Ok(Collection { entries })
    }

    /// Upload the rasters of an ARD product directory.
    pub async fn upload_ard_prd(&self, dir: &Path, prefix: &str) -> Result<(usize, u64)> {
        self.expect_kind(EwocBucketKind::Ard)?;
        self.store
            .upload_prefix(dir, prefix, Some(ARD_RASTER_SUFFIX))
            .await
    }

    pub async fn upload_ard_raster(&self, path: &Path, key: &str) -> Result<u64> {
        self.expect_kind(EwocBucketKind::Ard)?;
        self.store.upload_file(path, key).await
    }

    /// Upload a whole product directory to the products bucket.
    pub async fn upload_ewoc_prd(&self, dir: &Path, prefix: &str) -> Result<(usize, u64)> {
        self.expect_kind(EwocBucketKind::Prd)?;
        self.store.upload_prefix(dir, prefix, None).await
    }

    pub async fn download_bucket_prefix(&self, prefix: &str, out_dir: &Path) -> Result<TransferSummary> {
        self.store.download_prefix(prefix, out_dir, false, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::tests::zip_bytes;
    use crate::s3::mock_client::MockS3Client;

    const S1_ARD: &str = "S1A_20181208T060900_DES_110_02493002BF1C1710_31TCJ";
    const S1_ARD_2: &str = "S1B_20181214T060800_DES_110_02493002BF1C1711_31TCJ";

    async fn ard_bucket() -> EwocBucket<MockS3Client> {
        let client = MockS3Client::new().with_page_size(2);
        for (day, id) in [("20181208", S1_ARD), ("20181214", S1_ARD_2)] {
            let prefix = format!("c728b264/SAR/31/T/CJ/2018/{day}/{id}");
            client.insert("ewoc-ard", &format!("{prefix}/{id}_VV.tif"), "vv");
            client.insert("ewoc-ard", &format!("{prefix}/{id}_VH.tif"), "vh");
        }
        EwocBucket::with_client(client, "ewoc-ard", EwocBucketKind::Ard)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ard_products() {
        let bucket = ard_bucket().await;
        let products = bucket.ard_products(ArdKind::Sar, "31TCJ", "c728b264").await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id.to_string(), S1_ARD);
        assert_eq!(
            products[0].prefix,
            format!("c728b264/SAR/31/T/CJ/2018/20181208/{S1_ARD}")
        );

        let collection = bucket.ard_collection(ArdKind::Sar, "31TCJ", "c728b264").await.unwrap();
        assert_eq!(collection.entries[1].level, "SIGMA0");
        assert_eq!(
            collection.entries[1].path,
            format!("s3://ewoc-ard/c728b264/SAR/31/T/CJ/2018/20181214/{S1_ARD_2}")
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satio_sar.json");
        collection.write(&path).unwrap();
        assert_eq!(ArdCollection::read(&path).unwrap(), collection);
    }

    #[tokio::test]
    async fn test_ard_products_bad_name() {
        let bucket = ard_bucket().await;
        // nothing under the prefix, the listing has no contents
        let result = bucket.ard_products(ArdKind::Optical, "31TCJ", "c728b264").await;
        assert!(matches!(
            result,
            Err(Error::Transfer(crate::error::TransferError::MissingContents { .. }))
        ));

        bucket.store().client().insert(
            "ewoc-ard",
            "c728b264/OPTICAL/31/T/CJ/2018/20181217/not_an_id/B02.tif",
            "",
        );
        let result = bucket.ard_products(ArdKind::Optical, "31TCJ", "c728b264").await;
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[tokio::test]
    async fn test_wrong_bucket() {
        let bucket = ard_bucket().await;
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            bucket.upload_ewoc_prd(dir.path(), "prd").await,
            Err(Error::Configuration(_))
        ));
        assert!(bucket.list_agera5_products().await.is_err());
    }

    #[tokio::test]
    async fn test_upload_ard_prd() {
        let bucket = ard_bucket().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("B02.tif"), "b02").unwrap();
        fs::write(dir.path().join("B02.tif.aux.xml"), "aux").unwrap();

        let (count, bytes) = bucket.upload_ard_prd(dir.path(), "c728b264/OPTICAL/x").await.unwrap();
        assert_eq!((count, bytes), (1, 3));
        assert!(bucket
            .store()
            .client()
            .get_data("ewoc-ard", "c728b264/OPTICAL/x/B02.tif")
            .is_some());
    }

    #[tokio::test]
    async fn test_agera5() {
        let client = MockS3Client::new();
        client.insert("ewoc-aux-data", "AgERA5/2019/20190101/tmax.tif", "");
        client.insert("ewoc-aux-data", "AgERA5/2019/20190101/tmin.tif", "");
        client.insert("ewoc-aux-data", "AgERA5/2019/20190102/tmax.tif", "");
        let bucket = EwocBucket::with_client(client, "ewoc-aux-data", EwocBucketKind::AuxData)
            .await
            .unwrap();

        assert_eq!(
            bucket.list_agera5_products().await.unwrap(),
            vec!["AgERA5/2019/20190101", "AgERA5/2019/20190102"]
        );
        let collection = bucket.agera5_collection().await.unwrap();
        assert_eq!(collection.entries[0].product, "AgERA5_20190101");
        assert_eq!(collection.entries[0].date, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(collection.entries[0].path, "s3://ewoc-aux-data/AgERA5/2019/20190101");
    }

    #[tokio::test]
    async fn test_srtm() {
        let client = MockS3Client::new();
        client.insert("ewoc-aux-data", "srtm90/srtm_01_16.zip", zip_bytes("srtm_01_16.tif", b"dem"));
        let bucket = EwocBucket::with_client(client, "ewoc-aux-data", EwocBucketKind::AuxData)
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();

        bucket
            .download_srtm_tiles(&["srtm_01_16".to_string()], dir.path(), DemResolution::ThreeArcSeconds)
            .await
            .unwrap();
        assert_eq!(fs::read(dir.path().join("srtm3s/srtm_01_16.tif")).unwrap(), b"dem");
        assert!(!dir.path().join("srtm_01_16.zip").exists());
    }
}
