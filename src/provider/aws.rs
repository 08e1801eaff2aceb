use crate::config::Settings;
use crate::error::{Error, Result, SafeConversionError};
use crate::key_prefix::aws::{self, AwsBucket, DemNaming, DemResolution};
use crate::object_store::{local_path, ObjectStore};
use crate::product_id::{L8C2ProductId, ProductId, S1ProductId, S2ProductId};
use crate::s3::{S3Client, S3ObjOps};
use crate::safe::{self, PRODUCTS_DIR, TILES_DIR};
use std::path::{Path, PathBuf};
use tracing::info;

/// Sentinel-2 retrieval switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct S2Options {
    /// Rebuild `<id>.SAFE` from the flat download, L1C only.
    pub safe: bool,
    /// Fetch only the scene classification mask, L2A only.
    pub mask_only: bool,
}

/// One of the AWS open data buckets.
pub struct AwsEoBucket<C> {
    store: ObjectStore<C>,
    bucket: AwsBucket,
}

impl AwsEoBucket<S3Client> {
    pub async fn connect(settings: &Settings, bucket: AwsBucket) -> Result<Self> {
        let config = settings.aws_store(bucket)?;
        let client = S3Client::from_config(&config).await?;
        Ok(Self::with_client(client, bucket))
    }
}

impl<C: S3ObjOps> AwsEoBucket<C> {
    /// Open data buckets are not HEADed: the request cannot carry the requester-pays header.
    pub fn with_client(client: C, bucket: AwsBucket) -> Self {
        info!(%bucket, "AWS bucket ready");
        Self {
            store: ObjectStore::new(client, bucket.name()),
            bucket,
        }
    }

    pub fn bucket(&self) -> AwsBucket {
        self.bucket
    }

    pub fn store(&self) -> &ObjectStore<C> {
        &self.store
    }

    fn request_payer(&self) -> bool {
        self.bucket.requester_pays()
    }

    fn expect_bucket(&self, expected: AwsBucket, product: &dyn std::fmt::Display) -> Result<()> {
        if self.bucket != expected {
            return Err(Error::Configuration(format!(
                "{product} is stored in {expected}, not in {}",
                self.bucket
            )));
        }
        Ok(())
    }

    /// Download a Sentinel-1 product to `out_dir/<id>`, or `out_dir/<id>.SAFE` with `safe`.
    pub async fn download_s1_prd(&self, id: &S1ProductId, out_dir: &Path, safe: bool) -> Result<PathBuf> {
        self.expect_bucket(AwsBucket::SentinelS1L1c, id)?;
        let prefix = aws::s1_prefix(id);
        let product_dir = out_dir.join(id.to_string());
        self.store
            .download_prefix(&prefix, &product_dir, self.request_payer(), None)
            .await?;
        if safe {
            return safe::aws_to_safe(&product_dir, &ProductId::S1(id.clone()), None);
        }
        Ok(product_dir)
    }

    /// Download a Sentinel-2 product from the legacy buckets or from the COG bucket.
    ///
    /// Legacy products land in `out_dir/<id>/products` and `out_dir/<id>/tiles`, after the
    /// two roots they are read from.
    pub async fn download_s2_prd(
        &self,
        id: &S2ProductId,
        out_dir: &Path,
        options: S2Options,
    ) -> Result<PathBuf> {
        let cogs = self.bucket == AwsBucket::SentinelCogs;
        self.expect_bucket(AwsBucket::for_s2(id, cogs)?, id)?;
        if options.mask_only && id.is_l1c() {
            return Err(Error::Configuration(format!(
                "{id} is a L1C product and has no scene classification mask"
            )));
        }
        if options.safe && (cogs || !id.is_l1c()) {
            return Err(SafeConversionError::UnsupportedProduct(id.to_string()).into());
        }
        let product_dir = out_dir.join(id.to_string());
        if cogs {
            self.download_s2_cogs(id, &product_dir, options.mask_only).await?;
            return Ok(product_dir);
        }

        let tile_date_prefix = aws::s2_tile_date_prefix(id)?;
        let candidates = self
            .store
            .list_common_prefixes(&tile_date_prefix, self.request_payer())
            .await?;
        let sequence = aws::select_s2_sequence(self.bucket, &tile_date_prefix, &candidates)?;
        let prefixes = aws::s2_legacy_prefixes(id, sequence)?;

        if options.mask_only {
            let key = aws::s2_l2a_mask_key(&prefixes);
            self.store
                .download_file(&key, &local_path(&product_dir, &key), self.request_payer())
                .await?;
            return Ok(product_dir);
        }

        self.store
            .download_prefix(
                &prefixes.product,
                &product_dir.join(PRODUCTS_DIR),
                self.request_payer(),
                None,
            )
            .await?;
        self.store
            .download_prefix(
                &prefixes.tile,
                &product_dir.join(TILES_DIR),
                self.request_payer(),
                None,
            )
            .await?;

        if options.safe {
            return safe::aws_to_safe(&product_dir, &ProductId::S2(id.clone()), None);
        }
        Ok(product_dir)
    }

    async fn download_s2_cogs(&self, id: &S2ProductId, product_dir: &Path, mask_only: bool) -> Result<()> {
        let month_prefix = aws::s2_cogs_month_prefix(id)?;
        let candidates = self.store.list_common_prefixes(&month_prefix, false).await?;
        let product_prefix = aws::select_s2_cogs_product(id, &month_prefix, &candidates)?;
        if mask_only {
            let key = format!("{product_prefix}{}", aws::COGS_MASK_FILENAME);
            self.store
                .download_file(&key, &product_dir.join(aws::COGS_MASK_FILENAME), false)
                .await?;
        } else {
            self.store
                .download_prefix(&product_prefix, product_dir, false, None)
                .await?;
        }
        Ok(())
    }

    /// Download a Landsat Collection 2 product, restricted to `items` when given.
    pub async fn download_l8c2_prd(
        &self,
        id: &L8C2ProductId,
        out_dir: &Path,
        items: Option<&[String]>,
    ) -> Result<PathBuf> {
        self.expect_bucket(AwsBucket::UsgsLandsat, id)?;
        let filter = items
            .map(|items| {
                items
                    .iter()
                    .map(|item| id.item_filename(item))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .transpose()?;
        let product_dir = out_dir.join(id.to_string());
        self.store
            .download_prefix(
                &aws::l8c2_prefix(id),
                &product_dir,
                self.request_payer(),
                filter.as_deref(),
            )
            .await?;
        Ok(product_dir)
    }

    /// Download Copernicus DEM tiles, such as `N43E001`, straight into `out_dir`.
    pub async fn download_copdem_tiles(
        &self,
        tile_ids: &[String],
        out_dir: &Path,
        resolution: DemResolution,
        naming: DemNaming,
    ) -> Result<Vec<PathBuf>> {
        self.expect_bucket(resolution.bucket(), &"Copernicus DEM")?;
        let mut paths = vec![];
        for tile_id in tile_ids {
            let key = aws::copdem_key(tile_id, resolution)?;
            let path = out_dir.join(aws::copdem_filename(tile_id, resolution, naming)?);
            info!(key, path = %path.display(), "DEM tile");
            self.store.download_file(&key, &path, false).await?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::mock_client::MockS3Client;
    use std::fs;

    const S1_ID: &str = "S1A_IW_GRDH_1SDV_20210708T060105_20210708T060130_038682_04908E_8979";
    const L2A_ID: &str = "S2B_MSIL2A_20210714T131719_N0301_R124_T28WDB_20210714T160455";
    const L1C_ID: &str = "S2B_MSIL1C_20210714T131719_N0301_R124_T28WDB_20210714T141516";
    const L8_ID: &str = "LC08_L2SP_227099_20210721_20210729_02_T1";

    fn bucket(client: MockS3Client, bucket: AwsBucket) -> AwsEoBucket<MockS3Client> {
        AwsEoBucket::with_client(client, bucket)
    }

    #[tokio::test]
    async fn test_requester_pays_bucket_is_not_headed() {
        let client = MockS3Client::new().unreachable();
        let prefix = format!("GRD/2021/7/8/IW/DV/{S1_ID}/");
        client.insert("sentinel-s1-l1c", &format!("{prefix}manifest.safe"), "m");
        let s1 = bucket(client, AwsBucket::SentinelS1L1c);
        let dir = tempfile::tempdir().unwrap();

        let id = S1ProductId::parse(S1_ID).unwrap();
        let product_dir = s1.download_s1_prd(&id, dir.path(), false).await.unwrap();
        assert!(product_dir.join("manifest.safe").is_file());
    }

    #[tokio::test]
    async fn test_s1() {
        let client = MockS3Client::new();
        let prefix = format!("GRD/2021/7/8/IW/DV/{S1_ID}/");
        client.insert("sentinel-s1-l1c", &format!("{prefix}manifest.safe"), "m");
        client.insert("sentinel-s1-l1c", &format!("{prefix}measurement/iw-vv.tiff"), "vv");
        let s1 = bucket(client, AwsBucket::SentinelS1L1c);
        let dir = tempfile::tempdir().unwrap();

        let id = S1ProductId::parse(S1_ID).unwrap();
        let product_dir = s1.download_s1_prd(&id, dir.path(), false).await.unwrap();
        assert_eq!(product_dir, dir.path().join(S1_ID));
        assert!(product_dir.join("measurement/iw-vv.tiff").is_file());
    }

    #[tokio::test]
    async fn test_s2_legacy_picks_latest_sequence() {
        let client = MockS3Client::new().with_page_size(2);
        client.insert(
            "sentinel-s2-l2a",
            &format!("products/2021/7/14/{L2A_ID}/metadata.xml"),
            "product",
        );
        client.insert("sentinel-s2-l2a", "tiles/28/W/DB/2021/7/14/0/B01.jp2", "old");
        client.insert("sentinel-s2-l2a", "tiles/28/W/DB/2021/7/14/1/R20m/SCL.jp2", "scl");
        client.insert("sentinel-s2-l2a", "tiles/28/W/DB/2021/7/14/1/metadata.xml", "tile");
        let s2 = bucket(client, AwsBucket::SentinelS2L2a);
        let dir = tempfile::tempdir().unwrap();
        let id = S2ProductId::parse(L2A_ID).unwrap();

        let product_dir = s2.download_s2_prd(&id, dir.path(), S2Options::default()).await.unwrap();
        assert!(product_dir.join("products/metadata.xml").is_file());
        assert_eq!(
            fs::read_to_string(product_dir.join("tiles/R20m/SCL.jp2")).unwrap(),
            "scl"
        );
        assert!(!product_dir.join("tiles/B01.jp2").exists());
    }

    #[tokio::test]
    async fn test_s2_mask_only() {
        let client = MockS3Client::new();
        client.insert("sentinel-s2-l2a", "tiles/28/W/DB/2021/7/14/0/R20m/SCL.jp2", "scl");
        client.insert("sentinel-s2-l2a", "tiles/28/W/DB/2021/7/14/0/R20m/B05.jp2", "b05");
        let s2 = bucket(client, AwsBucket::SentinelS2L2a);
        let dir = tempfile::tempdir().unwrap();
        let id = S2ProductId::parse(L2A_ID).unwrap();
        let options = S2Options {
            mask_only: true,
            ..Default::default()
        };

        let product_dir = s2.download_s2_prd(&id, dir.path(), options).await.unwrap();
        assert!(product_dir.join("SCL.jp2").is_file());
        assert_eq!(s2.store().client().get_count(), 1);
    }

    #[tokio::test]
    async fn test_s2_no_sequence() {
        let s2 = bucket(MockS3Client::new(), AwsBucket::SentinelS2L2a);
        let dir = tempfile::tempdir().unwrap();
        let id = S2ProductId::parse(L2A_ID).unwrap();
        let err = s2
            .download_s2_prd(&id, dir.path(), S2Options::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_s2_option_checks() {
        let l1c = bucket(MockS3Client::new(), AwsBucket::SentinelS2L1c);
        let dir = tempfile::tempdir().unwrap();
        let id = S2ProductId::parse(L1C_ID).unwrap();
        let mask_only = S2Options {
            mask_only: true,
            ..Default::default()
        };
        assert!(matches!(
            l1c.download_s2_prd(&id, dir.path(), mask_only).await,
            Err(Error::Configuration(_))
        ));

        let l2a_id = S2ProductId::parse(L2A_ID).unwrap();
        assert!(matches!(
            l1c.download_s2_prd(&l2a_id, dir.path(), S2Options::default()).await,
            Err(Error::Configuration(_))
        ));
        assert_eq!(l1c.store().client().list_count(), 0);
    }

    #[tokio::test]
    async fn test_s2_cogs() {
        let client = MockS3Client::new();
        let month = "sentinel-s2-l2a-cogs/28/W/DB/2021/7/";
        client.insert("sentinel-cogs", &format!("{month}S2B_28WDB_20210714_0_L2A/B04.tif"), "b04");
        client.insert("sentinel-cogs", &format!("{month}S2B_28WDB_20210714_1_L2A/B04.tif"), "b04");
        client.insert("sentinel-cogs", &format!("{month}S2B_28WDB_20210714_1_L2A/SCL.tif"), "scl");
        client.insert("sentinel-cogs", &format!("{month}S2B_28WDB_20210717_0_L2A/SCL.tif"), "x");
        let cogs = bucket(client, AwsBucket::SentinelCogs);
        let dir = tempfile::tempdir().unwrap();
        let id = S2ProductId::parse(L2A_ID).unwrap();

        let product_dir = cogs.download_s2_prd(&id, dir.path(), S2Options::default()).await.unwrap();
        assert_eq!(fs::read_to_string(product_dir.join("SCL.tif")).unwrap(), "scl");
        assert!(product_dir.join("B04.tif").is_file());
    }

    #[tokio::test]
    async fn test_l8c2_items() {
        let client = MockS3Client::new();
        let prefix = format!("collection02/level-2/standard/oli-tirs/2021/227/099/{L8_ID}/");
        client.insert("usgs-landsat", &format!("{prefix}{L8_ID}_ST_B10.TIF"), "st");
        client.insert("usgs-landsat", &format!("{prefix}{L8_ID}_SR_B4.TIF"), "sr");
        client.insert("usgs-landsat", &format!("{prefix}{L8_ID}_MTL.json"), "{}");
        let landsat = bucket(client, AwsBucket::UsgsLandsat);
        let dir = tempfile::tempdir().unwrap();
        let id = L8C2ProductId::parse(L8_ID).unwrap();

        let items = vec!["ST_B10".to_string(), "MTL_JSON".to_string()];
        let product_dir = landsat
            .download_l8c2_prd(&id, dir.path(), Some(&items))
            .await
            .unwrap();
        assert!(product_dir.join(format!("{L8_ID}_ST_B10.TIF")).is_file());
        assert!(product_dir.join(format!("{L8_ID}_MTL.json")).is_file());
        assert!(!product_dir.join(format!("{L8_ID}_SR_B4.TIF")).exists());

        let unknown = vec!["B99".to_string()];
        assert!(matches!(
            landsat.download_l8c2_prd(&id, dir.path(), Some(&unknown)).await,
            Err(Error::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_copdem() {
        let client = MockS3Client::new();
        client.insert(
            "copernicus-dem-30m",
            "Copernicus_DSM_COG_10_N43_00_E001_00_DEM/Copernicus_DSM_COG_10_N43_00_E001_00_DEM.tif",
            "dem",
        );
        let dem = bucket(client, AwsBucket::CopernicusDem30m);
        let dir = tempfile::tempdir().unwrap();

        let paths = dem
            .download_copdem_tiles(
                &["N43E001".to_string()],
                dir.path(),
                DemResolution::OneArcSecond,
                DemNaming::Sen2Cor,
            )
            .await
            .unwrap();
        assert_eq!(paths, vec![dir.path().join("Copernicus_DSM_10_N43_00_E001_00_DEM.tif")]);
        assert!(paths[0].is_file());

        assert!(dem
            .download_copdem_tiles(&[], dir.path(), DemResolution::ThreeArcSeconds, DemNaming::Aws)
            .await
            .is_err());
    }
}
