use super::unzip;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::key_prefix::dias;
use crate::object_store::ObjectStore;
use crate::product_id::{S1ProductId, S2ProductId, SAFE_SUFFIX};
use crate::s3::{S3Client, S3ObjOps};
use std::path::{Path, PathBuf};
use tracing::info;

/// The DIAS EO data bucket. Products are stored as SAFE folders under date partitions.
pub struct DiasBucket<C> {
    store: ObjectStore<C>,
}

impl DiasBucket<S3Client> {
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let config = settings.dias_store()?;
        let client = S3Client::from_config(&config).await?;
        Self::with_client(client).await
    }
}

impl<C: S3ObjOps> DiasBucket<C> {
    pub async fn with_client(client: C) -> Result<Self> {
        let store = ObjectStore::connect(client, dias::BUCKET).await?;
        info!("DIAS bucket ready");
        Ok(Self { store })
    }

    pub fn store(&self) -> &ObjectStore<C> {
        &self.store
    }

    /// Download a Sentinel-1 product to `out_dir/<id>.SAFE`.
    pub async fn download_s1_prd(&self, id: &S1ProductId, out_dir: &Path) -> Result<PathBuf> {
        let product_dir = out_dir.join(format!("{id}{SAFE_SUFFIX}"));
        self.store
            .download_prefix(&dias::s1_prefix(id), &product_dir, false, None)
            .await?;
        Ok(product_dir)
    }

    /// Download a Sentinel-2 product to `out_dir/<id>.SAFE`.
    ///
    /// With `mask_only`, only the 20m scene classification of an L2A product is fetched.
    pub async fn download_s2_prd(&self, id: &S2ProductId, out_dir: &Path, mask_only: bool) -> Result<PathBuf> {
        if mask_only && id.is_l1c() {
            return Err(Error::Configuration(format!(
                "{id} is a L1C product and has no scene classification mask"
            )));
        }
        let filter = mask_only.then(|| vec![dias::L2A_MASK_FILTER.to_string()]);
        let product_dir = out_dir.join(format!("{id}{SAFE_SUFFIX}"));
        self.store
            .download_prefix(&dias::s2_prefix(id), &product_dir, false, filter.as_deref())
            .await?;
        Ok(product_dir)
    }

    /// Download and unpack SRTM 1 arc-second tiles, e.g. `N43E001`, into `out_dir`.
    pub async fn download_srtm1s_tiles(&self, tile_ids: &[String], out_dir: &Path) -> Result<()> {
        for tile_id in tile_ids {
            let key = dias::srtm1s_key(tile_id);
            let archive = out_dir.join(dias::srtm1s_filename(tile_id));
            info!(key, "SRTM tile");
            self.store.download_file(&key, &archive, false).await?;
            unzip(&archive, out_dir)?;
        }
        Ok(())
    }
}
