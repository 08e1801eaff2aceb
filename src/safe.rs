//! Rebuild ESA SAFE directories from the flat layout of the AWS Sentinel buckets.
//!
//! Files are assembled in a hidden staging directory next to the target which is renamed to
//! `<id>.SAFE` once everything is in place. Any failure removes the staging directory and
//! leaves the flat download as it was. The flat download is deleted only after success.
pub mod layout;
pub mod manifest;
mod s1;
mod s2_l1c;

pub use layout::{SafeGroup, SafeLayout, AWS_L1C_LAYOUT, AWS_L1C_LAYOUT_VERSION};
pub use s1::SIDECAR_FILENAME;
pub use s2_l1c::{PRODUCTS_DIR, TILES_DIR};

use crate::error::{Result, SafeConversionError};
use crate::product_id::{ProductId, SAFE_SUFFIX};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    FlatDownloaded,
    ManifestParsed,
    LayoutBuilt,
    FilesPlaced,
    SafeComplete,
    Aborted,
}

/// Tracks one conversion and cleans the staging directory unless it completed.
struct Conversion {
    product: String,
    staging: PathBuf,
    state: ConversionState,
}

impl Conversion {
    fn start(product: String, staging: PathBuf) -> Self {
        debug!(%product, state = ?ConversionState::FlatDownloaded, "SAFE conversion");
        Self {
            product,
            staging,
            state: ConversionState::FlatDownloaded,
        }
    }

    fn advance(&mut self, next: ConversionState) {
        debug!(product = %self.product, from = ?self.state, to = ?next, "SAFE conversion");
        self.state = next;
    }
}

impl Drop for Conversion {
    fn drop(&mut self) {
        if self.state == ConversionState::SafeComplete {
            return;
        }
        self.advance(ConversionState::Aborted);
        if self.staging.exists() {
            if let Err(e) = fs::remove_dir_all(&self.staging) {
                warn!(dir = %self.staging.display(), error = %e, "unable to remove staging directory");
            }
        }
    }
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SafeConversionError {
    let path = path.to_path_buf();
    move |source| SafeConversionError::Io { path, source }
}

/// Convert the flat AWS download in `flat_dir` to `<out_root>/<id>.SAFE`.
///
/// `out_root` defaults to the parent of `flat_dir`. Sentinel-1 products and Sentinel-2 L1C
/// products are supported.
pub fn aws_to_safe(flat_dir: &Path, id: &ProductId, out_root: Option<&Path>) -> Result<PathBuf> {
    let out_root = match out_root {
        Some(root) => root.to_path_buf(),
        None => flat_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let target = out_root.join(format!("{id}{SAFE_SUFFIX}"));
    if target.exists() {
        return Err(SafeConversionError::TargetExists(target).into());
    }
    let staging = out_root.join(format!(".{id}{SAFE_SUFFIX}.partial"));

    match id {
        ProductId::S1(_) => {
            // Read before anything is written
            let filename_map = s1::read_filename_map(flat_dir)?;
            let mut conversion = Conversion::start(id.to_string(), staging.clone());
            conversion.advance(ConversionState::ManifestParsed);
            prepare_staging(&staging)?;
            conversion.advance(ConversionState::LayoutBuilt);
            let moved = s1::place(flat_dir, &staging, &filename_map)?;
            conversion.advance(ConversionState::FilesPlaced);
            commit_moves(&mut conversion, &staging, &target, &moved)?;
            info!(product = %id, files = filename_map.len(), "SAFE product ready");
        }
        ProductId::S2(s2) if s2.is_l1c() => {
            let mut conversion = Conversion::start(id.to_string(), staging.clone());
            let (manifest, layout) = s2_l1c::read_layout(flat_dir)?;
            conversion.advance(ConversionState::ManifestParsed);
            prepare_staging(&staging)?;
            conversion.advance(ConversionState::LayoutBuilt);
            let placed = s2_l1c::place(flat_dir, &staging, &manifest, &layout, AWS_L1C_LAYOUT)?;
            conversion.advance(ConversionState::FilesPlaced);
            commit(&mut conversion, &staging, &target)?;
            info!(
                product = %id,
                files = placed,
                layout_version = AWS_L1C_LAYOUT_VERSION,
                "SAFE product ready"
            );
        }
        other => return Err(SafeConversionError::UnsupportedProduct(other.to_string()).into()),
    }

    fs::remove_dir_all(flat_dir).map_err(io_error(flat_dir))?;
    Ok(target)
}

fn prepare_staging(staging: &Path) -> Result<(), SafeConversionError> {
    if staging.exists() {
        debug!(dir = %staging.display(), "removing stale staging directory");
        fs::remove_dir_all(staging).map_err(io_error(staging))?;
    }
    fs::create_dir_all(staging).map_err(io_error(staging))
}

fn commit(conversion: &mut Conversion, staging: &Path, target: &Path) -> Result<(), SafeConversionError> {
    fs::rename(staging, target).map_err(io_error(target))?;
    conversion.advance(ConversionState::SafeComplete);
    Ok(())
}

/// Commit a conversion made of moves, putting the files back in the flat tree if it fails.
fn commit_moves(
    conversion: &mut Conversion,
    staging: &Path,
    target: &Path,
    moved: &[(PathBuf, PathBuf)],
) -> Result<(), SafeConversionError> {
    if let Err(e) = commit(conversion, staging, target) {
        s1::restore(moved);
        return Err(e);
    }
    Ok(())
}
