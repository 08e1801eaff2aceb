use super::io_error;
use crate::object_store::contained_path;
use crate::error::SafeConversionError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SIDECAR_FILENAME: &str = "productInfo.json";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProductInfo {
    /// SAFE path -> flat path
    filename_map: BTreeMap<String, String>,
}

pub(super) fn read_filename_map(flat_dir: &Path) -> Result<BTreeMap<String, String>, SafeConversionError> {
    let path = flat_dir.join(SIDECAR_FILENAME);
    if !path.is_file() {
        return Err(SafeConversionError::MissingSidecar(flat_dir.to_path_buf()));
    }
    let content = fs::read_to_string(&path).map_err(io_error(&path))?;
    let info: ProductInfo = serde_json::from_str(&content)
        .map_err(|source| SafeConversionError::InvalidSidecar { path, source })?;
    for (safe_name, flat_name) in &info.filename_map {
        for name in [safe_name, flat_name] {
            if contained_path(name).is_none() {
                return Err(SafeConversionError::PathOutsideProduct(name.clone()));
            }
        }
    }
    Ok(info.filename_map)
}

/// Files moved into staging, as `(flat path, staged path)` pairs.
pub(super) type Moves = Vec<(PathBuf, PathBuf)>;

/// Move every mapped file from `flat_dir` into `staging`.
///
/// On failure the files already moved are put back before the error is returned.
pub(super) fn place(
    flat_dir: &Path,
    staging: &Path,
    filename_map: &BTreeMap<String, String>,
) -> Result<Moves, SafeConversionError> {
    let mut moved: Moves = vec![];
    for (safe_name, flat_name) in filename_map {
        let source = flat_dir.join(flat_name);
        let target = staging.join(safe_name);
        if let Err(e) = move_file(&source, &target, safe_name, flat_name) {
            restore(&moved);
            return Err(e);
        }
        moved.push((source, target));
    }
    Ok(moved)
}

fn move_file(
    source: &Path,
    target: &Path,
    safe_name: &str,
    flat_name: &str,
) -> Result<(), SafeConversionError> {
    if !source.is_file() {
        return Err(SafeConversionError::MissingSource {
            target: safe_name.to_string(),
            pattern: flat_name.to_string(),
        });
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    debug!(from = %source.display(), to = %target.display(), "rename");
    fs::rename(source, target).map_err(io_error(source))
}

pub(super) fn restore(moved: &[(PathBuf, PathBuf)]) {
    for (source, target) in moved.iter().rev() {
        if let Err(e) = fs::rename(target, source) {
            warn!(file = %target.display(), error = %e, "unable to move file back");
        }
    }
}
