use super::io_error;
use super::layout::{Destination, PlacementRule, SafeLayout};
use super::manifest::{Manifest, MANIFEST_FILENAME};
use crate::error::SafeConversionError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flat folder holding the objects of the `products/` S3 root.
pub const PRODUCTS_DIR: &str = "products";
/// Flat folder holding the objects of the `tiles/` S3 root.
pub const TILES_DIR: &str = "tiles";

/// Empty folders every SAFE carries, AWS has no objects for them.
const PLACEHOLDERS: [&str; 3] = ["rep_info", "HTML", "AUX_DATA"];

pub(super) fn read_layout(flat_dir: &Path) -> Result<(Manifest, SafeLayout), SafeConversionError> {
    let manifest = Manifest::read(&flat_dir.join(PRODUCTS_DIR).join(MANIFEST_FILENAME))?;
    let layout = SafeLayout::from_data_objects(&manifest.parse()?);
    Ok((manifest, layout))
}

/// Copy the flat download into `staging` following `rules`. Returns the number of files placed.
pub(super) fn place(
    flat_dir: &Path,
    staging: &Path,
    manifest: &Manifest,
    layout: &SafeLayout,
    rules: &[PlacementRule],
) -> Result<usize, SafeConversionError> {
    for dir in layout.directories() {
        create_dir(&staging.join(dir))?;
    }
    for placeholder in PLACEHOLDERS {
        create_dir(&staging.join(placeholder))?;
    }
    copy(&manifest.path, &staging.join(MANIFEST_FILENAME))?;

    let mut placed = 1;
    for rule in rules {
        let count = apply(rule, flat_dir, staging, layout)?;
        debug!(source = rule.source, count, "placement rule applied");
        placed += count;
    }
    Ok(placed)
}

fn apply(
    rule: &PlacementRule,
    flat_dir: &Path,
    staging: &Path,
    layout: &SafeLayout,
) -> Result<usize, SafeConversionError> {
    match &rule.destination {
        Destination::Root(name) => {
            if !layout.declares(Path::new(name)) {
                debug!(file = name, "not declared in manifest, skipped");
                return Ok(0);
            }
            match first_source(flat_dir, rule)? {
                Some(source) => copy(&source, &staging.join(name)).map(|_| 1),
                None => missing(rule, name),
            }
        }
        Destination::UnitFile(group, name) => {
            let target = layout
                .file(group, name)
                .map(Path::to_path_buf)
                .or_else(|| layout.unit_dir(group).map(|dir| dir.join(name)));
            match (target, first_source(flat_dir, rule)?) {
                (Some(target), Some(source)) => copy(&source, &staging.join(target)).map(|_| 1),
                (_, _) => missing(rule, name),
            }
        }
        Destination::Folder {
            group,
            folder,
            strip,
        } => {
            let Some(dir) = layout.folder(group, folder) else {
                debug!(?group, folder, "folder not declared, rule skipped");
                return Ok(0);
            };
            let mut count = 0;
            for source in sources(flat_dir, rule.source)? {
                let name = source
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = match strip {
                    Some(fragment) => name.replacen(fragment, "", 1),
                    None => name,
                };
                let target = dir.join(&name);
                if !layout.declares(&target) {
                    debug!(file = %target.display(), "not declared in manifest, skipped");
                    continue;
                }
                copy(&source, &staging.join(target))?;
                count += 1;
            }
            Ok(count)
        }
        Destination::Auxiliary(group, name) => {
            let Some(aux_dir) = layout
                .folder(group, "AUX_DATA")
                .map(Path::to_path_buf)
                .or_else(|| layout.unit_dir(group).map(|dir| dir.join("AUX_DATA")))
            else {
                return missing(rule, name);
            };
            let target = aux_dir.join(name);
            if !layout.declares(&target) {
                debug!(file = %target.display(), "not declared in manifest, skipped");
                create_dir(&staging.join(aux_dir))?;
                return Ok(0);
            }
            match first_source(flat_dir, rule)? {
                Some(source) => copy(&source, &staging.join(target)).map(|_| 1),
                None => {
                    warn!(source = rule.source, "no auxiliary data to copy");
                    create_dir(&staging.join(aux_dir))?;
                    Ok(0)
                }
            }
        }
        Destination::BandImages(group) => {
            let images = layout.images(group);
            if images.is_empty() {
                return missing(rule, "IMG_DATA");
            }
            for image in &images {
                let name = image
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let band = name.rsplit('_').next().unwrap_or(&name);
                let source = flat_dir.join(rule.source).join(band);
                if !source.is_file() {
                    missing(rule, &image.to_string_lossy())?;
                    continue;
                }
                copy(&source, &staging.join(image))?;
            }
            Ok(images.len())
        }
    }
}

fn missing(rule: &PlacementRule, target: &str) -> Result<usize, SafeConversionError> {
    if rule.required {
        return Err(SafeConversionError::MissingSource {
            target: target.to_string(),
            pattern: rule.source.to_string(),
        });
    }
    warn!(target, source = rule.source, "optional file not found");
    Ok(0)
}

/// Files of the flat download matching `pattern`, sorted by path.
fn sources(flat_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, SafeConversionError> {
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&flat_dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full_pattern).map_err(|e| SafeConversionError::Io {
        path: flat_dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;
    let mut sources = vec![];
    for path in paths {
        let path = path.map_err(|e| SafeConversionError::Io {
            path: e.path().to_path_buf(),
            source: e.into(),
        })?;
        if path.is_file() {
            sources.push(path);
        }
    }
    Ok(sources)
}

fn first_source(flat_dir: &Path, rule: &PlacementRule) -> Result<Option<PathBuf>, SafeConversionError> {
    let mut sources = sources(flat_dir, rule.source)?;
    if sources.len() > 1 {
        warn!(
            source = rule.source,
            count = sources.len(),
            "several candidates, using the first"
        );
    }
    Ok((!sources.is_empty()).then(|| sources.swap_remove(0)))
}

fn create_dir(dir: &Path) -> Result<(), SafeConversionError> {
    fs::create_dir_all(dir).map_err(io_error(dir))
}

fn copy(source: &Path, target: &Path) -> Result<(), SafeConversionError> {
    if let Some(parent) = target.parent() {
        create_dir(parent)?;
    }
    debug!(from = %source.display(), to = %target.display(), "copy");
    fs::copy(source, target).map_err(io_error(source))?;
    Ok(())
}
