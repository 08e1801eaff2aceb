//! Provider buckets: one [`ObjectStore`](crate::object_store::ObjectStore) plus the key layout
//! of the provider behind it.
pub mod aws;
pub mod dias;
pub mod ewoc;

pub use aws::{AwsEoBucket, S2Options};
pub use dias::DiasBucket;
pub use ewoc::{ArdCollection, ArdProduct, Agera5Collection, EwocBucket};

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Unpack `archive` into `out_dir` and delete it.
pub(crate) fn unzip(archive: &Path, out_dir: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|e| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: {}", archive.display(), e),
        ))
    })?;
    fs::create_dir_all(out_dir)?;
    zip.extract(out_dir).map_err(std::io::Error::from)?;
    debug!(archive = %archive.display(), files = zip.len(), "extracted");
    fs::remove_file(archive)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    pub(crate) fn zip_bytes(name: &str, content: &[u8]) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_unzip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("N43E001.SRTMGL1.hgt.zip");
        fs::write(&archive, zip_bytes("N43E001.hgt", b"hgt")).unwrap();

        unzip(&archive, dir.path()).unwrap();
        assert_eq!(fs::read(dir.path().join("N43E001.hgt")).unwrap(), b"hgt");
        assert!(!archive.exists());
    }

    #[test]
    fn test_unzip_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();
        assert!(unzip(&archive, dir.path()).is_err());
    }
}
