use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by the object store operations in [`crate::s3::S3ObjOps`].
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Nothing found in bucket {bucket} under {prefix}")]
    NotFound { bucket: String, prefix: String },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    SafeConversion(#[from] SafeConversionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A product identifier token failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {family} identifier: bad {field} '{value}'")]
pub struct FormatError {
    pub family: &'static str,
    pub field: &'static str,
    pub value: String,
}

impl FormatError {
    pub fn new(family: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self {
            family,
            field,
            value: value.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Listing of s3://{bucket}/{prefix} has no contents: {response}")]
    MissingContents {
        bucket: String,
        prefix: String,
        response: String,
    },

    #[error("Unable to list s3://{bucket}/{prefix}")]
    List {
        bucket: String,
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Unable to download s3://{bucket}/{key} to {}", path.display())]
    Download {
        bucket: String,
        key: String,
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Unable to upload {} to s3://{bucket}/{key}", path.display())]
    Upload {
        bucket: String,
        key: String,
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Upload of {} to {prefix} aborted", dir.display())]
    UploadPrefix {
        dir: PathBuf,
        prefix: String,
        #[source]
        source: Box<TransferError>,
    },
}

#[derive(Error, Debug)]
pub enum SafeConversionError {
    #[error("No productInfo.json sidecar in {}", .0.display())]
    MissingSidecar(PathBuf),

    #[error("Unable to read sidecar {}", path.display())]
    InvalidSidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No manifest.safe in {}", .0.display())]
    MissingManifest(PathBuf),

    #[error("Invalid manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("No source file for {target} (looked for {pattern})")]
    MissingSource { target: String, pattern: String },

    #[error("Sidecar path {0} leaves the product directory")]
    PathOutsideProduct(String),

    #[error("SAFE conversion not supported for {0}")]
    UnsupportedProduct(String),

    #[error("SAFE directory {} already exists", .0.display())]
    TargetExists(PathBuf),

    #[error("SAFE conversion failed on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Unable to clone request")]
    Clone,
}
