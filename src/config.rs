//! Store configuration values.
//!
//! The library only ever sees resolved [`StoreConfig`] values. [`Settings`] gathers them
//! from a TOML file and a caller supplied variable lookup, so that reading the process
//! environment stays in the binary.
use crate::error::{Error, Result};
use crate::key_prefix::aws::AwsBucket;
use crate::key_prefix::ewoc::{EwocBucketKind, DEFAULT_BUCKET_PREFIX};
use crate::key_prefix::{dias, ewoc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    #[default]
    Anonymous,
    Static {
        access_key_id: String,
        secret_access_key: String,
    },
    Profile {
        name: String,
    },
}

/// Everything needed to build a client bound to one bucket.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub bucket: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub force_path_style: bool,
    /// Drop the `x-id=GetObject` query parameter, which some S3 gateways reject.
    #[serde(default)]
    pub strip_x_id: bool,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl StoreConfig {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            endpoint_url: None,
            region: default_region(),
            credentials: Credentials::Anonymous,
            force_path_style: false,
            strip_x_id: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::Configuration("Bucket name is empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint_url {
            let url = Url::parse(endpoint).map_err(|e| {
                Error::Configuration(format!("Invalid endpoint url '{endpoint}': {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Configuration(format!(
                    "Unsupported endpoint scheme in '{endpoint}'"
                )));
            }
        }
        match &self.credentials {
            Credentials::Static {
                access_key_id,
                secret_access_key,
            } if access_key_id.is_empty() || secret_access_key.is_empty() => Err(
                Error::Configuration(format!("Empty credentials for bucket {}", self.bucket)),
            ),
            Credentials::Profile { name } if name.is_empty() => {
                Err(Error::Configuration("Empty profile name".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AwsSettings {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DiasSettings {
    #[serde(default = "default_dias_endpoint")]
    pub endpoint_url: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub strip_x_id: bool,
}

fn default_dias_endpoint() -> String {
    dias::ENDPOINT_URL.to_string()
}

impl Default for DiasSettings {
    fn default() -> Self {
        Self {
            endpoint_url: default_dias_endpoint(),
            access_key_id: None,
            secret_access_key: None,
            strip_x_id: false,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EwocSettings {
    #[serde(default = "default_ewoc_endpoint")]
    pub endpoint_url: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub dev_mode: bool,
    #[serde(default = "default_bucket_prefix")]
    pub bucket_prefix: String,
}

fn default_ewoc_endpoint() -> String {
    ewoc::ENDPOINT_URL.to_string()
}

fn default_bucket_prefix() -> String {
    DEFAULT_BUCKET_PREFIX.to_string()
}

impl Default for EwocSettings {
    fn default() -> Self {
        Self {
            endpoint_url: default_ewoc_endpoint(),
            access_key_id: None,
            secret_access_key: None,
            dev_mode: false,
            bucket_prefix: default_bucket_prefix(),
        }
    }
}

/// Settings file, e.g.
///
/// ```toml
/// [aws]
/// profile = "eo"
///
/// [ewoc]
/// dev_mode = true
/// ```
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub aws: AwsSettings,
    #[serde(default)]
    pub dias: DiasSettings,
    #[serde(default)]
    pub ewoc: EwocSettings,
}

impl Settings {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| {
            Error::Configuration(format!("{}: {}", path.as_ref().display(), e))
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Overlay variables such as `EWOC_S3_ACCESS_KEY_ID` on top of the file values.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup("AWS_PROFILE") {
            self.aws.profile = Some(profile);
        }
        override_with(&mut self.aws.access_key_id, lookup("AWS_ACCESS_KEY_ID"));
        override_with(&mut self.aws.secret_access_key, lookup("AWS_SECRET_ACCESS_KEY"));

        if let Some(endpoint) = lookup("DIAS_ENDPOINT_URL") {
            self.dias.endpoint_url = endpoint;
        }
        override_with(&mut self.dias.access_key_id, lookup("DIAS_ACCESS_KEY_ID"));
        override_with(&mut self.dias.secret_access_key, lookup("DIAS_SECRET_ACCESS_KEY"));

        if let Some(endpoint) = lookup("EWOC_ENDPOINT_URL") {
            self.ewoc.endpoint_url = endpoint;
        }
        override_with(&mut self.ewoc.access_key_id, lookup("EWOC_S3_ACCESS_KEY_ID"));
        override_with(
            &mut self.ewoc.secret_access_key,
            lookup("EWOC_S3_SECRET_ACCESS_KEY"),
        );
        if let Some(dev_mode) = lookup("EWOC_DEV_MODE") {
            self.ewoc.dev_mode = parse_flag("EWOC_DEV_MODE", &dev_mode)?;
        }
        Ok(self)
    }

    pub fn aws_store(&self, bucket: AwsBucket) -> Result<StoreConfig> {
        let credentials = match (&self.aws.access_key_id, &self.aws.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Credentials::Static {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            },
            _ => match &self.aws.profile {
                Some(name) => Credentials::Profile { name: name.clone() },
                None => Credentials::Anonymous,
            },
        };
        if bucket.requester_pays() && credentials == Credentials::Anonymous {
            return Err(Error::Configuration(format!(
                "{bucket} is a requester pays bucket and needs AWS credentials"
            )));
        }
        let config = StoreConfig {
            region: bucket.region().to_string(),
            credentials,
            ..StoreConfig::new(bucket.name())
        };
        config.validate()?;
        Ok(config)
    }

    pub fn dias_store(&self) -> Result<StoreConfig> {
        let credentials = match (&self.dias.access_key_id, &self.dias.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Credentials::Static {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            },
            _ => Credentials::Anonymous,
        };
        let config = StoreConfig {
            endpoint_url: Some(self.dias.endpoint_url.clone()),
            credentials,
            force_path_style: true,
            strip_x_id: self.dias.strip_x_id,
            ..StoreConfig::new(dias::BUCKET)
        };
        config.validate()?;
        Ok(config)
    }

    pub fn ewoc_store(&self, kind: EwocBucketKind) -> Result<StoreConfig> {
        let (Some(access_key_id), Some(secret_access_key)) =
            (&self.ewoc.access_key_id, &self.ewoc.secret_access_key)
        else {
            return Err(Error::Configuration(
                "EWoC buckets need EWOC_S3_ACCESS_KEY_ID and EWOC_S3_SECRET_ACCESS_KEY"
                    .to_string(),
            ));
        };
        let bucket = kind.bucket_name(&self.ewoc.bucket_prefix, self.ewoc.dev_mode);
        let config = StoreConfig {
            endpoint_url: Some(self.ewoc.endpoint_url.clone()),
            credentials: Credentials::Static {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            },
            force_path_style: true,
            ..StoreConfig::new(&bucket)
        };
        config.validate()?;
        Ok(config)
    }
}

fn override_with(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Configuration(format!("{name} must be a boolean, got '{value}'"))),
    }
}
