//! Utility functions for creating s3 clients and the object operations the stores rely on
use crate::config::{Credentials, StoreConfig};
use crate::error::{MapError, Result, StoreError};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::RequestPayer;
use aws_sdk_s3::Client;
use aws_smithy_runtime_api::client::orchestrator::HttpRequest;
use tracing::debug;

#[cfg(test)]
pub(crate) mod mock_client;

/// One page request of a `ListObjectsV2` listing.
#[derive(Debug, Clone)]
pub struct ListRequest<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub delimiter: Option<&'a str>,
    pub continuation_token: Option<String>,
    pub request_payer: bool,
}

/// One page of a listing.
///
/// `contents` is `None` when the store left the field out of its answer, which happens
/// for empty prefixes as well as for malformed responses.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub contents: Option<Vec<String>>,
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
    /// Debug rendering of the store answer, kept for error reports.
    pub raw: String,
}

pub trait S3ObjOps {
    async fn head_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn list_objects_page(&self, request: ListRequest<'_>) -> Result<ListPage, StoreError>;

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        request_payer: bool,
    ) -> Result<ByteStream, StoreError>;

    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream) -> Result<(), StoreError>;
}

/// S3 client bound to one endpoint and credential set.
#[derive(Clone, Debug)]
pub struct S3Client {
    client: Client,
    strip_x_id: bool,
}

impl S3Client {
    pub fn new(client: Client, strip_x_id: bool) -> Self {
        Self { client, strip_x_id }
    }

    pub async fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = client_from_config(config).await;
        Ok(Self::new(client, config.strip_x_id))
    }
}

pub async fn client_from_config(config: &StoreConfig) -> Client {
    let loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    let loader = match &config.credentials {
        Credentials::Anonymous => loader.no_credentials(),
        Credentials::Static {
            access_key_id,
            secret_access_key,
        } => loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "eo-dag",
        )),
        Credentials::Profile { name } => loader.profile_name(name),
    };
    let base_config = loader.load().await;

    let mut s3_config = aws_sdk_s3::config::Builder::from(&base_config)
        .force_path_style(config.force_path_style);
    if let Some(endpoint) = &config.endpoint_url {
        s3_config = s3_config.endpoint_url(endpoint);
    }

    Client::from_conf(s3_config.build())
}

fn request_payer(enabled: bool) -> Option<RequestPayer> {
    enabled.then_some(RequestPayer::Requester)
}

impl S3ObjOps for S3Client {
    async fn head_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client.head_bucket().bucket(bucket).send().await?;
        Ok(())
    }

    async fn list_objects_page(&self, request: ListRequest<'_>) -> Result<ListPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(request.bucket)
            .prefix(request.prefix)
            .set_delimiter(request.delimiter.map(str::to_string))
            .set_continuation_token(request.continuation_token)
            .set_request_payer(request_payer(request.request_payer))
            .send()
            .await?;

        let raw = format!("{output:?}");
        let contents = output.contents.map(|objects| {
            objects
                .into_iter()
                .filter_map(|object| object.key)
                .collect::<Vec<_>>()
        });
        let common_prefixes = output
            .common_prefixes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|common| common.prefix)
            .collect();

        Ok(ListPage {
            contents,
            common_prefixes,
            next_continuation_token: output.next_continuation_token,
            raw,
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        request_payer_enabled: bool,
    ) -> Result<ByteStream, StoreError> {
        debug!(bucket, key, "GET");
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_request_payer(request_payer(request_payer_enabled));
        let object = if self.strip_x_id {
            request
                .customize()
                .map_request(strip_x_id_get_object_param_from_uri)
                .send()
                .await?
        } else {
            request.send().await?
        };
        Ok(object.body)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream) -> Result<(), StoreError> {
        debug!(bucket, key, "PUT");
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await?;
        Ok(())
    }
}

/// Some S3 compatible gateways reject the 'x-id=GetObject' param. This function can be passed to
/// the `GetObjectFluentBuilder::map_request()` method to strip the offending param from the
/// generated uri.
fn strip_x_id_get_object_param_from_uri(req: HttpRequest) -> std::result::Result<HttpRequest, MapError> {
    let mut r = req.try_clone().ok_or(MapError::Clone)?;
    let uri = r
        .uri()
        .replace("?x-id=GetObject&", "?")
        .replace("&x-id=GetObject", "")
        .replace("?x-id=GetObject", "");
    let _ = r.set_uri(uri);
    Ok(r)
}
