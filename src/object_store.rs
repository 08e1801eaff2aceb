//! Bucket level transfers: lazy paginated listings, prefix downloads and uploads.
use crate::download_plan::{try_download, DownloadPlan, DownloadTask, Transfer, TransferSummary};
use crate::error::{Error, Result, TransferError};
use crate::s3::{ListPage, ListRequest, S3ObjOps};
use aws_sdk_s3::primitives::ByteStream;
use futures_util::stream::{self, Stream, TryStreamExt};
use std::path::{Component, Path, PathBuf};
use std::pin::pin;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// A client bound to one bucket.
pub struct ObjectStore<C> {
    client: C,
    bucket: String,
}

impl<C: S3ObjOps> ObjectStore<C> {
    pub fn new(client: C, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    /// Bind to `bucket` after checking it answers a HEAD request.
    pub async fn connect(client: C, bucket: &str) -> Result<Self> {
        client
            .head_bucket(bucket)
            .await
            .map_err(|e| Error::Configuration(format!("Bucket {bucket} is not reachable: {e}")))?;
        debug!(bucket, "connected");
        Ok(Self::new(client, bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
        request_payer: bool,
    ) -> Result<ListPage> {
        let request = ListRequest {
            bucket: &self.bucket,
            prefix,
            delimiter,
            continuation_token,
            request_payer,
        };
        self.client
            .list_objects_page(request)
            .await
            .map_err(|source| {
                TransferError::List {
                    bucket: self.bucket.clone(),
                    prefix: prefix.to_string(),
                    source,
                }
                .into()
            })
    }

    async fn next_keys(
        &self,
        prefix: &str,
        cursor: Cursor,
        request_payer: bool,
    ) -> Result<Option<(Vec<String>, Cursor)>> {
        let continuation_token = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };
        let page = self
            .list_page(prefix, None, continuation_token, request_payer)
            .await?;
        let keys = page.contents.ok_or_else(|| TransferError::MissingContents {
            bucket: self.bucket.clone(),
            prefix: prefix.to_string(),
            response: page.raw.clone(),
        })?;
        let cursor = match page.next_continuation_token {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };
        Ok(Some((keys, cursor)))
    }

    /// Every key under `prefix`, in store order.
    ///
    /// Pages are requested as the stream is consumed. A page without contents ends the stream
    /// with [`TransferError::MissingContents`].
    pub fn list<'a>(
        &'a self,
        prefix: &'a str,
        request_payer: bool,
    ) -> impl Stream<Item = Result<String>> + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| {
            self.next_keys(prefix, cursor, request_payer)
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<String, Error>)))
        .try_flatten()
    }

    /// Immediate sub-folders of `prefix`, each ending with `/`.
    pub async fn list_common_prefixes(&self, prefix: &str, request_payer: bool) -> Result<Vec<String>> {
        let mut common_prefixes = vec![];
        let mut continuation_token = None;
        loop {
            let page = self
                .list_page(prefix, Some("/"), continuation_token, request_payer)
                .await?;
            common_prefixes.extend(page.common_prefixes);
            match page.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }
        Ok(common_prefixes)
    }

    /// Build the download tasks mirroring `prefix` under `dest`.
    ///
    /// Folder markers are skipped. With `item_filter`, only keys containing one of its
    /// entries are kept.
    pub async fn plan_prefix(
        &self,
        prefix: &str,
        dest: &Path,
        request_payer: bool,
        item_filter: Option<&[String]>,
    ) -> Result<DownloadPlan> {
        let mut tasks = vec![];
        let mut keys = pin!(self.list(prefix, request_payer));
        while let Some(key) = keys.try_next().await? {
            if key.ends_with('/') {
                continue;
            }
            if let Some(filter) = item_filter {
                if !filter.iter().any(|item| key.contains(item.as_str())) {
                    continue;
                }
            }
            let relative = key.strip_prefix(prefix).unwrap_or(&key).trim_start_matches('/');
            if relative.is_empty() {
                continue;
            }
            let Some(relative) = contained_path(relative) else {
                warn!(bucket = %self.bucket, key, "key leaves the destination directory, skipped");
                continue;
            };
            tasks.push(DownloadTask::new(&self.bucket, &key, dest.join(relative), request_payer));
        }
        debug!(bucket = %self.bucket, prefix, tasks = tasks.len(), "planned prefix download");
        Ok(DownloadPlan::new(tasks))
    }

    /// Mirror every object under `prefix` into `dest`. Files already present are left alone.
    pub async fn download_prefix(
        &self,
        prefix: &str,
        dest: &Path,
        request_payer: bool,
        item_filter: Option<&[String]>,
    ) -> Result<TransferSummary> {
        info!(bucket = %self.bucket, prefix, dest = %dest.display(), "downloading prefix");
        let plan = self.plan_prefix(prefix, dest, request_payer, item_filter).await?;
        plan.execute(&self.client).await
    }

    pub async fn download_file(&self, key: &str, path: &Path, request_payer: bool) -> Result<Transfer> {
        let task = DownloadTask::new(&self.bucket, key, path, request_payer);
        try_download(&self.client, &task).await
    }

    async fn put_file(&self, path: &Path, key: &str) -> std::result::Result<u64, TransferError> {
        let upload_error = |source| TransferError::Upload {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            path: path.to_path_buf(),
            source,
        };
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| upload_error(e.into()))?
            .len();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| upload_error(e.into()))?;
        self.client
            .put_object(&self.bucket, key, body)
            .await
            .map_err(upload_error)?;
        debug!(key, path = %path.display(), size, "upload complete");
        Ok(size)
    }

    /// Upload one file, returning its size in bytes.
    pub async fn upload_file(&self, path: &Path, key: &str) -> Result<u64> {
        Ok(self.put_file(path, key).await?)
    }

    /// Upload the files under `local_dir` to `object_prefix`, keeping their relative paths.
    ///
    /// With `suffix`, only files whose name ends with it are sent. Returns the number of files
    /// and bytes uploaded; the first failure aborts the walk.
    pub async fn upload_prefix(
        &self,
        local_dir: &Path,
        object_prefix: &str,
        suffix: Option<&str>,
    ) -> Result<(usize, u64)> {
        let mut count = 0;
        let mut bytes = 0;
        for entry in WalkDir::new(local_dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if let Some(suffix) = suffix {
                if !entry.file_name().to_string_lossy().ends_with(suffix) {
                    continue;
                }
            }
            let relative = path.strip_prefix(local_dir).unwrap_or(path);
            let key = object_key(object_prefix, relative);
            let size = self
                .put_file(path, &key)
                .await
                .map_err(|source| TransferError::UploadPrefix {
                    dir: local_dir.to_path_buf(),
                    prefix: object_prefix.to_string(),
                    source: Box::new(source),
                })?;
            count += 1;
            bytes += size;
        }
        info!(
            bucket = %self.bucket,
            prefix = object_prefix,
            files = count,
            bytes,
            "uploaded directory"
        );
        Ok((count, bytes))
    }
}

/// Join `relative` to `prefix` with `/` separators whatever the host platform.
fn object_key(prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        relative
    } else {
        format!("{prefix}/{relative}")
    }
}

/// `relative` as a path that stays below the directory it is joined to.
pub(crate) fn contained_path(relative: &str) -> Option<PathBuf> {
    let path = Path::new(relative);
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        .then(|| path.to_path_buf())
}

/// `dest/<name>` for the last path segment of `key`.
pub fn local_path(dest: &Path, key: &str) -> PathBuf {
    dest.join(key.rsplit('/').next().unwrap_or(key))
}
