use crate::error::{Error, Result, TransferError};
use crate::s3::S3ObjOps;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub bucket: String,
    pub key: String,
    pub output: PathBuf,
    #[serde(default)]
    pub request_payer: bool,
}

impl DownloadTask {
    pub fn new(bucket: &str, key: &str, output: impl Into<PathBuf>, request_payer: bool) -> Self {
        DownloadTask {
            bucket: bucket.to_string(),
            key: key.to_string(),
            output: output.into(),
            request_payer,
        }
    }
}

/// Outcome of a single object download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Downloaded(u64),
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}

impl TransferSummary {
    fn record(&mut self, transfer: Transfer) {
        match transfer {
            Transfer::Downloaded(bytes) => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            Transfer::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    tasks: Vec<DownloadTask>,
}

impl DownloadPlan {
    pub fn new(tasks: Vec<DownloadTask>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[DownloadTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("Invalid plan {}: {}", path.as_ref().display(), e))
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Run the tasks in order, stopping at the first failure.
    pub async fn execute(&self, client: &impl S3ObjOps) -> Result<TransferSummary> {
        let mut summary = TransferSummary::default();
        for task in self.tasks.iter() {
            debug!(bucket = %task.bucket, key = %task.key, "current task");
            summary.record(try_download(client, task).await?);
        }
        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            bytes = summary.bytes,
            "download plan complete"
        );
        Ok(summary)
    }
}

/// Download one object unless its destination already exists.
///
/// The body is streamed into a uniquely named temporary file next to the destination, which is
/// renamed over the destination only once complete.
pub async fn try_download(client: &impl S3ObjOps, task: &DownloadTask) -> Result<Transfer> {
    let dst = task.output.as_path();
    if dst.exists() {
        debug!(path = %dst.display(), "output file already exists");
        return Ok(Transfer::Skipped);
    }

    let download_error = |source| TransferError::Download {
        bucket: task.bucket.clone(),
        key: task.key.clone(),
        path: dst.to_path_buf(),
        source,
    };

    // Make parent directories as necessary
    let parent_dir = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let mut body = client
        .get_object(&task.bucket, &task.key, task.request_payer)
        .await
        .map_err(download_error)?;

    let mut partial = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(parent_dir)?;
    let mut byte_count = 0_u64;
    while let Some(bytes) = body
        .try_next()
        .await
        .map_err(|e| download_error(e.into()))?
    {
        partial.write_all(&bytes)?;
        byte_count += bytes.len() as u64;
    }
    partial.flush()?;

    partial.persist(dst).map_err(|e| e.error)?;
    debug!(key = %task.key, path = %dst.display(), bytes = byte_count, "download complete");

    Ok(Transfer::Downloaded(byte_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::mock_client::MockS3Client;

    fn mock_download_plan(root: &Path) -> DownloadPlan {
        DownloadPlan::new(vec![
            DownloadTask::new("mybucket", "path/to/file1.txt", root.join("file1.txt"), false),
            DownloadTask::new("mybucket", "path/to/file2.txt", root.join("a/file2.txt"), false),
            DownloadTask::new("mybucket", "path/to/file3.txt", root.join("a/b/file3.txt"), true),
        ])
    }

    fn mock_client() -> MockS3Client {
        let client = MockS3Client::new();
        client.insert("mybucket", "path/to/file1.txt", "one");
        client.insert("mybucket", "path/to/file2.txt", "two");
        client.insert("mybucket", "path/to/file3.txt", "three");
        client
    }

    #[test]
    fn test_write_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download_plan.json");
        let plan = mock_download_plan(dir.path());
        plan.write(&path).unwrap();
        assert!(path.exists());

        let read = DownloadPlan::read(&path).unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read, plan);
    }

    #[tokio::test]
    async fn test_execute() {
        let dir = tempfile::tempdir().unwrap();
        let client = mock_client();
        let plan = mock_download_plan(dir.path());

        let summary = plan.execute(&client).await.unwrap();
        assert_eq!(summary.downloaded, 3);
        assert_eq!(summary.bytes, 11);
        assert_eq!(fs::read_to_string(dir.path().join("a/b/file3.txt")).unwrap(), "three");

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("a"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_existing_output_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let client = mock_client();
        fs::write(dir.path().join("file1.txt"), "local").unwrap();

        let task = DownloadTask::new("mybucket", "path/to/file1.txt", dir.path().join("file1.txt"), false);
        assert_eq!(try_download(&client, &task).await.unwrap(), Transfer::Skipped);
        assert_eq!(client.get_count(), 0);
        assert_eq!(fs::read_to_string(dir.path().join("file1.txt")).unwrap(), "local");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let client = MockS3Client::new();
        let task = DownloadTask::new("mybucket", "missing.txt", dir.path().join("missing.txt"), false);

        let err = try_download(&client, &task).await.unwrap_err();
        assert!(matches!(err, Error::Transfer(TransferError::Download { .. })));
        assert!(!dir.path().join("missing.txt").exists());
    }
}
