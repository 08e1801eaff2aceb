//! In-memory S3 client for unit tests.
//!
//! Objects are kept sorted by key, the order S3 lists them in. Listings are cut into
//! pages of `page_size` entries with the page offset as continuation token, and pages
//! without any object leave `contents` out the way S3 does.
use super::{ListPage, ListRequest, S3ObjOps};
use crate::error::StoreError;
use aws_sdk_s3::primitives::ByteStream;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, PartialEq)]
enum Entry {
    Key(String),
    Prefix(String),
}

pub struct MockS3Client {
    /// (bucket, key) -> data
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    page_size: usize,
    drop_contents: bool,
    reachable: bool,
    failing_puts: HashSet<String>,
    gets: AtomicUsize,
    lists: AtomicUsize,
}

impl MockS3Client {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: 1000,
            drop_contents: false,
            reachable: true,
            failing_puts: HashSet::new(),
            gets: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Answer every listing page without its contents field.
    pub fn without_contents(mut self) -> Self {
        self.drop_contents = true;
        self
    }

    /// Fail every HEAD bucket request.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn failing_put(mut self, key: &str) -> Self {
        self.failing_puts.insert(key.to_string());
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn get_data(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn entries(&self, request: &ListRequest<'_>) -> Vec<Entry> {
        let objects = self.objects.read().unwrap();
        let mut entries: Vec<Entry> = vec![];
        for (_, key) in objects
            .keys()
            .filter(|(b, k)| b == request.bucket && k.starts_with(request.prefix))
        {
            if let Some(delimiter) = request.delimiter {
                let rest = &key[request.prefix.len()..];
                if let Some(pos) = rest.find(delimiter) {
                    let common = format!("{}{}", request.prefix, &rest[..pos + delimiter.len()]);
                    let entry = Entry::Prefix(common);
                    if entries.last() != Some(&entry) {
                        entries.push(entry);
                    }
                    continue;
                }
            }
            entries.push(Entry::Key(key.clone()));
        }
        entries
    }
}

impl Default for MockS3Client {
    fn default() -> Self {
        Self::new()
    }
}

impl S3ObjOps for MockS3Client {
    async fn head_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        if !self.reachable {
            return Err(format!("403 Forbidden on {bucket}").into());
        }
        Ok(())
    }

    async fn list_objects_page(&self, request: ListRequest<'_>) -> Result<ListPage, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries(&request);

        let start = match &request.continuation_token {
            Some(token) => token.parse::<usize>()?,
            None => 0,
        };
        let end = (start + self.page_size).min(entries.len());

        let mut keys = vec![];
        let mut common_prefixes = vec![];
        for entry in &entries[start.min(end)..end] {
            match entry {
                Entry::Key(key) => keys.push(key.clone()),
                Entry::Prefix(prefix) => common_prefixes.push(prefix.clone()),
            }
        }

        let contents = if keys.is_empty() || self.drop_contents {
            None
        } else {
            Some(keys)
        };
        Ok(ListPage {
            raw: format!("MockListPage {{ start: {start}, end: {end} }}"),
            contents,
            common_prefixes,
            next_continuation_token: (end < entries.len()).then(|| end.to_string()),
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        _request_payer: bool,
    ) -> Result<ByteStream, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let data = self
            .get_data(bucket, key)
            .ok_or_else(|| format!("NoSuchKey: {bucket}/{key}"))?;
        Ok(ByteStream::from(data))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: ByteStream) -> Result<(), StoreError> {
        if self.failing_puts.contains(key) {
            return Err(format!("500 Internal Error on {bucket}/{key}").into());
        }
        let data = body.collect().await?.into_bytes().to_vec();
        self.insert(bucket, key, data);
        Ok(())
    }
}
