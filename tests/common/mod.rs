#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use csv_compiler::{ObjectRecord, StorageService};
use std::path::Path;
use std::sync::Mutex;

struct MockObject {
    record: ObjectRecord,
    body: Vec<u8>,
}

/// In-memory bucket that records every call made against it.
#[derive(Default)]
pub struct MockStorageService {
    objects: Vec<MockObject>,
    failing_keys: Vec<String>,
    fail_listing: bool,
    pub list_calls: Mutex<Vec<(String, String)>>,
    pub downloads: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object last modified at noon UTC on the given day.
    pub fn with_object(mut self, key: &str, (y, m, d): (i32, u32, u32), body: &str) -> Self {
        let last_modified = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        self.objects.push(MockObject {
            record: ObjectRecord::new(key, last_modified),
            body: body.as_bytes().to_vec(),
        });
        self
    }

    pub fn with_record(mut self, record: ObjectRecord, body: &str) -> Self {
        self.objects.push(MockObject {
            record,
            body: body.as_bytes().to_vec(),
        });
        self
    }

    pub fn failing_download(mut self, key: &str) -> Self {
        self.failing_keys.push(key.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn downloaded_keys(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<ObjectRecord>> {
        self.list_calls
            .lock()
            .unwrap()
            .push((bucket.to_string(), prefix.to_string()));
        if self.fail_listing {
            return Err(anyhow::anyhow!("AccessDenied"));
        }
        Ok(self
            .objects
            .iter()
            .filter(|o| o.record.key.starts_with(prefix))
            .map(|o| o.record.clone())
            .collect())
    }

    async fn download_to(&self, _bucket: &str, key: &str, dest: &Path) -> anyhow::Result<()> {
        if self.failing_keys.iter().any(|k| k == key) {
            return Err(anyhow::anyhow!("NoSuchKey: {}", key));
        }
        let object = self
            .objects
            .iter()
            .find(|o| o.record.key == key)
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey: {}", key))?;
        tokio::fs::write(dest, &object.body).await?;
        self.downloads.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
