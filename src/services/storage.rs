use crate::models::ObjectRecord;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use std::future::Future;
use std::path::Path;

/// Object store operations the compiler depends on.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Every object under `prefix`, across all listing pages.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRecord>>;

    /// Fetches `key` and writes it to `dest`, replacing any existing file.
    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;
}

/// One page of a bucket listing.
#[derive(Debug, Default)]
pub(crate) struct ListPage {
    objects: Vec<ObjectRecord>,
    /// Token for the next page; `None` once the listing is exhausted
    next_token: Option<String>,
}

impl ListPage {
    fn from_output(res: ListObjectsV2Output) -> Self {
        let mut objects = Vec::new();

        for object in res.contents.unwrap_or_default() {
            let Some(key) = object.key else {
                continue;
            };

            let last_modified = object
                .last_modified
                .and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()));

            match last_modified {
                Some(last_modified) => objects.push(ObjectRecord { key, last_modified }),
                None => tracing::warn!("Skipping '{}': no usable LastModified", key),
            }
        }

        let next_token = if res.is_truncated.unwrap_or(false) {
            if res.next_continuation_token.is_none() {
                tracing::warn!("Listing truncated without a continuation token; stopping");
            }
            res.next_continuation_token
        } else {
            None
        };

        Self {
            objects,
            next_token,
        }
    }
}

/// Drives `fetch_page` from the first page until a page carries no token.
pub(crate) async fn collect_listing<F, Fut>(mut fetch_page: F) -> Result<Vec<ObjectRecord>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<ListPage>>,
{
    let mut objects = Vec::new();
    let mut continuation_token = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(continuation_token.take()).await?;
        pages += 1;
        objects.extend(page.objects);

        match page.next_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    tracing::debug!("Listed {} objects across {} pages", objects.len(), pages);
    Ok(objects)
}

pub struct S3StorageService {
    client: Client,
}

impl S3StorageService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectRecord>> {
        collect_listing(|continuation_token| async move {
            let res = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await?;
            Ok::<_, anyhow::Error>(ListPage::from_output(res))
        })
        .await
    }

    async fn download_to(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let res = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(e) => {
                tracing::error!(
                    "S3 get_object failed: bucket={}, key={}, error={:?}",
                    bucket,
                    key,
                    e
                );
                return Err(e.into());
            }
        };

        let data = res.body.collect().await?.into_bytes();
        tokio::fs::write(dest, &data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::primitives::DateTime as S3DateTime;
    use aws_sdk_s3::types::Object;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;

    fn record(key: &str, day: u32) -> ObjectRecord {
        ObjectRecord::new(key, Utc.with_ymd_and_hms(2025, 4, day, 12, 0, 0).unwrap())
    }

    fn page(keys: &[&str], next_token: Option<&str>) -> ListPage {
        ListPage {
            objects: keys.iter().map(|k| record(k, 1)).collect(),
            next_token: next_token.map(str::to_string),
        }
    }

    fn s3_object(key: Option<&str>, secs: Option<i64>) -> Object {
        Object::builder()
            .set_key(key.map(str::to_string))
            .set_last_modified(secs.map(S3DateTime::from_secs))
            .build()
    }

    #[tokio::test]
    async fn test_listing_follows_tokens_across_pages() {
        let mut pages = VecDeque::from(vec![
            page(&["p/a.csv", "p/b.csv"], Some("t1")),
            page(&["p/c.csv"], Some("t2")),
            page(&["p/d.csv"], None),
        ]);
        let mut tokens = Vec::new();

        let objects = collect_listing(|token| {
            tokens.push(token);
            let next = pages.pop_front();
            async move { next.ok_or_else(|| anyhow::anyhow!("listing requested too many pages")) }
        })
        .await
        .unwrap();

        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["p/a.csv", "p/b.csv", "p/c.csv", "p/d.csv"]);
        assert_eq!(
            tokens,
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_listing_stops_on_page_without_token() {
        let mut pages = VecDeque::from(vec![page(&["p/a.csv"], None), page(&["p/b.csv"], None)]);

        let objects = collect_listing(|_| {
            let next = pages.pop_front();
            async move { next.ok_or_else(|| anyhow::anyhow!("no more pages")) }
        })
        .await
        .unwrap();

        assert_eq!(objects, vec![record("p/a.csv", 1)]);
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_propagates_page_errors() {
        let mut pages = VecDeque::from(vec![page(&["p/a.csv"], Some("t1"))]);

        let result = collect_listing(|_| {
            let next = pages.pop_front();
            async move { next.ok_or_else(|| anyhow::anyhow!("SlowDown")) }
        })
        .await;

        assert!(result.unwrap_err().to_string().contains("SlowDown"));
    }

    #[test]
    fn test_truncated_output_without_token_ends_listing() {
        let res = ListObjectsV2Output::builder()
            .set_contents(Some(vec![s3_object(Some("p/a.csv"), Some(1_743_508_800))]))
            .is_truncated(true)
            .build();

        let page = ListPage::from_output(res);

        assert_eq!(page.objects.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_token_only_followed_when_truncated() {
        let truncated = ListObjectsV2Output::builder()
            .is_truncated(true)
            .next_continuation_token("t1")
            .build();
        assert_eq!(ListPage::from_output(truncated).next_token.as_deref(), Some("t1"));

        let complete = ListObjectsV2Output::builder()
            .is_truncated(false)
            .next_continuation_token("t1")
            .build();
        assert!(ListPage::from_output(complete).next_token.is_none());
    }

    #[test]
    fn test_objects_without_key_or_timestamp_are_skipped() {
        let res = ListObjectsV2Output::builder()
            .set_contents(Some(vec![
                s3_object(Some("p/a.csv"), Some(1_743_508_800)),
                s3_object(None, Some(1_743_508_800)),
                s3_object(Some("p/no-date.csv"), None),
            ]))
            .build();

        let page = ListPage::from_output(res);

        assert_eq!(
            page.objects,
            vec![ObjectRecord::new(
                "p/a.csv",
                Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
            )]
        );
    }
}
