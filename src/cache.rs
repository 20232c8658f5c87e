//! Persistent page cache
//!
//! Stores fetched listing pages on disk so repeated runs skip the network
//! for pages that are still fresh. Entries carry an expiry timestamp;
//! expired entries are removed when read.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fjall::Keyspace;
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::Result;
use crate::error::LoungeMapError;

#[derive(Serialize, Deserialize)]
struct StoredPage {
    body: String,
    expires_at: u64, // Unix timestamp (seconds)
}

/// Disk-backed cache of page bodies keyed by URL
pub struct PageCache {
    store: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> anyhow::Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PageCache {
    /// Open (or create) the cache at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path)
            .open()
            .map_err(|e| LoungeMapError::cache(format!("failed to open cache database: {e}")))?;
        let store = db
            .keyspace("pages", fjall::KeyspaceCreateOptions::default)
            .map_err(|e| LoungeMapError::cache(format!("failed to open cache keyspace: {e}")))?;
        Ok(PageCache { store })
    }

    /// Store a page body with a time-to-live
    #[tracing::instrument(name = "put_page", level = "debug", skip(self, body))]
    pub async fn put(&self, url: &str, body: &str, ttl: Duration) -> Result<()> {
        let store = self.store.clone();
        let key = url.as_bytes().to_vec();

        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or_else(|| LoungeMapError::cache("TTL overflow"))?
            .duration_since(UNIX_EPOCH)
            .map_err(|e| LoungeMapError::cache(e.to_string()))?
            .as_secs();
        let entry = StoredPage {
            body: body.to_string(),
            expires_at,
        };
        let bytes = postcard::to_stdvec(&entry)
            .map_err(|e| LoungeMapError::cache(format!("failed to encode cache entry: {e}")))?;

        let _ = task::spawn_blocking(move || store.insert(key, bytes))
            .await
            .map_err(|e| LoungeMapError::cache(e.to_string()))?;
        Ok(())
    }

    /// Retrieve a page body if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_page", level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<Option<String>> {
        let store = self.store.clone();
        let key_bytes = url.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || get_from_store(store, key_bytes))
                .await
                .map_err(|e| LoungeMapError::cache(e.to_string()))?
                .map_err(|e| LoungeMapError::cache(e.to_string()))?;

        if let Some(bytes) = maybe_bytes {
            let entry: StoredPage = postcard::from_bytes(&bytes)
                .map_err(|e| LoungeMapError::cache(format!("failed to decode cache entry: {e}")))?;
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| LoungeMapError::cache(e.to_string()))?
                .as_secs();

            if now < entry.expires_at {
                tracing::debug!("Page found and still fresh");
                Ok(Some(entry.body))
            } else {
                tracing::debug!("Page found but expired");
                self.remove(url).await?;
                Ok(None)
            }
        } else {
            tracing::debug!("Page not cached");
            Ok(None)
        }
    }

    /// Manually remove a page from the cache
    pub async fn remove(&self, url: &str) -> Result<()> {
        let key = url.as_bytes().to_vec();
        let store = self.store.clone();
        let _ = task::spawn_blocking(move || store.remove(key))
            .await
            .map_err(|e| LoungeMapError::cache(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = PageCache::open(dir.path().join("cache")).unwrap();

        cache
            .put("https://example.com/a", "<html>a</html>", Duration::from_secs(60))
            .await
            .unwrap();

        let body = cache.get("https://example.com/a").await.unwrap();
        assert_eq!(body.as_deref(), Some("<html>a</html>"));
    }

    #[tokio::test]
    async fn test_miss_returns_none() {
        let dir = TempDir::new().unwrap();
        let cache = PageCache::open(dir.path().join("cache")).unwrap();
        assert!(cache.get("https://example.com/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let dir = TempDir::new().unwrap();
        let cache = PageCache::open(dir.path().join("cache")).unwrap();

        cache
            .put("https://example.com/b", "stale", Duration::ZERO)
            .await
            .unwrap();

        assert!(cache.get("https://example.com/b").await.unwrap().is_none());
    }
}
