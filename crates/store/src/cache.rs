use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Best-effort cache port (spec §6, §5): a miss is never an error, so the
/// trait returns plain `Option`/`()` rather than a `Result`.
#[async_trait]
pub trait CachePort: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>);
    async fn delete(&self, key: &str);
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CachePort for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at.is_some_and(|t| t < Instant::now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry { value, expires_at: ttl.map(|d| Instant::now() + d) },
        );
    }

    async fn delete(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".to_string(), None).await;
        assert_eq!(cache.get("k").await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn miss_returns_none_not_error() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_a_miss() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".to_string(), Some(Duration::from_millis(0))).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".to_string(), None).await;
        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }
}
