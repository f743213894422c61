use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::StoreBackend;
use crate::error::StoreError;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// An in-memory [`StoreBackend`] used as a test double. TTLs are tracked against
/// `tokio::time::Instant` so tests using `tokio::time::pause`/`advance`
/// can exercise expiry deterministically without real sleeps.
#[derive(Default)]
pub struct InMemoryStore {
    data: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry, now: Instant) -> bool {
        match entry.expires_at {
            Some(at) => at > now,
            None => true,
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut data = self.data.lock().await;
        if let Some(entry) = data.get(key) {
            if Self::is_live(entry, now) {
                return Ok(Some(entry.value.clone()));
            }
            data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.filter(|d| !d.is_zero()).map(|d| Instant::now() + d);
        self.data.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.incrby(key, 1).await
    }

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut data = self.data.lock().await;
        let current = match data.get(key) {
            Some(entry) if Self::is_live(entry, now) => entry
                .value
                .parse::<i64>()
                .map_err(|_| StoreError::Protocol("value is not an integer".to_string()))?,
            _ => 0,
        };
        let updated = current + delta;
        let expires_at = data.get(key).and_then(|e| e.expires_at).filter(|at| *at > now);
        data.insert(
            key.to_string(),
            Entry {
                value: updated.to_string(),
                expires_at,
            },
        );
        Ok(updated)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut data = self.data.lock().await;
        match data.get_mut(key) {
            Some(entry) if Self::is_live(entry, now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        let mut data = self.data.lock().await;
        match data.get(key) {
            Some(entry) if Self::is_live(entry, now) => match entry.expires_at {
                Some(at) => Ok(Some(at.saturating_duration_since(now))),
                None => Ok(None),
            },
            Some(_) => {
                data.remove(key);
                Err(StoreError::KeyDoesNotExist)
            }
            None => Err(StoreError::KeyDoesNotExist),
        }
    }

    async fn exists(&self, keys: &[&str]) -> Result<i64, StoreError> {
        let now = Instant::now();
        let data = self.data.lock().await;
        let count = keys
            .iter()
            .filter(|k| data.get(**k).is_some_and(|e| Self::is_live(e, now)))
            .count();
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_value() {
        let store = InMemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incrby_creates_key_at_delta() {
        let store = InMemoryStore::new();
        let n = store.incrby("counter", 5).await.unwrap();
        assert_eq!(n, 5);
        let n = store.incrby("counter", 3).await.unwrap();
        assert_eq!(n, 8);
    }

    #[tokio::test]
    async fn ttl_of_missing_key_is_key_does_not_exist() {
        let store = InMemoryStore::new();
        let err = store.ttl("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::KeyDoesNotExist));
    }

    #[tokio::test]
    async fn ttl_of_key_without_expiry_is_none() {
        let store = InMemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), None);
    }
}
