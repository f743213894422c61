mod client;
mod memory;
pub mod resp;

use std::time::Duration;

use async_trait::async_trait;

pub use client::RespStoreClient;
pub use memory::InMemoryStore;

use crate::error::StoreError;

/// The backing-store command surface used by the limiter and quota
/// engines. Exposed as a capability trait so tests can substitute
/// [`InMemoryStore`] for [`RespStoreClient`].
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// `ttl == None` is a plain `SET`; `Some(d)` is encoded as `SETEX key d.as_secs() value`.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64, StoreError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// `None` means "no expiration" (RESP `-1`);
    /// `Err(StoreError::KeyDoesNotExist)` is raised for the `-2` reply.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    async fn exists(&self, keys: &[&str]) -> Result<i64, StoreError>;
}
