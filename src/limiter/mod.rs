mod bucket;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use bucket::{refill, TokenBucketState};

use crate::config::RateLimitConfig;
use crate::keys;
use crate::store::StoreBackend;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

/// Everything the decision emitter needs to render `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub burst: u32,
    pub available: u32,
    /// Unix seconds.
    pub reset_time: i64,
    /// Seconds; 0 means "not currently throttled".
    pub retry_after: u64,
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as i64
}

/// The token-bucket rate-limiting engine for one [`IdentifierRule`].
/// Immutable after construction — safe to share across the async
/// runtime.
pub struct RateLimiter {
    store: Arc<dyn StoreBackend>,
    config: RateLimitConfig,
    fail_open: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn StoreBackend>, config: RateLimitConfig, fail_open: bool) -> Self {
        Self {
            store,
            config,
            fail_open,
        }
    }

    /// `allow(identifier) -> {Allowed, Denied}`. Equivalent to
    /// `allow_n(identifier, 1)`.
    pub async fn allow(&self, identifier: &str) -> Decision {
        self.allow_n(identifier, 1).await
    }

    /// As `allow`, but tests `tokens >= n` and subtracts `n`. `n <= 0` is a
    /// no-op that always returns `Allowed`.
    pub async fn allow_n(&self, identifier: &str, n: i64) -> Decision {
        if n <= 0 {
            return Decision::Allowed;
        }

        let now = now_ns();
        let state = match self.load_refilled(identifier, now).await {
            Ok(state) => state,
            Err(()) => {
                return if self.fail_open {
                    Decision::Allowed
                } else {
                    Decision::Denied
                }
            }
        };

        if state.tokens >= n as f64 {
            let updated = TokenBucketState {
                tokens: state.tokens - n as f64,
                last_refill_ns: state.last_refill_ns,
            };
            self.persist(identifier, updated).await;
            Decision::Allowed
        } else {
            Decision::Denied
        }
    }

    /// `info(identifier)` — a read-only snapshot, never consumes a
    /// token and never persists a write.
    pub async fn info(&self, identifier: &str) -> RateLimitInfo {
        let now = now_ns();
        let state = self
            .load_refilled(identifier, now)
            .await
            .unwrap_or_else(|()| TokenBucketState::full(self.config.burst, now));

        let retry_after = if state.tokens < self.config.burst as f64 {
            (self.config.period.as_secs_f64() / self.config.rate.max(1) as f64).ceil() as u64
        } else {
            0
        };

        RateLimitInfo {
            limit: self.config.rate,
            burst: self.config.burst,
            available: state.tokens.floor().max(0.0) as u32,
            reset_time: (now / 1_000_000_000) + retry_after as i64,
            retry_after,
        }
    }

    /// Loads the persisted bucket (or synthesizes a fresh full one if
    /// absent — buckets are created lazily full) and refills it to
    /// `now`. Returns `Err(())` when the store read itself failed, so the
    /// caller can apply the fail-open/fail-closed policy.
    async fn load_refilled(&self, identifier: &str, now: i64) -> Result<TokenBucketState, ()> {
        let tokens_key = keys::rate_limit_tokens_key(identifier);
        let refill_key = keys::rate_limit_last_refill_key(identifier);

        let tokens = self.store.get(&tokens_key).await.map_err(|e| {
            tracing::warn!("rate limiter store read failed for {identifier}: {e}");
        })?;
        let last_refill = self.store.get(&refill_key).await.map_err(|e| {
            tracing::warn!("rate limiter store read failed for {identifier}: {e}");
        })?;

        let state = match (tokens, last_refill) {
            (Some(t), Some(r)) => {
                let tokens = t.parse().unwrap_or(self.config.burst as f64);
                let last_refill_ns = r.parse().unwrap_or(now);
                TokenBucketState {
                    tokens,
                    last_refill_ns,
                }
            }
            _ => TokenBucketState::full(self.config.burst, now),
        };

        Ok(refill(
            state,
            now,
            self.config.rate,
            self.config.burst,
            self.config.period,
        ))
    }

    async fn persist(&self, identifier: &str, state: TokenBucketState) {
        let tokens_key = keys::rate_limit_tokens_key(identifier);
        let refill_key = keys::rate_limit_last_refill_key(identifier);
        let ttl = Some(self.config.period * 2);

        if let Err(e) = self.store.set(&tokens_key, &state.tokens.to_string(), ttl).await {
            tracing::warn!("rate limiter store write failed for {identifier}: {e}");
        }
        if let Err(e) = self
            .store
            .set(&refill_key, &state.last_refill_ns.to_string(), ttl)
            .await
        {
            tracing::warn!("rate limiter store write failed for {identifier}: {e}");
        }
    }
}
