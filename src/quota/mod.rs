mod period;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

pub use crate::limiter::Decision;
use crate::config::{BucketKind, QuotaConfig};
use crate::keys;
use crate::store::StoreBackend;

pub use period::{period_label, reset_time};

/// Everything the decision emitter needs to render `X-Quota-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaInfo {
    pub limit: i64,
    pub used: i64,
    pub remaining: i64,
    /// Unix seconds the current window resets at.
    pub reset_time: i64,
    /// Seconds until `reset_time`.
    pub reset_in: u64,
}

impl QuotaInfo {
    fn new(limit: i64, used: i64, reset_time: i64, reset_in: u64) -> Self {
        Self {
            limit,
            used,
            remaining: (limit - used).max(0),
            reset_time,
            reset_in,
        }
    }
}

/// The fixed-window quota engine for one [`IdentifierRule`].
/// Immutable after construction — safe to share across the async runtime.
pub struct QuotaCounter {
    store: Arc<dyn StoreBackend>,
    config: QuotaConfig,
    fail_open: bool,
}

impl QuotaCounter {
    pub fn new(store: Arc<dyn StoreBackend>, config: QuotaConfig, fail_open: bool) -> Self {
        Self {
            store,
            config,
            fail_open,
        }
    }

    fn current_window(&self) -> (String, i64, u64) {
        let now = Utc::now();
        let label = period_label(now, self.config.bucket_kind, self.config.timezone);
        let reset = reset_time(now, self.config.bucket_kind, self.config.timezone);
        let reset_in = (reset - now).num_seconds().max(0) as u64;
        (label, reset.timestamp(), reset_in)
    }

    /// `check(identifier) -> {Allowed, Denied, info}`. Read-only —
    /// never mutates the counter.
    pub async fn check(&self, identifier: &str) -> (Decision, QuotaInfo) {
        let (label, reset_ts, reset_in) = self.current_window();
        let key = keys::quota_key(identifier, &label);

        let used = match self.store.get(&key).await {
            Ok(raw) => raw.and_then(|s| s.parse::<i64>().ok()).unwrap_or(0),
            Err(e) => {
                tracing::warn!("quota store read failed for {identifier}: {e}");
                if !self.fail_open {
                    let info = QuotaInfo::new(self.config.limit, self.config.limit, reset_ts, reset_in);
                    return (Decision::Denied, info);
                }
                0
            }
        };

        let info = QuotaInfo::new(self.config.limit, used, reset_ts, reset_in);
        let decision = if used < self.config.limit {
            Decision::Allowed
        } else {
            Decision::Denied
        };
        (decision, info)
    }

    /// `consume(n >= 1, default 1) -> info`. Always "succeeds" from
    /// the caller's point of view — gating happens in `check`, not here.
    /// A store failure here is logged and dropped: the request the
    /// caller already served is not retroactively denied.
    pub async fn consume(&self, identifier: &str, n: i64) -> QuotaInfo {
        let (label, reset_ts, reset_in) = self.current_window();
        let key = keys::quota_key(identifier, &label);

        match self.store.incrby(&key, n).await {
            Ok(new_used) => {
                if new_used == n {
                    // This call created the key — bound its lifetime to
                    // the window.
                    if let Err(e) = self.store.expire(&key, Duration::from_secs(reset_in)).await {
                        tracing::warn!("quota store expire failed for {identifier}: {e}");
                    }
                }
                QuotaInfo::new(self.config.limit, new_used, reset_ts, reset_in)
            }
            Err(e) => {
                tracing::warn!("quota store consume failed for {identifier}: {e}");
                let used = self
                    .store
                    .get(&key)
                    .await
                    .ok()
                    .flatten()
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(0);
                QuotaInfo::new(self.config.limit, used, reset_ts, reset_in)
            }
        }
    }
}
