use std::sync::Arc;

use crate::config::{IdentifierRule, RuleSet, StoreConfig};
use crate::limiter::RateLimiter;
use crate::quota::QuotaCounter;
use crate::store::StoreBackend;

/// One configured [`IdentifierRule`] bundled with the engines it actually
/// needs — a rule with `rate_limit.enabled == false` carries no
/// `RateLimiter` rather than a live-but-always-passing one.
pub struct RuleEngine {
    pub rule: IdentifierRule,
    pub rate_limiter: Option<RateLimiter>,
    pub quota_counter: Option<QuotaCounter>,
}

impl RuleEngine {
    fn new(rule: IdentifierRule, store: &Arc<dyn StoreBackend>, fail_open: bool) -> Self {
        let rate_limiter = rule
            .rate_limit
            .enabled
            .then(|| RateLimiter::new(store.clone(), rule.rate_limit.clone(), fail_open));
        let quota_counter = rule
            .quota
            .enabled
            .then(|| QuotaCounter::new(store.clone(), rule.quota.clone(), fail_open));
        Self {
            rule,
            rate_limiter,
            quota_counter,
        }
    }
}

/// Shared, immutable middleware state: one [`RuleEngine`] per configured
/// rule, in priority order, plus the store handle they share.
/// Built once at middleware-construction time; cheap to `Clone` since it is
/// just an `Arc` underneath.
#[derive(Clone)]
pub struct ProxyState {
    engines: Arc<[RuleEngine]>,
}

impl ProxyState {
    pub fn new(rules: &RuleSet, store: Arc<dyn StoreBackend>, store_config: &StoreConfig) -> Self {
        let engines: Vec<RuleEngine> = rules
            .rules()
            .iter()
            .cloned()
            .map(|rule| RuleEngine::new(rule, &store, store_config.fail_open))
            .collect();
        Self {
            engines: engines.into(),
        }
    }

    pub fn engines(&self) -> &[RuleEngine] {
        &self.engines
    }
}
