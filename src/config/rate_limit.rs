use std::time::Duration;

use serde::Deserialize;

/// Token-bucket configuration for one [`IdentifierRule`](super::identifier::IdentifierRule).
///
/// `rate` tokens are added per `period`, up to `burst`. See
/// `crate::limiter` for the engine that consumes this configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub rate: u32,
    pub burst: u32,
    pub period: Duration,
    pub deny_status: u16,
    pub deny_body: String,
}

impl RateLimitConfig {
    pub const DEFAULT_DENY_STATUS: u16 = 429;
    pub const DEFAULT_DENY_REASON: &'static str = "Rate limit exceeded";

    /// The disabled/no-op configuration — resolvable rules whose
    /// `rate_limit.enabled` is `false` still carry this value so the rule
    /// engine has something uniform to hold.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            rate: 0,
            burst: 0,
            period: Duration::from_secs(60),
            deny_status: 0,
            deny_body: String::new(),
        }
    }

    /// `deny_status` resolved to the configured status if positive, else
    /// the subsystem default (429).
    pub fn resolved_deny_status(&self) -> u16 {
        if self.deny_status > 0 {
            self.deny_status
        } else {
            Self::DEFAULT_DENY_STATUS
        }
    }
}

/// Wire shape of `rate_limit` in the configuration schema, deserialized
/// verbatim from a config file before being converted (with validation)
/// into [`RateLimitConfig`].
#[derive(Debug, Deserialize)]
pub struct RawRateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rate: u32,
    #[serde(default)]
    pub burst: u32,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub response_reached_limit_code: i32,
    #[serde(default)]
    pub response_reached_limit_body: String,
}

impl RawRateLimitConfig {
    pub fn into_config(self) -> Result<RateLimitConfig, crate::error::ConfigError> {
        let period = super::duration::parse_rate_limit_period(&self.period)?;
        Ok(RateLimitConfig {
            enabled: self.enabled,
            rate: self.rate,
            burst: self.burst,
            period,
            deny_status: self.response_reached_limit_code.max(0) as u16,
            deny_body: self.response_reached_limit_body,
        })
    }
}
