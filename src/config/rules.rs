use serde::Deserialize;

use super::identifier::{IdentifierKind, IdentifierRule};
use super::quota::{QuotaConfig, RawQuotaConfig};
use super::rate_limit::{RateLimitConfig, RawRateLimitConfig};
use crate::error::ConfigError;

/// Wire shape of one `identifiers[]` entry in the configuration schema.
#[derive(Debug, Deserialize)]
pub struct RawIdentifierRule {
    #[serde(rename = "type")]
    pub kind: IdentifierKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "RawRateLimitConfig::default_disabled")]
    pub rate_limit: RawRateLimitConfig,
    #[serde(default = "RawQuotaConfig::default_disabled")]
    pub quota: RawQuotaConfig,
}

impl RawRateLimitConfig {
    pub(crate) fn default_disabled() -> Self {
        Self {
            enabled: false,
            rate: 0,
            burst: 0,
            period: String::new(),
            response_reached_limit_code: 0,
            response_reached_limit_body: String::new(),
        }
    }
}

impl RawQuotaConfig {
    pub(crate) fn default_disabled() -> Self {
        Self {
            enabled: false,
            limit: 0,
            period: super::quota::BucketKind::Daily,
            response_reached_limit_code: 0,
            response_reached_limit_body: String::new(),
            timezone: super::quota::TimeZoneChoice::Utc,
        }
    }
}

/// The validated, ordered identifier dispatch table. Construction is the
/// only place the field-name and limit-enabled constraints are enforced;
/// once built, a `RuleSet` is immutable and safe to share across the async
/// runtime via `Arc`.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<IdentifierRule>,
}

impl RuleSet {
    pub fn rules(&self) -> &[IdentifierRule] {
        &self.rules
    }

    fn validate(rules: &[IdentifierRule]) -> Result<(), ConfigError> {
        for (index, rule) in rules.iter().enumerate() {
            if rule.kind.requires_field_name() && rule.field_name.is_empty() {
                return Err(ConfigError::EmptyFieldName {
                    index,
                    kind: rule.kind.as_str(),
                });
            }
            if !rule.rate_limit.enabled && !rule.quota.enabled {
                return Err(ConfigError::NoLimitEnabled { index });
            }
        }
        Ok(())
    }

    pub(crate) fn from_rules(rules: Vec<IdentifierRule>) -> Result<Self, ConfigError> {
        Self::validate(&rules)?;
        Ok(Self { rules })
    }

    pub fn from_raw(raw: Vec<RawIdentifierRule>) -> Result<Self, ConfigError> {
        let rules = raw
            .into_iter()
            .map(|r| {
                Ok(IdentifierRule {
                    kind: r.kind,
                    field_name: r.name,
                    expected_value: r.value,
                    rate_limit: r.rate_limit.into_config()?,
                    quota: r.quota.into_config(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Self::from_rules(rules)
    }

    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }
}

/// Programmatic construction of a [`RuleSet`] for hosts that build their
/// configuration in code rather than from a file.
#[derive(Default)]
pub struct RuleSetBuilder {
    rules: Vec<IdentifierRule>,
}

impl RuleSetBuilder {
    pub fn rule(
        mut self,
        kind: IdentifierKind,
        field_name: impl Into<String>,
        expected_value: impl Into<String>,
        rate_limit: RateLimitConfig,
        quota: QuotaConfig,
    ) -> Self {
        self.rules.push(IdentifierRule {
            kind,
            field_name: field_name.into(),
            expected_value: expected_value.into(),
            rate_limit,
            quota,
        });
        self
    }

    pub fn build(self) -> Result<RuleSet, ConfigError> {
        RuleSet::from_rules(self.rules)
    }
}
