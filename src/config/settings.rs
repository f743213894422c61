use std::time::Duration;

use serde::Deserialize;

use super::rules::{RawIdentifierRule, RuleSet};
use crate::error::ConfigError;

/// Connection target for the backing store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub address: String,
    pub password: Option<String>,
    pub db: u32,
    pub connect_timeout: Duration,
    /// Whether limiter/quota reads that fail against the store degrade to
    /// "allow" or propagate as denials.
    pub fail_open: bool,
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let address =
            std::env::var("RATEQUOTA_REDIS_ADDRESS").unwrap_or_else(|_| "127.0.0.1:6379".into());
        let password = std::env::var("RATEQUOTA_REDIS_PASSWORD").ok();
        let db = std::env::var("RATEQUOTA_REDIS_DB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let fail_open = std::env::var("RATEQUOTA_FAIL_OPEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Self {
            address,
            password,
            db,
            connect_timeout: Duration::from_secs(5),
            fail_open,
        }
    }
}

/// Wire shape of `persistence.redis` in the configuration schema.
#[derive(Debug, Deserialize)]
struct RawRedisConfig {
    address: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    db: u32,
}

#[derive(Debug, Deserialize)]
struct RawPersistenceConfig {
    redis: RawRedisConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    persistence: RawPersistenceConfig,
    #[serde(default)]
    identifiers: Vec<RawIdentifierRule>,
}

/// Top-level, validated configuration: a backing-store target plus the
/// ordered identifier dispatch table.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreConfig,
    pub rules: RuleSet,
}

impl Settings {
    /// Loads `store` from discrete environment variables
    /// (`dotenvy::dotenv()` then `std::env::var` with typed fallbacks) and
    /// `rules` from the JSON file named by `RATEQUOTA_CONFIG_PATH`,
    /// defaulting to `config/rules.json`.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store = StoreConfig::from_env();
        let path = std::env::var("RATEQUOTA_CONFIG_PATH")
            .unwrap_or_else(|_| "config/rules.json".to_string());
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::Missing(format!("rules config file at {path}")))?;
        let rules = Self::rules_from_json(&raw)?;

        Ok(Self { store, rules })
    }

    /// Parses a configuration document matching the rules schema and
    /// validates it into a [`RuleSet`].
    pub fn rules_from_json(document: &str) -> Result<RuleSet, ConfigError> {
        let raw: RawConfig = serde_json::from_str(document)
            .map_err(|e| ConfigError::InvalidValue {
                name: "identifiers",
                value: e.to_string(),
            })?;
        RuleSet::from_raw(raw.identifiers)
    }
}
