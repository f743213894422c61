use serde::Deserialize;

/// Fixed calendar window a [`QuotaConfig`] resets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BucketKind {
    Daily,
    Weekly,
    Monthly,
}

/// Which wall clock period-label computation uses.
///
/// Computing period labels and reset times in the server's local time is
/// surprising for multi-region deployments, so this crate defaults to UTC
/// while keeping `Local` available as an explicit opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TimeZoneChoice {
    #[default]
    Utc,
    Local,
}

/// Fixed-window quota configuration for one identifier rule.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub enabled: bool,
    pub limit: i64,
    pub bucket_kind: BucketKind,
    pub deny_status: u16,
    pub deny_body: String,
    pub timezone: TimeZoneChoice,
}

impl QuotaConfig {
    pub const DEFAULT_DENY_STATUS: u16 = 403;
    pub const DEFAULT_DENY_REASON: &'static str = "Quota exceeded";

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            limit: 0,
            bucket_kind: BucketKind::Daily,
            deny_status: 0,
            deny_body: String::new(),
            timezone: TimeZoneChoice::Utc,
        }
    }

    pub fn resolved_deny_status(&self) -> u16 {
        if self.deny_status > 0 {
            self.deny_status
        } else {
            Self::DEFAULT_DENY_STATUS
        }
    }
}

/// Wire shape of `quota` in the configuration schema.
#[derive(Debug, Deserialize)]
pub struct RawQuotaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub limit: i64,
    #[serde(default = "default_period")]
    pub period: BucketKind,
    #[serde(default)]
    pub response_reached_limit_code: i32,
    #[serde(default)]
    pub response_reached_limit_body: String,
    #[serde(default)]
    pub timezone: TimeZoneChoice,
}

fn default_period() -> BucketKind {
    BucketKind::Daily
}

impl RawQuotaConfig {
    pub fn into_config(self) -> QuotaConfig {
        QuotaConfig {
            enabled: self.enabled,
            limit: self.limit,
            bucket_kind: self.period,
            deny_status: self.response_reached_limit_code.max(0) as u16,
            deny_body: self.response_reached_limit_body,
            timezone: self.timezone,
        }
    }
}
