use serde::Deserialize;

use super::quota::QuotaConfig;
use super::rate_limit::RateLimitConfig;

/// Which piece of request metadata an [`IdentifierRule`] extracts from.
///
/// Deliberately a closed, exact-match tagged variant rather than a trait
/// object — the resolution pipeline is a total function over these four
/// cases, never an extensible plugin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum IdentifierKind {
    Header,
    Cookie,
    Query,
    #[serde(alias = "IP")]
    Ip,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Header => "Header",
            IdentifierKind::Cookie => "Cookie",
            IdentifierKind::Query => "Query",
            IdentifierKind::Ip => "IP",
        }
    }

    /// Header/Cookie/Query rules need a non-empty `field_name`; IP rules
    /// always match the connection metadata and carry no field name.
    pub fn requires_field_name(&self) -> bool {
        !matches!(self, IdentifierKind::Ip)
    }
}

/// One entry in the ordered identifier dispatch table. Rule index in
/// the owning [`RuleSet`](super::rules::RuleSet) *is* its priority.
#[derive(Debug, Clone)]
pub struct IdentifierRule {
    pub kind: IdentifierKind,
    pub field_name: String,
    pub expected_value: String,
    pub rate_limit: RateLimitConfig,
    pub quota: QuotaConfig,
}
