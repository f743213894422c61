mod request;

pub use request::{strip_port_suffix, RequestView};

use crate::config::{IdentifierKind, IdentifierRule};
use crate::error::ResolverError;

/// Header values that act as a fallback identifier rather than gating on
/// an exact match when the header itself is absent.
const HEADER_FALLBACK_SENTINELS: &[&str] = &["sk-unknown", "anonymous", "guest"];

/// The outcome of a successful resolution: which rule matched, by index
/// (the rule's priority), and the extracted identifier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub rule_index: usize,
    pub identifier: String,
}

/// Extracts a candidate identifier for one rule, per its kind-specific
/// matching rules. Returns `None` when the rule does not match this
/// request at all (distinct from matching with an empty identifier,
/// which the resolver also treats as no-match).
fn extract_candidate(rule: &IdentifierRule, view: &RequestView) -> Option<String> {
    match rule.kind {
        IdentifierKind::Header => match view.header(&rule.field_name) {
            Some(value) => (value == rule.expected_value).then(|| value.to_string()),
            None => HEADER_FALLBACK_SENTINELS
                .contains(&rule.expected_value.as_str())
                .then(|| rule.expected_value.clone()),
        },
        IdentifierKind::Cookie => match view.cookie(&rule.field_name) {
            Some(value) => Some(value.to_string()),
            None => Some(rule.expected_value.clone()),
        },
        IdentifierKind::Query => match view.query(&rule.field_name) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => Some(rule.expected_value.clone()),
        },
        IdentifierKind::Ip => {
            let candidate = view
                .header("x-real-ip")
                .map(str::to_string)
                .or_else(|| {
                    view.header("x-forwarded-for")
                        .and_then(|v| v.split(',').next())
                        .map(|s| s.trim().to_string())
                })
                .or_else(|| view.remote_addr().map(str::to_string));
            candidate.map(|c| strip_port_suffix(&c).to_string())
        }
    }
}

/// Walks the ordered rule list and returns the first match: "first match
/// wins"; an empty identifier after extraction counts as no match and
/// iteration continues.
///
/// Takes any borrowed-rule iterable rather than a concrete slice so
/// callers whose rules are scattered across other owning structures (the
/// middleware's per-engine storage) can resolve without first collecting
/// a contiguous, cloned copy.
pub fn resolve<'a>(
    rules: impl IntoIterator<Item = &'a IdentifierRule>,
    view: &RequestView,
) -> Result<Resolved, ResolverError> {
    for (rule_index, rule) in rules.into_iter().enumerate() {
        if let Some(identifier) = extract_candidate(rule, view) {
            if !identifier.is_empty() {
                return Ok(Resolved {
                    rule_index,
                    identifier,
                });
            }
        }
    }
    Err(ResolverError)
}
