use crate::config::{QuotaConfig, RateLimitConfig};
use crate::limiter::RateLimitInfo;
use crate::quota::QuotaInfo;

/// One header to attach to the response, rendered as `(name, value)` pairs
/// so the axum adapter can push them onto a `HeaderMap` without this module
/// depending on axum.
pub type Header = (&'static str, String);

/// Builds the `X-RateLimit-*`/`Retry-After` header set for a rate-limit
/// info snapshot.
pub fn rate_limit_headers(info: &RateLimitInfo) -> Vec<Header> {
    let mut headers = vec![
        ("X-RateLimit-Limit", info.limit.to_string()),
        ("X-RateLimit-Remaining", info.available.to_string()),
        ("X-RateLimit-Reset", info.reset_time.to_string()),
    ];
    if info.retry_after > 0 {
        headers.push(("Retry-After", info.retry_after.to_string()));
    }
    headers
}

/// Builds the `X-Quota-*` header set for a quota info snapshot.
pub fn quota_headers(info: &QuotaInfo) -> Vec<Header> {
    vec![
        ("X-Quota-Limit", info.limit.to_string()),
        ("X-Quota-Used", info.used.to_string()),
        ("X-Quota-Remaining", info.remaining.to_string()),
        ("X-Quota-Reset", info.reset_time.to_string()),
    ]
}

/// The body, status, and content type for a denial response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyResponse {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
}

/// `Content-Type` is `application/json` iff the body contains both `{` and
/// `}`; else `text/plain`. No attempt is made to validate that the
/// body is actually well-formed JSON — this mirrors a cheap sniff, not a
/// parse.
fn detect_content_type(body: &str) -> &'static str {
    if body.contains('{') && body.contains('}') {
        "application/json"
    } else {
        "text/plain"
    }
}

/// Renders the rate-limit denial response: the rule's configured body
/// verbatim when set, else the default reason string; status is the
/// configured `deny_status` if positive, else `429`.
pub fn rate_limit_denial(config: &RateLimitConfig) -> DenyResponse {
    let body = if config.deny_body.is_empty() {
        RateLimitConfig::DEFAULT_DENY_REASON.to_string()
    } else {
        config.deny_body.clone()
    };
    DenyResponse {
        status: config.resolved_deny_status(),
        content_type: detect_content_type(&body),
        body,
    }
}

/// Renders the quota denial response: the rule's configured body verbatim
/// when set, else the default reason string; status is the configured
/// `deny_status` if positive, else `403`.
pub fn quota_denial(config: &QuotaConfig) -> DenyResponse {
    let body = if config.deny_body.is_empty() {
        QuotaConfig::DEFAULT_DENY_REASON.to_string()
    } else {
        config.deny_body.clone()
    };
    DenyResponse {
        status: config.resolved_deny_status(),
        content_type: detect_content_type(&body),
        body,
    }
}

/// The canonical no-identifier response: always HTTP 403, always
/// this exact JSON body.
pub fn no_identifier_response() -> DenyResponse {
    DenyResponse {
        status: 403,
        body: r#"{"error":"Access denied","message":"No valid identifier found in request"}"#
            .to_string(),
        content_type: "application/json",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BucketKind;
    use std::time::Duration;

    fn rate_limit_config(deny_status: u16, deny_body: &str) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            rate: 10,
            burst: 20,
            period: Duration::from_secs(60),
            deny_status,
            deny_body: deny_body.to_string(),
        }
    }

    fn quota_config(deny_status: u16, deny_body: &str) -> QuotaConfig {
        QuotaConfig {
            enabled: true,
            limit: 3,
            bucket_kind: BucketKind::Daily,
            deny_status,
            deny_body: deny_body.to_string(),
            timezone: Default::default(),
        }
    }

    #[test]
    fn rate_limit_headers_include_retry_after_only_when_throttled() {
        let info = RateLimitInfo {
            limit: 10,
            burst: 20,
            available: 19,
            reset_time: 1_000,
            retry_after: 0,
        };
        let headers = rate_limit_headers(&info);
        assert!(headers.iter().any(|(k, v)| *k == "X-RateLimit-Remaining" && v == "19"));
        assert!(!headers.iter().any(|(k, _)| *k == "Retry-After"));

        let throttled = RateLimitInfo {
            retry_after: 6,
            ..info
        };
        let headers = rate_limit_headers(&throttled);
        assert!(headers.iter().any(|(k, v)| *k == "Retry-After" && v == "6"));
    }

    #[test]
    fn quota_headers_render_expected_fields() {
        let info = QuotaInfo {
            limit: 3,
            used: 3,
            remaining: 0,
            reset_time: 86_400,
            reset_in: 0,
        };
        let headers = quota_headers(&info);
        assert!(headers.contains(&("X-Quota-Limit", "3".to_string())));
        assert!(headers.contains(&("X-Quota-Used", "3".to_string())));
        assert!(headers.contains(&("X-Quota-Remaining", "0".to_string())));
    }

    #[test]
    fn rate_limit_denial_uses_default_reason_and_status_when_unconfigured() {
        let deny = rate_limit_denial(&rate_limit_config(0, ""));
        assert_eq!(deny.status, 429);
        assert_eq!(deny.body, "Rate limit exceeded");
        assert_eq!(deny.content_type, "text/plain");
    }

    #[test]
    fn quota_denial_uses_configured_body_and_status() {
        let deny = quota_denial(&quota_config(403, r#"{"error":"quota"}"#));
        assert_eq!(deny.status, 403);
        assert_eq!(deny.content_type, "application/json");
    }

    #[test]
    fn no_identifier_response_is_canonical() {
        let deny = no_identifier_response();
        assert_eq!(deny.status, 403);
        assert_eq!(deny.content_type, "application/json");
        assert_eq!(
            deny.body,
            r#"{"error":"Access denied","message":"No valid identifier found in request"}"#
        );
    }
}
