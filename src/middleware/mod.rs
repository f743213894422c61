pub mod request_id;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};

use crate::decision::{self, Header};
use crate::engine::ProxyState;
use crate::error::{CoreError, ResolverError};
use crate::identifier::{self, RequestView};

/// Parses a raw `Cookie` header value (`"a=1; b=2"`) into name/value pairs.
fn parse_cookie_header(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(';').filter_map(|pair| {
        let pair = pair.trim();
        let (name, value) = pair.split_once('=')?;
        Some((name.trim(), value.trim()))
    })
}

/// Splits a raw query string (`"a=1&b=2"`) into name/value pairs. No
/// percent-decoding is performed — identifier matching in this crate
/// compares configured values against the raw query bytes.
fn parse_query_string(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split('&').filter_map(|pair| {
        if pair.is_empty() {
            return None;
        }
        match pair.split_once('=') {
            Some((name, value)) => Some((name, value)),
            None => Some((pair, "")),
        }
    })
}

/// Builds the transport-agnostic [`RequestView`] the resolver operates on,
/// out of a live `axum::extract::Request`.
fn request_view(request: &Request) -> RequestView {
    let mut view = RequestView::new();

    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            view = view.with_header(name.as_str(), value);
        }
    }

    if let Some(cookie_header) = request.headers().get(axum::http::header::COOKIE) {
        if let Ok(raw) = cookie_header.to_str() {
            for (name, value) in parse_cookie_header(raw) {
                view = view.with_cookie(name, value);
            }
        }
    }

    if let Some(query) = request.uri().query() {
        for (name, value) in parse_query_string(query) {
            view = view.with_query(name, value);
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        view = view.with_remote_addr(addr.to_string());
    }

    view
}

fn apply_headers(headers: &mut HeaderMap, pairs: Vec<Header>) {
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
}

/// Renders a [`CoreError`] into a `Response` and layers the rule's
/// `X-RateLimit-*`/`X-Quota-*` headers on top — the single
/// error-to-response conversion at the axum boundary.
fn deny_response(error: CoreError, extra_headers: Vec<Header>) -> Response {
    let mut response = error.into_response();
    apply_headers(response.headers_mut(), extra_headers);
    response
}

fn as_core_error(deny: decision::DenyResponse, rate_limit: bool) -> CoreError {
    let status = StatusCode::from_u16(deny.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if rate_limit {
        CoreError::RateLimitExceeded {
            status,
            body: deny.body,
            content_type: deny.content_type,
        }
    } else {
        CoreError::QuotaExceeded {
            status,
            body: deny.body,
            content_type: deny.content_type,
        }
    }
}

/// The axum middleware entry point: `axum::middleware::from_fn_with_state`
/// wraps this function with the shared [`ProxyState`].
pub async fn rate_limit_quota(
    State(state): State<Arc<ProxyState>>,
    request: Request,
    next: Next,
) -> Response {
    let view = request_view(&request);

    let resolved = match identifier::resolve(state.engines().iter().map(|e| &e.rule), &view) {
        Ok(resolved) => resolved,
        Err(_) => {
            return deny_response(CoreError::NoIdentifier(ResolverError), Vec::new());
        }
    };

    let engine = &state.engines()[resolved.rule_index];
    let identifier = resolved.identifier.as_str();

    let mut rate_limit_headers = Vec::new();
    if let Some(limiter) = &engine.rate_limiter {
        match limiter.allow(identifier).await {
            crate::limiter::Decision::Denied => {
                let info = limiter.info(identifier).await;
                let deny = decision::rate_limit_denial(&engine.rule.rate_limit);
                return deny_response(
                    as_core_error(deny, true),
                    decision::rate_limit_headers(&info),
                );
            }
            crate::limiter::Decision::Allowed => {
                let info = limiter.info(identifier).await;
                rate_limit_headers = decision::rate_limit_headers(&info);
            }
        }
    }

    if let Some(quota) = &engine.quota_counter {
        let (check_decision, info) = quota.check(identifier).await;
        if check_decision == crate::quota::Decision::Denied {
            let deny = decision::quota_denial(&engine.rule.quota);
            return deny_response(as_core_error(deny, false), decision::quota_headers(&info));
        }
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), rate_limit_headers);

    if let Some(quota) = &engine.quota_counter {
        let info = quota.consume(identifier, 1).await;
        apply_headers(response.headers_mut(), decision::quota_headers(&info));
    }

    response
}

/// Attaches the rate-limit/quota middleware to a router for a given
/// [`ProxyState`]. Takes and returns the `Router` (rather than handing
/// back a bare `Layer` value) so the opaque `from_fn_with_state` type never
/// needs to be named at the call site.
pub fn rate_limit_quota_layer<S>(router: axum::Router<S>, state: Arc<ProxyState>) -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum::middleware::from_fn_with_state(state, rate_limit_quota))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BucketKind, IdentifierKind, QuotaConfig, RateLimitConfig, RuleSet};
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use std::time::Duration;
    use tower::ServiceExt;

    fn rate_limit(rate: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            rate,
            burst,
            period: Duration::from_secs(60),
            deny_status: 0,
            deny_body: String::new(),
        }
    }

    fn quota(limit: i64, body: &str) -> QuotaConfig {
        QuotaConfig {
            enabled: true,
            limit,
            bucket_kind: BucketKind::Daily,
            deny_status: 0,
            deny_body: body.to_string(),
            timezone: Default::default(),
        }
    }

    async fn ok_handler() -> Response {
        StatusCode::OK.into_response()
    }

    fn app(state: ProxyState) -> Router {
        let router = Router::new().route("/", get(ok_handler));
        rate_limit_quota_layer(router, Arc::new(state))
    }

    #[tokio::test]
    async fn no_identifier_returns_403_canonical_body() {
        let rules = RuleSet::builder()
            .rule(
                IdentifierKind::Header,
                "X-API-Key",
                "sk-a",
                rate_limit(10, 20),
                QuotaConfig::disabled(),
            )
            .build()
            .unwrap();
        let store: Arc<dyn crate::store::StoreBackend> = Arc::new(InMemoryStore::new());
        let state = ProxyState::new(
            &rules,
            store,
            &crate::config::StoreConfig {
                address: String::new(),
                password: None,
                db: 0,
                connect_timeout: Duration::from_secs(5),
                fail_open: true,
            },
        );

        let response = app(state)
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn exact_header_match_allowed_reports_remaining() {
        let rules = RuleSet::builder()
            .rule(
                IdentifierKind::Header,
                "X-API-Key",
                "sk-a",
                rate_limit(10, 20),
                QuotaConfig::disabled(),
            )
            .build()
            .unwrap();
        let store: Arc<dyn crate::store::StoreBackend> = Arc::new(InMemoryStore::new());
        let state = ProxyState::new(
            &rules,
            store,
            &crate::config::StoreConfig {
                address: String::new(),
                password: None,
                db: 0,
                connect_timeout: Duration::from_secs(5),
                fail_open: true,
            },
        );

        let response = app(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("X-API-Key", "sk-a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("X-RateLimit-Remaining").unwrap(),
            "19"
        );
        assert_eq!(response.headers().get("X-RateLimit-Limit").unwrap(), "10");
    }

    #[tokio::test]
    async fn wrong_header_value_has_no_match_and_falls_through_to_403() {
        let rules = RuleSet::builder()
            .rule(
                IdentifierKind::Header,
                "X-API-Key",
                "sk-a",
                rate_limit(10, 20),
                QuotaConfig::disabled(),
            )
            .build()
            .unwrap();
        let store: Arc<dyn crate::store::StoreBackend> = Arc::new(InMemoryStore::new());
        let state = ProxyState::new(
            &rules,
            store,
            &crate::config::StoreConfig {
                address: String::new(),
                password: None,
                db: 0,
                connect_timeout: Duration::from_secs(5),
                fail_open: true,
            },
        );

        let response = app(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("X-API-Key", "sk-b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn fallback_sentinel_throttles_on_sixth_request() {
        let rules = RuleSet::builder()
            .rule(
                IdentifierKind::Header,
                "X-User-ID",
                "anonymous",
                rate_limit(5, 5),
                QuotaConfig::disabled(),
            )
            .build()
            .unwrap();
        let store: Arc<dyn crate::store::StoreBackend> = Arc::new(InMemoryStore::new());
        let state = Arc::new(ProxyState::new(
            &rules,
            store,
            &crate::config::StoreConfig {
                address: String::new(),
                password: None,
                db: 0,
                connect_timeout: Duration::from_secs(5),
                fail_open: true,
            },
        ));

        for _ in 0..5 {
            let router = Router::new().route("/", get(ok_handler));
            let router = rate_limit_quota_layer(router, state.clone());
            let response = router
                .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let router = Router::new().route("/", get(ok_handler));
        let router = rate_limit_quota_layer(router, state);
        let response = router
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Rate limit exceeded");
    }

    #[tokio::test]
    async fn quota_exhaustion_on_fourth_request_uses_configured_body() {
        let rules = RuleSet::builder()
            .rule(
                IdentifierKind::Ip,
                "",
                "",
                RateLimitConfig::disabled(),
                quota(3, "quota exceeded, try again tomorrow"),
            )
            .build()
            .unwrap();
        let store: Arc<dyn crate::store::StoreBackend> = Arc::new(InMemoryStore::new());
        let state = Arc::new(ProxyState::new(
            &rules,
            store,
            &crate::config::StoreConfig {
                address: String::new(),
                password: None,
                db: 0,
                connect_timeout: Duration::from_secs(5),
                fail_open: true,
            },
        ));

        for _ in 0..3 {
            let router = Router::new().route("/", get(ok_handler));
            let router = rate_limit_quota_layer(router, state.clone());
            let response = router
                .oneshot(
                    HttpRequest::builder()
                        .uri("/")
                        .header("x-real-ip", "10.0.0.1")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let router = Router::new().route("/", get(ok_handler));
        let router = rate_limit_quota_layer(router, state);
        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header("x-real-ip", "10.0.0.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().get("X-Quota-Used").unwrap(), "3");
        assert_eq!(response.headers().get("X-Quota-Remaining").unwrap(), "0");
    }

    #[tokio::test]
    async fn combined_rate_and_quota_limiter_wins_quota_stays_put() {
        let rules = RuleSet::builder()
            .rule(
                IdentifierKind::Ip,
                "",
                "",
                rate_limit(2, 2),
                quota(100, ""),
            )
            .build()
            .unwrap();
        let store: Arc<dyn crate::store::StoreBackend> = Arc::new(InMemoryStore::new());
        let state = Arc::new(ProxyState::new(
            &rules,
            store,
            &crate::config::StoreConfig {
                address: String::new(),
                password: None,
                db: 0,
                connect_timeout: Duration::from_secs(5),
                fail_open: true,
            },
        ));

        let mut last_status = StatusCode::OK;
        for _ in 0..3 {
            let router = Router::new().route("/", get(ok_handler));
            let router = rate_limit_quota_layer(router, state.clone());
            let response = router
                .oneshot(
                    HttpRequest::builder()
                        .uri("/")
                        .header("x-real-ip", "10.0.0.2")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            last_status = response.status();
        }
        assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);

        let engine = &state.engines()[0];
        let (_, info) = engine
            .quota_counter
            .as_ref()
            .unwrap()
            .check("10.0.0.2")
            .await;
        assert_eq!(info.used, 2);
    }
}
