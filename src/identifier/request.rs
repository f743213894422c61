use std::collections::HashMap;

/// A transport-agnostic view over the request metadata the resolver needs:
/// headers, query parameters, cookies, and the remote socket
/// address. Decoupling this from `axum::extract::Request` keeps the
/// resolution algorithm unit-testable without constructing real HTTP
/// requests — the axum adapter that builds one from a live request lives
/// in `crate::middleware`.
#[derive(Debug, Clone, Default)]
pub struct RequestView {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    remote_addr: Option<String>,
}

impl RequestView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Case-insensitive per HTTP norms.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }
}

/// Strips a trailing `:port` suffix using the "last colon" rule,
/// so `"203.0.113.9:54321"` becomes `"203.0.113.9"`. Addresses with no
/// colon pass through unchanged.
pub fn strip_port_suffix(addr: &str) -> &str {
    match addr.rfind(':') {
        Some(idx) => &addr[..idx],
        None => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let view = RequestView::new().with_header("X-API-Key", "sk-a");
        assert_eq!(view.header("x-api-key"), Some("sk-a"));
        assert_eq!(view.header("X-API-KEY"), Some("sk-a"));
    }

    #[test]
    fn strips_last_colon_as_port_delimiter() {
        assert_eq!(strip_port_suffix("203.0.113.9:54321"), "203.0.113.9");
        assert_eq!(strip_port_suffix("203.0.113.9"), "203.0.113.9");
    }
}
