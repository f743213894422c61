//! Backing-store key composition.
//!
//! The identifier is embedded verbatim into the key except for one
//! escape: a literal `:` inside the identifier is percent-encoded to
//! `%3A` first, so an identifier containing a colon can never be
//! mistaken for a key-field delimiter.

fn encode_identifier(identifier: &str) -> String {
    identifier.replace(':', "%3A")
}

pub fn rate_limit_tokens_key(identifier: &str) -> String {
    format!("ratelimit:{}:tokens", encode_identifier(identifier))
}

pub fn rate_limit_last_refill_key(identifier: &str) -> String {
    format!("ratelimit:{}:last_refill", encode_identifier(identifier))
}

pub fn quota_key(identifier: &str, period_label: &str) -> String {
    format!("quota:{}:{}", encode_identifier(identifier), period_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_in_identifier_is_percent_encoded() {
        assert_eq!(
            rate_limit_tokens_key("a:b"),
            "ratelimit:a%3Ab:tokens".to_string()
        );
    }

    #[test]
    fn plain_identifier_passes_through() {
        assert_eq!(rate_limit_tokens_key("10.0.0.1"), "ratelimit:10.0.0.1:tokens");
    }

    #[test]
    fn quota_key_embeds_period_label() {
        assert_eq!(quota_key("sk-a", "2026-07-26"), "quota:sk-a:2026-07-26");
    }
}
