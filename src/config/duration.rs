use std::time::Duration;

use crate::error::ConfigError;

/// Parses a duration literal of the customary `<n><unit>` form used in the
/// configuration schema: `ns`, `us`, `ms`, `s`, `m`, `h` — e.g. `"1s"`,
/// `"30m"`, `"24h"`.
///
/// An empty string is rejected here; callers that want the "empty defaults
/// to 1 minute" behavior for rate-limit periods apply that fallback before
/// calling this function (see [`parse_rate_limit_period`]).
pub fn parse_duration(literal: &str) -> Result<Duration, ConfigError> {
    let literal = literal.trim();
    if literal.is_empty() {
        return Err(ConfigError::InvalidDuration(literal.to_string()));
    }

    let split_at = literal
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ConfigError::InvalidDuration(literal.to_string()))?;
    let (number, unit) = literal.split_at(split_at);

    let n: u64 = number
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(literal.to_string()))?;

    let duration = match unit {
        "ns" => Duration::from_nanos(n),
        "us" => Duration::from_micros(n),
        "ms" => Duration::from_millis(n),
        "s" => Duration::from_secs(n),
        "m" => Duration::from_secs(n * 60),
        "h" => Duration::from_secs(n * 3600),
        _ => return Err(ConfigError::InvalidDuration(literal.to_string())),
    };

    Ok(duration)
}

/// As [`parse_duration`], but an empty literal defaults to one minute — the
/// behavior the schema specifies for `rate_limit.period`.
pub fn parse_rate_limit_period(literal: &str) -> Result<Duration, ConfigError> {
    if literal.trim().is_empty() {
        return Ok(Duration::from_secs(60));
    }
    parse_duration(literal)
}
