/// In-memory shape of a token bucket: `tokens` is intentionally
/// fractional — rates like 100 tokens / 1h need sub-integer state between
/// refills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucketState {
    pub tokens: f64,
    /// Nanoseconds since the Unix epoch.
    pub last_refill_ns: i64,
}

impl TokenBucketState {
    pub fn full(burst: u32, now_ns: i64) -> Self {
        Self {
            tokens: burst as f64,
            last_refill_ns: now_ns,
        }
    }
}

/// Pure lazy-refill function. Deterministic: same inputs, same
/// output. Computes elapsed time in real (fractional) seconds — callers
/// must not round `elapsed` to whole periods, or sub-period traffic would
/// never earn tokens back.
pub fn refill(
    state: TokenBucketState,
    now_ns: i64,
    rate: u32,
    burst: u32,
    period: std::time::Duration,
) -> TokenBucketState {
    let elapsed_ns = (now_ns - state.last_refill_ns).max(0) as f64;
    let period_secs = period.as_secs_f64();
    let added = if period_secs > 0.0 {
        rate as f64 * (elapsed_ns / 1e9 / period_secs)
    } else {
        0.0
    };
    TokenBucketState {
        tokens: (state.tokens + added).min(burst as f64),
        last_refill_ns: now_ns,
    }
}
