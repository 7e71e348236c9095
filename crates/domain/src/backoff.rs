//! Rate-limit backoff shared by the HTTP adapters.
//!
//! A 429 is retried after the delay the server asked for (`Retry-After`,
//! seconds) or [`DEFAULT_RETRY_AFTER`] when the header is missing. Repeated
//! 429s double the wait up to [`MAX_RATE_LIMIT_DELAY`], and every delay gets
//! up to 20% random jitter on top so parallel callers do not retry in
//! lock-step. The wait is never shorter than the server hint.

use std::time::Duration;

use rand::Rng;

pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(2);
pub const MAX_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

/// Parse a `Retry-After` header value given in whole seconds.
///
/// HTTP-date values are not used by the providers we talk to and are
/// treated as absent.
pub fn parse_retry_after(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// The deterministic part of the delay for the given retry attempt
/// (0-based), before jitter.
pub fn base_delay(retry_after_secs: Option<u64>, attempt: u32) -> Duration {
    let hint = retry_after_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER);
    let scaled = hint.saturating_mul(2u32.saturating_pow(attempt.min(5)));
    scaled.min(MAX_RATE_LIMIT_DELAY.max(hint))
}

/// Delay before retry `attempt` (0-based), including jitter.
pub fn rate_limit_delay(retry_after_secs: Option<u64>, attempt: u32) -> Duration {
    let base = base_delay(retry_after_secs, attempt);
    let max_jitter_ms = (base.as_millis() / 5) as u64;
    let jitter_ms = if max_jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=max_jitter_ms)
    };
    base + Duration::from_millis(jitter_ms)
}
