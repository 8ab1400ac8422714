//! Retry backoff constants and helpers

use std::time::Duration;

/// Maximum number of retries for failed requests.
/// 6 retries with exponential backoff rides out rate-limit windows and brief
/// upstream outages without looping forever on persistent failures.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Initial backoff delay in milliseconds.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Maximum backoff delay in milliseconds.
/// 60 seconds caps exponential growth (retry 6 = 64s capped to 60s) and also
/// caps whatever `Retry-After` the server asks for.
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;

/// Calculate the exponential backoff delay for a 0-indexed attempt, capped.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(max)
}
