use std::time::Duration;

const BASE_DELAY_SECS: u64 = 2;
const MAX_DELAY_SECS: u64 = 10;

/// Delay before retrying after the given failed attempt (1-based): doubles
/// from two seconds, capped at ten.
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let secs = BASE_DELAY_SECS.saturating_mul(2u64.saturating_pow(exponent));
    Duration::from_secs(secs.min(MAX_DELAY_SECS))
}
