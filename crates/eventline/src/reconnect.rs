//! Reconnect backoff policy.

use std::time::Duration;

/// Growth factor between consecutive reconnect delays.
pub(crate) const BACKOFF_MULTIPLIER: f64 = 1.5;

/// Ceiling on any single reconnect delay.
pub(crate) const MAX_RECONNECT_DELAY: Duration = Duration::from_millis(60_000);

/// Delay before automatic reconnect attempt `attempt` (1-based):
/// `min(base × 1.5^(attempt−1), 60s)`.
pub(crate) fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let delay = base.as_millis() as f64 * BACKOFF_MULTIPLIER.powi(exponent as i32);
    let capped = delay.min(MAX_RECONNECT_DELAY.as_millis() as f64);
    Duration::from_millis(capped.round() as u64)
}
