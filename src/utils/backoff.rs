use std::time::Duration;

use crate::BackoffPolicy;

/// Delay before resubmission number `attempt` (0-indexed).
///
/// `min(max_delay, base_delay * 2^attempt)`. Saturates instead of
/// overflowing for large attempts and never returns a zero delay.
pub fn retry_backoff(
    attempt: usize,
    policy: &BackoffPolicy,
) -> Duration {
    let factor = u32::try_from(attempt).ok().and_then(|shift| 1u64.checked_shl(shift));
    let delay_ms = factor
        .and_then(|f| policy.base_delay_ms.checked_mul(f))
        .unwrap_or(u64::MAX)
        .min(policy.max_delay_ms);
    Duration::from_millis(delay_ms.max(1))
}
