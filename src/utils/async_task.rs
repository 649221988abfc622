use std::future::Future;

use tokio::time::sleep;
use tracing::debug;
use tracing::warn;

use crate::utils::backoff::retry_backoff;
use crate::BackoffPolicy;
use crate::Result;
use crate::TruncateError;

/// Outcome of a drained submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct DrainStats {
    /// Submissions made, including the first one
    pub submissions: usize,
}

impl DrainStats {
    pub(crate) fn retries(&self) -> usize {
        self.submissions.saturating_sub(1)
    }
}

/// Submit `initial`, then keep resubmitting whatever `task` hands back as
/// unprocessed until nothing is left.
///
/// The n-th resubmission (0-indexed) is preceded by `retry_backoff(n)`.
/// Hard errors from `task` are returned immediately and never retried.
/// With `policy.max_retries == 0` resubmission is unbounded; otherwise the
/// remainder is reported as [`TruncateError::RetriesExhausted`].
pub(crate) async fn retry_until_drained<T, F, Fut>(
    mut task: F,
    initial: Vec<T>,
    policy: BackoffPolicy,
) -> Result<DrainStats>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut stats = DrainStats::default();
    let mut pending = initial;
    let mut retries = 0;

    while !pending.is_empty() {
        let unprocessed = task(pending).await?;
        stats.submissions += 1;

        if unprocessed.is_empty() {
            break;
        }

        if policy.max_retries > 0 && retries >= policy.max_retries {
            warn!(
                "giving up with {} unprocessed requests after {} submissions",
                unprocessed.len(),
                stats.submissions
            );
            return Err(TruncateError::RetriesExhausted {
                remaining: unprocessed.len(),
                attempts: stats.submissions,
            }
            .into());
        }

        let delay = retry_backoff(retries, &policy);
        debug!(
            "{} requests unprocessed, resubmitting in {:?} (retry {})",
            unprocessed.len(),
            delay,
            retries + 1
        );
        sleep(delay).await;
        retries += 1;
        pending = unprocessed;
    }

    Ok(stats)
}
