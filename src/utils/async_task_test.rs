use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::utils::async_task::retry_until_drained;
use crate::BackoffPolicy;
use crate::Error;
use crate::StorageError;
use crate::TruncateError;

/// Rejects the last `reject` requests of each of the first `rounds` calls.
fn flaky_task(
    reject: usize,
    rounds: usize,
    calls: Arc<Mutex<Vec<(Instant, usize)>>>,
) -> impl FnMut(Vec<u32>) -> std::future::Ready<crate::Result<Vec<u32>>> {
    move |pending: Vec<u32>| {
        let mut calls = calls.lock();
        calls.push((Instant::now(), pending.len()));
        let unprocessed = if calls.len() <= rounds {
            let keep = pending.len().saturating_sub(reject);
            pending[keep..].to_vec()
        } else {
            Vec::new()
        };
        std::future::ready(Ok(unprocessed))
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_drained_converges() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let task = flaky_task(3, 4, calls.clone());

    let stats = retry_until_drained(task, (0..25).collect(), BackoffPolicy::default())
        .await
        .expect("should drain");

    assert_eq!(stats.submissions, 5);
    assert_eq!(stats.retries(), 4);
    let calls = calls.lock();
    assert_eq!(calls[0].1, 25);
    // only the unprocessed remainder is resubmitted
    assert!(calls[1..].iter().all(|(_, len)| *len == 3));
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_drained_waits_backoff_between_submissions() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let task = flaky_task(1, 3, calls.clone());

    retry_until_drained(task, vec![1, 2, 3], BackoffPolicy::default()).await.unwrap();

    let calls = calls.lock();
    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1].0 - w[0].0).collect();
    assert_eq!(gaps.len(), 3);
    assert!(gaps[0] >= Duration::from_millis(64));
    assert!(gaps[1] >= Duration::from_millis(128));
    assert!(gaps[2] >= Duration::from_millis(256));
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_drained_does_not_retry_hard_errors() {
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    let task = move |_pending: Vec<u32>| {
        *counter.lock() += 1;
        std::future::ready(Err::<Vec<u32>, _>(Error::Storage(StorageError::Throttled {
            table: "user".into(),
            message: "rate exceeded".into(),
        })))
    };

    let result = retry_until_drained(task, vec![1, 2], BackoffPolicy::default()).await;

    assert!(matches!(result, Err(Error::Storage(StorageError::Throttled { .. }))));
    assert_eq!(*calls.lock(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_drained_honours_retry_ceiling() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let task = flaky_task(2, usize::MAX, calls.clone());
    let policy = BackoffPolicy {
        max_retries: 3,
        ..Default::default()
    };

    let result = retry_until_drained(task, vec![1, 2, 3, 4], policy).await;

    assert!(matches!(
        result,
        Err(Error::Truncate(TruncateError::RetriesExhausted {
            remaining: 2,
            attempts: 4
        }))
    ));
    assert_eq!(calls.lock().len(), 4);
}

#[tokio::test]
async fn test_retry_until_drained_single_clean_submission() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let task = flaky_task(0, 0, calls.clone());

    let stats = retry_until_drained(task, vec![7], BackoffPolicy::default()).await.unwrap();

    assert_eq!(stats.submissions, 1);
    assert_eq!(stats.retries(), 0);
}
