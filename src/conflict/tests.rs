//! Tests for conflict module

use super::*;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_case::test_case;

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

async fn conflict_op() -> Result<u64> {
    Err(Error::version_conflict(3, 4))
}

async fn ok_op(version: u64) -> Result<u64> {
    Ok(version)
}

#[tokio::test]
async fn test_run_success_leaves_state_empty() {
    let controller = ConflictRetryController::new(3);
    let value = controller.run(|| ok_op(5)).await.unwrap();

    assert_eq!(value, 5);
    let state = controller.state();
    assert!(!state.has_conflict);
    assert!(state.conflict_error.is_none());
    assert_eq!(state.retry_count, 0);
}

#[tokio::test]
async fn test_run_conflict_is_recorded_and_returned() {
    let conflicts = counter();
    let seen = Arc::clone(&conflicts);
    let controller = ConflictRetryController::new(3).on_conflict(move |err| {
        assert!(err.is_conflict());
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let err = controller.run(conflict_op).await.unwrap_err();
    assert!(err.is_conflict());

    assert!(controller.has_conflict());
    let recorded = controller.conflict_error().unwrap();
    assert!(matches!(
        *recorded,
        Error::Conflict {
            current_version: Some(4),
            expected_version: Some(3),
            ..
        }
    ));
    assert_eq!(conflicts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_other_failure_untouched() {
    let conflicts = counter();
    let seen = Arc::clone(&conflicts);
    let controller = ConflictRetryController::new(3).on_conflict(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let err = controller
        .run(|| async { Err::<(), _>(Error::http_status(500, "boom")) })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    assert!(!controller.has_conflict());
    assert_eq!(conflicts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scenario_retry_resolves_conflict() {
    let controller = ConflictRetryController::new(3);
    assert!(controller.run(conflict_op).await.is_err());
    assert!(controller.has_conflict());

    let value = controller.retry(|| ok_op(5)).await.unwrap();
    assert_eq!(value, Some(5));
    assert!(!controller.has_conflict());
    assert!(controller.conflict_error().is_none());
    assert!(!controller.is_retrying());
    assert_eq!(controller.retry_count(), 1);
}

#[tokio::test]
async fn test_renewed_conflict_keeps_state() {
    let controller = ConflictRetryController::new(3);
    controller.run(conflict_op).await.unwrap_err();

    let err = controller.retry(conflict_op).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(controller.has_conflict());
    assert!(!controller.is_retrying());
    assert_eq!(controller.retry_count(), 1);
}

#[tokio::test]
async fn test_retry_other_failure_clears_retrying() {
    let controller = ConflictRetryController::new(3);
    controller.run(conflict_op).await.unwrap_err();

    let err = controller
        .retry(|| async { Err::<u64, _>(Error::Timeout { timeout_ms: 10 }) })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(!controller.is_retrying());
    assert!(controller.has_conflict());
}

#[tokio::test]
async fn test_is_retrying_during_operation() {
    let controller = Arc::new(ConflictRetryController::new(3));
    controller.run(conflict_op).await.unwrap_err();

    let observer = Arc::clone(&controller);
    let value = controller
        .retry(|| async move {
            assert!(observer.is_retrying());
            Ok(1)
        })
        .await
        .unwrap();
    assert_eq!(value, Some(1));
    assert!(!controller.is_retrying());
}

#[tokio::test]
async fn test_exhausted_fires_once_per_episode() {
    let exhausted = counter();
    let calls = counter();
    let seen = Arc::clone(&exhausted);
    let controller = ConflictRetryController::new(2).on_exhausted(move |state| {
        assert_eq!(state.retry_count, 2);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    controller.run(conflict_op).await.unwrap_err();
    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        let _ = controller
            .retry(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                conflict_op().await
            })
            .await;
    }
    assert!(controller.is_exhausted());

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let result = controller
            .retry(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ok_op(1).await
            })
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(exhausted.load(Ordering::SeqCst), 1);
    assert!(controller.has_conflict());
}

#[tokio::test]
async fn test_clear_conflict_resets_everything() {
    let exhausted = counter();
    let seen = Arc::clone(&exhausted);
    let controller = ConflictRetryController::new(1).on_exhausted(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    controller.run(conflict_op).await.unwrap_err();
    controller.retry(conflict_op).await.unwrap_err();
    assert_eq!(controller.retry(conflict_op).await.unwrap(), None);
    assert_eq!(exhausted.load(Ordering::SeqCst), 1);

    controller.clear_conflict();
    let state = controller.state();
    assert!(!state.has_conflict);
    assert!(state.conflict_error.is_none());
    assert_eq!(state.retry_count, 0);
    assert!(!state.is_retrying);

    // A fresh episode may retry and exhaust again
    controller.run(conflict_op).await.unwrap_err();
    assert_eq!(controller.retry(|| ok_op(9)).await.unwrap(), Some(9));
    controller.run(conflict_op).await.unwrap_err();
    assert_eq!(controller.retry(conflict_op).await.unwrap(), None);
    assert_eq!(exhausted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_retry_count_accumulates_across_episodes() {
    let controller = ConflictRetryController::new(3);

    controller.run(conflict_op).await.unwrap_err();
    controller.retry(|| ok_op(1)).await.unwrap();
    controller.run(conflict_op).await.unwrap_err();
    controller.retry(|| ok_op(2)).await.unwrap();

    assert_eq!(controller.retry_count(), 2);
    assert!(!controller.has_conflict());
}

#[test_case(Error::http_status(409, "stale"), true ; "http 409")]
#[test_case(Error::http_status(412, "precondition failed"), true ; "http 412 custom")]
#[test_case(Error::http_status(500, "boom"), false ; "server error")]
#[tokio::test]
async fn test_custom_classifier(err: Error, expected: bool) {
    let controller = ConflictRetryController::new(3).with_classifier(|err| {
        matches!(err, Error::HttpStatus { status: 409 | 412, .. })
    });

    let result: Result<()> = controller.run(|| async move { Err(err) }).await;
    assert!(result.is_err());
    assert_eq!(controller.has_conflict(), expected);
}

#[test]
fn test_default_bound() {
    let controller = ConflictRetryController::default();
    assert_eq!(controller.max_retries(), DEFAULT_MAX_RETRIES);
    assert!(!controller.is_exhausted());
}
