//! Tests for staleness module

use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

// ============================================================================
// StalenessGuard Tests
// ============================================================================

#[test]
fn test_guard_begin_is_monotonic() {
    let guard = StalenessGuard::new();
    let t1 = guard.begin();
    let t2 = guard.begin();

    assert!(t2 > t1);
    assert!(!guard.is_current(t1));
    assert!(guard.is_current(t2));
    assert_eq!(guard.current(), t2);
}

#[test]
fn test_guard_clear_supersedes_without_new_token() {
    let guard = StalenessGuard::new();
    let token = guard.begin();
    guard.clear();

    assert!(!guard.is_current(token));
    assert_ne!(guard.current(), token);
}

#[tokio::test]
async fn test_guard_last_begin_wins_out_of_order() {
    let guard = Arc::new(StalenessGuard::new());
    let applied = Arc::new(std::sync::Mutex::new(Vec::new()));

    let (slow_tx, slow_rx) = oneshot::channel::<&'static str>();
    let (fast_tx, fast_rx) = oneshot::channel::<&'static str>();

    let t1 = guard.begin();
    let slow = {
        let guard = Arc::clone(&guard);
        let applied = Arc::clone(&applied);
        tokio::spawn(async move {
            let value = slow_rx.await.unwrap();
            if guard.is_current(t1) {
                applied.lock().unwrap().push(value);
            }
        })
    };

    let t2 = guard.begin();
    let fast = {
        let guard = Arc::clone(&guard);
        let applied = Arc::clone(&applied);
        tokio::spawn(async move {
            let value = fast_rx.await.unwrap();
            if guard.is_current(t2) {
                applied.lock().unwrap().push(value);
            }
        })
    };

    // Later request resolves first, earlier one afterwards
    fast_tx.send("second").unwrap();
    fast.await.unwrap();
    slow_tx.send("first").unwrap();
    slow.await.unwrap();

    assert_eq!(*applied.lock().unwrap(), vec!["second"]);
}

// ============================================================================
// DebouncedPreview Tests
// ============================================================================

fn doubling_preview(calls: Arc<AtomicUsize>) -> DebouncedPreview<u64, u64> {
    DebouncedPreview::new(Duration::from_millis(300), move |delay_ms: u64| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(delay_ms * 2)
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_preview_debounces_rapid_changes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let preview = doubling_preview(Arc::clone(&calls));

    preview.schedule(10);
    tokio::time::sleep(Duration::from_millis(100)).await;
    preview.schedule(20);
    tokio::time::sleep(Duration::from_millis(100)).await;
    preview.schedule(30);

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(preview.result().as_deref(), Some(&60));
    assert!(!preview.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_preview_discards_slow_superseded_result() {
    let calls = Arc::new(AtomicUsize::new(0));
    let preview = doubling_preview(Arc::clone(&calls));

    // First computation starts at 300ms and takes 500ms
    preview.schedule(500);
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(preview.is_loading());

    // Second starts at 650ms and finishes at 660ms, before the first
    preview.schedule(10);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(preview.result().as_deref(), Some(&20));
    assert!(!preview.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_preview_stale_failure_is_silent() {
    let preview = DebouncedPreview::new(Duration::from_millis(50), |fail: bool| async move {
        if fail {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Err(Error::fetch("preview", "boom"))
        } else {
            Ok("ok")
        }
    });

    preview.schedule(true);
    tokio::time::sleep(Duration::from_millis(100)).await;
    preview.schedule(false);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let state = preview.state();
    assert!(!state.is_error());
    assert_eq!(state.result.as_deref(), Some(&"ok"));
}

#[tokio::test(start_paused = true)]
async fn test_preview_current_failure_surfaces() {
    let preview: DebouncedPreview<(), ()> =
        DebouncedPreview::new(Duration::from_millis(50), |()| async {
            Err(Error::fetch("preview", "unavailable"))
        });

    preview.schedule(());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let state = preview.state();
    assert!(state.is_error());
    assert!(!state.is_loading);
    assert!(state.result.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_preview_refresh_runs_immediately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let preview = doubling_preview(Arc::clone(&calls));

    assert!(!preview.refresh().await);

    preview.schedule(5);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(preview.refresh().await);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(preview.result().as_deref(), Some(&10));
}

#[tokio::test(start_paused = true)]
async fn test_preview_clear_cancels_pending_and_in_flight() {
    let calls = Arc::new(AtomicUsize::new(0));
    let preview = doubling_preview(Arc::clone(&calls));

    // Pending timer is cancelled
    preview.schedule(10);
    preview.clear();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // In-flight computation completes but is not applied
    preview.schedule(400);
    tokio::time::sleep(Duration::from_millis(350)).await;
    preview.clear();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let state = preview.state();
    assert!(state.result.is_none());
    assert!(!state.is_loading);
    assert!(!preview.refresh().await);
}
