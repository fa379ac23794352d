//! Tests for the refresh coordinator

use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[test]
fn test_join_leader_then_waiter() {
    let coordinator = RefreshCoordinator::new();
    assert!(!coordinator.is_refreshing());

    let leader = coordinator.join();
    assert!(matches!(leader, RefreshTicket::Leader(_)));
    assert!(coordinator.is_refreshing());

    let waiter = coordinator.join();
    assert!(matches!(waiter, RefreshTicket::Waiter(_)));
    assert_eq!(coordinator.waiter_count(), 1);
    assert_eq!(coordinator.refreshes_started(), 1);
}

#[tokio::test]
async fn test_settle_success_releases_waiters() {
    let coordinator = RefreshCoordinator::new();

    let RefreshTicket::Leader(lease) = coordinator.join() else {
        panic!("first join must lead");
    };
    let RefreshTicket::Waiter(w1) = coordinator.join() else {
        panic!("second join must wait");
    };
    let RefreshTicket::Waiter(w2) = coordinator.join() else {
        panic!("third join must wait");
    };

    assert_eq!(lease.settle(Ok(())), 2);
    assert!(!coordinator.is_refreshing());
    assert_eq!(coordinator.waiter_count(), 0);

    assert!(w1.outcome().await.is_ok());
    assert!(w2.outcome().await.is_ok());
}

#[tokio::test]
async fn test_settle_failure_rejects_waiters_with_refresh_error() {
    let coordinator = RefreshCoordinator::new();

    let RefreshTicket::Leader(lease) = coordinator.join() else {
        panic!("first join must lead");
    };
    let RefreshTicket::Waiter(waiter) = coordinator.join() else {
        panic!("second join must wait");
    };

    lease.settle(Err(Arc::new(Error::http_status(403, "session revoked"))));

    let err = waiter.outcome().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn test_waiters_released_in_fifo_order() {
    let coordinator = RefreshCoordinator::new();

    let RefreshTicket::Leader(lease) = coordinator.join() else {
        panic!("first join must lead");
    };

    // Single-threaded runtime: woken tasks run in the order they were woken
    let released = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for index in 0..5usize {
        let RefreshTicket::Waiter(waiter) = coordinator.join() else {
            panic!("joins while refreshing must wait");
        };
        let released = released.clone();
        handles.push(tokio::spawn(async move {
            assert!(waiter.outcome().await.is_ok());
            released.lock().push(index);
        }));
    }

    // Park every waiter task on its channel before settling
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
    assert!(released.lock().is_empty());

    assert_eq!(lease.settle(Ok(())), 5);
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*released.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_dropped_lease_abandons_waiters() {
    let coordinator = RefreshCoordinator::new();

    let RefreshTicket::Leader(lease) = coordinator.join() else {
        panic!("first join must lead");
    };
    let RefreshTicket::Waiter(waiter) = coordinator.join() else {
        panic!("second join must wait");
    };

    drop(lease);

    assert!(!coordinator.is_refreshing());
    let err = waiter.outcome().await.unwrap_err();
    assert!(matches!(*err, Error::RefreshAbandoned));
}

#[tokio::test]
async fn test_new_refresh_after_settle() {
    let coordinator = RefreshCoordinator::new();

    let outcome = coordinator.run(|| async { Ok(()) }).await;
    assert!(outcome.is_ok());

    let outcome = coordinator
        .run(|| async { Err(Error::http_status(401, "")) })
        .await;
    assert!(outcome.is_err());

    assert_eq!(coordinator.refreshes_started(), 2);
    assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn test_run_single_flight() {
    let coordinator = Arc::new(RefreshCoordinator::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let coordinator = coordinator.clone();
        let calls = calls.clone();
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .run(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Ok(())
                })
                .await
        }));
    }

    // Wait until everybody but the leader is queued
    while coordinator.waiter_count() < 7 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    gate.notify_one();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.refreshes_started(), 1);
}
