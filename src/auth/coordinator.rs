//! Single-flight refresh coordination
//!
//! The first caller to hit an expired session becomes the leader and runs the
//! refresh. Every caller that arrives while the leader is still running is
//! queued as a waiter and receives the leader's outcome, in the order it
//! joined. The critical section is a plain mutex that is never held across
//! an `.await`.

use super::types::RefreshOutcome;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Mutable coordinator state
///
/// Invariant: `waiters` is non-empty only while `in_progress` is true.
#[derive(Debug, Default)]
struct RefreshState {
    in_progress: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Coordinates at most one in-flight credential refresh per client
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    refreshes_started: AtomicU64,
}

/// What a caller got when it joined the coordinator
#[derive(Debug)]
pub enum RefreshTicket<'a> {
    /// The caller must run the refresh and settle the lease
    Leader(RefreshLease<'a>),
    /// A refresh is already running; await its outcome
    Waiter(RefreshWaiter),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current refresh, or start one if none is running
    pub fn join(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock();
        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(waiters = state.waiters.len(), "Refresh in progress, queued waiter");
            RefreshTicket::Waiter(RefreshWaiter { rx })
        } else {
            state.in_progress = true;
            self.refreshes_started.fetch_add(1, Ordering::SeqCst);
            RefreshTicket::Leader(RefreshLease {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Run `refresh` with single-flight semantics.
    ///
    /// The leader runs the closure; everybody else awaits the leader's outcome.
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        match self.join() {
            RefreshTicket::Leader(lease) => {
                info!("Session expired, refreshing credentials");
                let outcome = refresh().await.map_err(Arc::new);
                match &outcome {
                    Ok(()) => info!("Credential refresh succeeded"),
                    Err(e) => warn!("Credential refresh failed: {e}"),
                }
                lease.settle(outcome.clone());
                outcome
            }
            RefreshTicket::Waiter(waiter) => waiter.outcome().await,
        }
    }

    /// Whether a refresh is currently running
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_progress
    }

    /// Number of callers queued behind the running refresh
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Total number of refreshes started by this coordinator
    pub fn refreshes_started(&self) -> u64 {
        self.refreshes_started.load(Ordering::SeqCst)
    }

    /// Reset state and release every waiter, in FIFO order
    fn settle(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.state.lock();
            state.in_progress = false;
            std::mem::take(&mut state.waiters)
        };

        let released = waiters.len();
        for waiter in waiters {
            // A waiter whose caller went away is simply skipped
            let _ = waiter.send(outcome.clone());
        }
        debug!(released, "Released refresh waiters");
        released
    }
}

/// Held by the leader while it runs the refresh.
///
/// Dropping an unsettled lease releases every waiter with
/// `Error::RefreshAbandoned`, so a cancelled leader never strands the queue.
#[derive(Debug)]
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    /// Publish the refresh outcome; returns how many waiters were released
    pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.settle(&outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh leader dropped before settling, releasing waiters");
            self.coordinator
                .settle(&Err(Arc::new(Error::RefreshAbandoned)));
        }
    }
}

/// A queued caller awaiting the running refresh
#[derive(Debug)]
pub struct RefreshWaiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    /// Wait for the leader's outcome
    pub async fn outcome(self) -> RefreshOutcome {
        self.rx
            .await
            .unwrap_or_else(|_| Err(Arc::new(Error::RefreshAbandoned)))
    }
}
