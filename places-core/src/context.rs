//! Request-scoped cancellation and deadlines.
//!
//! A [`RequestContext`] carries the caller's cancellation signal and an
//! optional deadline. Children made with [`RequestContext::with_timeout`]
//! share the parent's signal and can only shorten its deadline, so the
//! orchestrator can tell "my sub-deadline fired" apart from "the caller hung
//! up". [`RequestContext::detached`] starts a fresh lifetime for background
//! work that must outlive the request.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{SearchError, SearchResult};

#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels the root context it was created with. Dropping the handle does
/// not cancel; use [`CancelHandle::cancel_on_drop`] for that.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Turn the handle into a guard that cancels when dropped.
    pub fn cancel_on_drop(self) -> CancelOnDrop {
        CancelOnDrop { handle: Some(self) }
    }
}

/// Cancels its context on drop unless disarmed.
#[derive(Debug)]
pub struct CancelOnDrop {
    handle: Option<CancelHandle>,
}

impl CancelOnDrop {
    /// Keep the context alive; the request finished normally.
    pub fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self {
            cancel: rx,
            deadline: None,
        }
    }

    /// A root context cancelled through the returned handle.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancel: rx,
                deadline: None,
            },
            CancelHandle { tx },
        )
    }

    /// A child sharing this context's cancellation whose deadline is at most
    /// `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    /// A fresh context, unrelated to any caller, that expires after `timeout`.
    pub fn detached(timeout: Duration) -> Self {
        Self::background().with_timeout(timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| deadline <= Instant::now())
            .unwrap_or(false)
    }

    /// Resolves once the context is cancelled. Pending forever for contexts
    /// that cannot be cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `fut` under this context.
    ///
    /// Cancellation wins over everything, then the future's own result, then
    /// the deadline.
    pub async fn run<T, F>(&self, fut: F) -> SearchResult<T>
    where
        F: Future<Output = SearchResult<T>>,
    {
        if self.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if self.is_expired() {
            return Err(SearchError::DeadlineExceeded);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(SearchError::Cancelled),
            result = fut => result,
            _ = expired => Err(SearchError::DeadlineExceeded),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}
