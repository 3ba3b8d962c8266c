//! Scoped unit of work.
//!
//! A [`Context`] bounds the lifetime of one message cascade: every handler
//! invocation it triggers runs as a tracked child task, events produced
//! anywhere in the cascade are collected in its result queue, and closing
//! the context guarantees no child task survives the scope.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::DispatchError;
use crate::feed::Feed;
use crate::mediator::MediatorInner;
use crate::message::{Class, Envelope, Message};

/// Shared state of a context, reachable from the guard and from every
/// [`crate::Scope`] handed to its handlers.
pub(crate) struct ContextInner<M: Message> {
    id: u64,
    mediator: Arc<MediatorInner<M>>,
    results_tx: mpsc::UnboundedSender<Envelope<M>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    feed: Feed<M::Feed>,
    close_grace: Duration,
}

impl<M: Message> ContextInner<M> {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn feed(&self) -> &Feed<M::Feed> {
        &self.feed
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Stamp-and-route entry point shared by `Context::process` and
    /// `Scope::dispatch`. Events are appended to the result queue before
    /// routing, so the queue preserves production order.
    pub(crate) fn submit(self: &Arc<Self>, envelope: Envelope<M>) -> Result<(), DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::ContextClosed(self.id));
        }
        log::debug!(
            "context `{}` processing {} {:?}",
            self.id,
            envelope.class(),
            envelope.kind()
        );
        if envelope.class() == Class::Event {
            // The guard may already have stopped reading; results are
            // best-effort at that point.
            let _ = self.results_tx.send(envelope.clone());
        }
        self.mediator.route(envelope, self);
        Ok(())
    }
}

/// Guard for one unit of work obtained from [`crate::Mediator::context`].
///
/// Call [`Context::close`] when done; dropping the guard without closing
/// still cancels every child task, but cannot wait for them to wind down.
pub struct Context<M: Message> {
    inner: Arc<ContextInner<M>>,
    results_rx: mpsc::UnboundedReceiver<Envelope<M>>,
    closed: bool,
}

impl<M: Message> Context<M> {
    pub(crate) fn new(
        id: u64,
        mediator: Arc<MediatorInner<M>>,
        feed_capacity: usize,
        close_grace: Duration,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ContextInner {
            id,
            mediator,
            results_tx,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            feed: Feed::new(feed_capacity),
            close_grace,
        });
        Self {
            inner,
            results_rx,
            closed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Submit a message into this unit of work.
    ///
    /// Returns once the matching handler invocations have been spawned as
    /// tracked child tasks; handling continues asynchronously.
    pub async fn process(&self, message: M) -> Result<(), DispatchError> {
        self.inner.submit(Envelope::new(message))
    }

    /// Await the next event produced during this unit of work.
    ///
    /// Events arrive in production order. Returns `None` once the context is
    /// cancelled, so a caller waiting on an empty queue is released when the
    /// scope ends.
    pub async fn receive_result(&mut self) -> Option<Envelope<M>> {
        match self.results_rx.try_recv() {
            Ok(envelope) => return Some(envelope),
            Err(mpsc::error::TryRecvError::Disconnected) => return None,
            Err(mpsc::error::TryRecvError::Empty) => {}
        }
        tokio::select! {
            _ = self.inner.cancel.cancelled() => None,
            received = self.results_rx.recv() => received,
        }
    }

    /// Number of child tasks currently in flight.
    pub fn active_tasks(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Wait for the in-flight cascade to finish without cancelling anything.
    pub async fn join(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }

    /// End the unit of work.
    ///
    /// Stops the shared feed, waits up to the configured grace period for
    /// child tasks to finish on their own, then cancels the rest and waits
    /// for them to unwind. After `close` returns, no task spawned by this
    /// context is still running.
    pub async fn close(mut self) {
        self.closed = true;
        let inner = self.inner.clone();
        log::debug!(
            "context `{}` closing, {} tasks in flight",
            inner.id,
            inner.tracker.len()
        );
        inner.feed.stop();
        inner.tracker.close();
        if tokio::time::timeout(inner.close_grace, inner.tracker.wait())
            .await
            .is_err()
        {
            log::warn!(
                "context `{}` still has {} running tasks after {:?}, cancelling",
                inner.id,
                inner.tracker.len(),
                inner.close_grace
            );
        }
        inner.cancel.cancel();
        inner.tracker.wait().await;
        self.results_rx.close();
        log::debug!("context `{}` closed", inner.id);
    }
}

impl<M: Message> Drop for Context<M> {
    fn drop(&mut self) {
        if !self.closed {
            log::debug!(
                "context `{}` dropped without close, cancelling {} tasks",
                self.inner.id,
                self.inner.tracker.len()
            );
            self.inner.feed.stop();
            self.inner.cancel.cancel();
            self.inner.tracker.close();
        }
    }
}
