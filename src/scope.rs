//! Capability handle passed into handlers.

use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::context::ContextInner;
use crate::error::DispatchError;
use crate::feed::Feed;
use crate::message::{Envelope, Message};

/// A handler's window into the context it is running under.
///
/// Cloneable and cheap; every clone refers to the same unit of work.
pub struct Scope<M: Message> {
    inner: Arc<ContextInner<M>>,
}

impl<M: Message> Clone for Scope<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Message> Scope<M> {
    pub(crate) fn new(inner: Arc<ContextInner<M>>) -> Self {
        Self { inner }
    }

    /// Identifier of the owning context.
    pub fn context_id(&self) -> u64 {
        self.inner.id()
    }

    /// Dispatch a follow-up message into the same context.
    ///
    /// Events emitted this way land in the context's result queue in
    /// production order; all messages are routed to the handlers registered
    /// for their kind, as tracked children of this context.
    pub async fn dispatch(&self, message: M) -> Result<(), DispatchError> {
        self.inner.submit(Envelope::new(message))
    }

    /// Join the context's shared feed.
    ///
    /// Producers call [`Feed::publish`] and finally [`Feed::stop`];
    /// consumers loop on [`crate::FeedSubscription::next`] until it returns
    /// `None`.
    pub fn join_feed(&self) -> Feed<M::Feed> {
        self.inner.feed().clone()
    }

    /// Token cancelled when the context closes. Long-running handlers should
    /// select on it at their suspension points.
    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel_token().clone()
    }

    /// Run CPU-bound work on the blocking pool, keeping the dispatch loop
    /// responsive.
    pub async fn offload<F, R>(&self, work: F) -> anyhow::Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
            .await
            .context("offloaded work panicked or was cancelled")
    }
}
