//! Error types for the mediator surface.
//!
//! Handler-internal failures are plain [`anyhow::Error`]s and are contained
//! at the routing boundary; only registration and submission problems surface
//! to callers as structured errors.

use thiserror::Error;

/// Error attaching a handler to the mediator.
#[derive(Debug, Error)]
pub enum AttachError {
    /// A handler with the same name is already registered. Re-attach is an
    /// error, not a no-op.
    #[error("handler `{0}` is already attached")]
    AlreadyAttached(String),

    /// The handler's `on_start` hook failed; the registration was rolled
    /// back.
    #[error("handler `{name}` failed to start")]
    Start {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Error submitting a message into a context.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The context has been closed or cancelled; no further messages are
    /// accepted.
    #[error("context `{0}` is closed")]
    ContextClosed(u64),
}
