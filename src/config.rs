//! Mediator configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_FEED_CAPACITY: usize = 256;
const DEFAULT_CLOSE_GRACE_MS: u64 = 250;

/// Tunables for a [`crate::Mediator`]. Deserializable so applications can
/// embed it in their own configuration; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Per-subscriber buffer of the context-scoped shared feed. Consumers
    /// that fall further behind than this skip the lost items.
    pub feed_capacity: usize,

    /// How long `Context::close` waits for in-flight handler tasks to finish
    /// before cancelling them.
    pub close_grace_ms: u64,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            feed_capacity: DEFAULT_FEED_CAPACITY,
            close_grace_ms: DEFAULT_CLOSE_GRACE_MS,
        }
    }
}

impl MediatorConfig {
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}
