//! Handler (actor) contract.

use async_trait::async_trait;

use crate::message::{Envelope, Message};
use crate::scope::Scope;

/// An isolated unit reacting to the message kinds it declares.
///
/// Handlers own their state privately; the only way they communicate with
/// other handlers is by dispatching messages through [`Scope::dispatch`].
/// The mediator invokes `handle` concurrently for messages arriving in the
/// same context, so mutable state needs interior mutability.
///
/// A failure returned from `handle` is logged with the handler's name and the
/// message kind and contained there: sibling handlers and the context keep
/// going, and the handler stays attached for subsequent messages. There is no
/// automatic restart.
///
/// CPU-bound work must not run inline, it would stall every other handler on
/// the runtime. Delegate it through [`Scope::offload`].
#[async_trait]
pub trait Handler<M: Message>: Send + Sync + 'static {
    /// Stable name, used as the registration key and in log output.
    fn name(&self) -> &str;

    /// Message kinds this handler receives. Matching is by exact kind, no
    /// wildcard or hierarchy.
    fn supports(&self) -> &[M::Kind];

    /// Called once when the handler is attached.
    async fn on_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the mediator stops.
    async fn on_stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// React to a message. `scope` grants access to the owning context:
    /// dispatching follow-up messages, joining the shared feed, observing
    /// cancellation.
    async fn handle(&self, message: Envelope<M>, scope: Scope<M>) -> anyhow::Result<()>;
}
