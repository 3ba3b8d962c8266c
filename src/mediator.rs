//! Message routing.
//!
//! The [`Mediator`] owns the handler registry and routes every submitted
//! message to the handlers registered for its exact kind. Handlers never
//! call one another directly; all communication goes through dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::config::MediatorConfig;
use crate::context::{Context, ContextInner};
use crate::error::{AttachError, DispatchError};
use crate::handler::Handler;
use crate::message::{Envelope, Message};
use crate::scope::Scope;

struct Registry<M: Message> {
    by_name: HashMap<String, Arc<dyn Handler<M>>>,
    by_kind: HashMap<M::Kind, Vec<String>>,
}

impl<M: Message> Registry<M> {
    fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_kind: HashMap::new(),
        }
    }
}

pub(crate) struct MediatorInner<M: Message> {
    registry: RwLock<Registry<M>>,
    unhandled: AtomicU64,
    next_context_id: AtomicU64,
    config: MediatorConfig,
}

impl<M: Message> MediatorInner<M> {
    /// Route an envelope to every handler registered for its kind, spawning
    /// one tracked child task of `context` per handler.
    ///
    /// The registry is only locked for the snapshot; a detach racing with
    /// this call either removes the handler before the snapshot or leaves a
    /// fan-out that was already committed.
    pub(crate) fn route(&self, envelope: Envelope<M>, context: &Arc<ContextInner<M>>) {
        let kind = envelope.kind();
        let handlers: Vec<Arc<dyn Handler<M>>> = {
            let registry = self.registry.read().unwrap();
            registry
                .by_kind
                .get(&kind)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|name| registry.by_name.get(name).cloned())
                        .collect()
                })
                .unwrap_or_default()
        };

        if handlers.is_empty() {
            self.unhandled.fetch_add(1, Ordering::Relaxed);
            log::error!("no handler attached for message kind {:?}", kind);
            return;
        }

        for handler in handlers {
            let envelope = envelope.clone();
            let scope = Scope::new(context.clone());
            let cancel = context.cancel_token().clone();
            context.tracker().spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        log::trace!(
                            "handler `{}` cancelled while handling {:?}",
                            handler.name(),
                            kind
                        );
                    }
                    result = handler.handle(envelope, scope) => {
                        if let Err(error) = result {
                            // Contained here: siblings and the context are
                            // unaffected, the handler stays attached.
                            log::error!(
                                "uncaught error from handler `{}` on {:?}: {:#}",
                                handler.name(),
                                kind,
                                error
                            );
                        }
                    }
                }
            });
        }
    }

    fn remove(&self, name: &str) -> bool {
        let mut registry = self.registry.write().unwrap();
        if registry.by_name.remove(name).is_some() {
            for names in registry.by_kind.values_mut() {
                names.retain(|registered| registered != name);
            }
            registry.by_kind.retain(|_, names| !names.is_empty());
            true
        } else {
            false
        }
    }
}

/// Central router matching messages to handlers.
///
/// Cloneable; every clone shares the same registry. All handler invocations
/// run as tracked tasks of the [`Context`] the message was submitted under.
pub struct Mediator<M: Message> {
    inner: Arc<MediatorInner<M>>,
}

impl<M: Message> Clone for Mediator<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: Message> Default for Mediator<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Mediator<M> {
    pub fn new() -> Self {
        Self::with_config(MediatorConfig::default())
    }

    pub fn with_config(config: MediatorConfig) -> Self {
        Self {
            inner: Arc::new(MediatorInner {
                registry: RwLock::new(Registry::new()),
                unhandled: AtomicU64::new(0),
                next_context_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Register a handler for the message kinds it declares and run its
    /// `on_start` hook.
    ///
    /// Attaching a handler whose name is already registered is an error. If
    /// `on_start` fails, the registration is rolled back.
    pub async fn attach(&self, handler: Arc<dyn Handler<M>>) -> Result<(), AttachError> {
        let name = handler.name().to_string();
        {
            let mut registry = self.inner.registry.write().unwrap();
            if registry.by_name.contains_key(&name) {
                return Err(AttachError::AlreadyAttached(name));
            }
            for kind in handler.supports() {
                registry.by_kind.entry(*kind).or_default().push(name.clone());
            }
            registry.by_name.insert(name.clone(), handler.clone());
        }
        if let Err(source) = handler.on_start().await {
            self.inner.remove(&name);
            return Err(AttachError::Start { name, source });
        }
        log::info!("handler `{}` attached", name);
        Ok(())
    }

    /// Remove a handler's registration. No-op if absent; returns whether a
    /// registration was removed.
    ///
    /// Messages dispatched after `detach` returns are never delivered to the
    /// handler. Invocations already spawned for earlier messages run out.
    pub fn detach(&self, name: &str) -> bool {
        let removed = self.inner.remove(name);
        if removed {
            log::info!("handler `{}` detached", name);
        }
        removed
    }

    pub fn is_attached(&self, name: &str) -> bool {
        self.inner.registry.read().unwrap().by_name.contains_key(name)
    }

    pub fn handler_count(&self) -> usize {
        self.inner.registry.read().unwrap().by_name.len()
    }

    /// How many submitted messages found no handler for their kind.
    pub fn unhandled_count(&self) -> u64 {
        self.inner.unhandled.load(Ordering::Relaxed)
    }

    /// Open a new unit of work.
    pub fn context(&self) -> Context<M> {
        let id = self.inner.next_context_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("context `{}` opened", id);
        Context::new(
            id,
            self.inner.clone(),
            self.inner.config.feed_capacity,
            self.inner.config.close_grace(),
        )
    }

    /// Handle one message in an ephemeral context: submit it, wait for the
    /// resulting cascade to finish, close the context.
    pub async fn dispatch(&self, message: M) -> Result<(), DispatchError> {
        let context = self.context();
        context.process(message).await?;
        context.join().await;
        context.close().await;
        Ok(())
    }

    /// Detach every handler, running each one's `on_stop` hook. Failures are
    /// logged, not propagated.
    pub async fn stop(&self) {
        let handlers: Vec<(String, Arc<dyn Handler<M>>)> = {
            let mut registry = self.inner.registry.write().unwrap();
            registry.by_kind.clear();
            registry.by_name.drain().collect()
        };
        for (name, handler) in handlers {
            if let Err(error) = handler.on_stop().await {
                log::error!("handler `{}` failed to stop cleanly: {:#}", name, error);
            }
        }
        log::info!("mediator stopped");
    }
}
