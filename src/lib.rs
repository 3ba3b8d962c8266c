//! weft — typed in-process message mediator with context-scoped delivery.
//!
//! Applications model their messages as an enum of commands, queries and
//! events, attach isolated [`Handler`]s to a [`Mediator`], and drive each
//! cascade of handling inside a scoped [`Context`]: events produced anywhere
//! in the cascade are collected in the context's result queue, every handler
//! invocation runs as a tracked child task, and closing the context
//! guarantees none of them outlive the scope.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use weft::{Class, Envelope, Handler, Mediator, Message, Scope};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum AppMessage {
//!     Greet { who: String },
//!     Greeted { text: String },
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum AppKind {
//!     Greet,
//!     Greeted,
//! }
//!
//! impl Message for AppMessage {
//!     type Kind = AppKind;
//!     type Feed = ();
//!
//!     fn kind(&self) -> AppKind {
//!         match self {
//!             AppMessage::Greet { .. } => AppKind::Greet,
//!             AppMessage::Greeted { .. } => AppKind::Greeted,
//!         }
//!     }
//!
//!     fn class(&self) -> Class {
//!         match self {
//!             AppMessage::Greet { .. } => Class::Command,
//!             AppMessage::Greeted { .. } => Class::Event,
//!         }
//!     }
//! }
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Handler<AppMessage> for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn supports(&self) -> &[AppKind] {
//!         &[AppKind::Greet]
//!     }
//!
//!     async fn handle(
//!         &self,
//!         message: Envelope<AppMessage>,
//!         scope: Scope<AppMessage>,
//!     ) -> anyhow::Result<()> {
//!         if let AppMessage::Greet { who } = message.body() {
//!             scope
//!                 .dispatch(AppMessage::Greeted {
//!                     text: format!("hello, {who}"),
//!                 })
//!                 .await?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mediator: Mediator<AppMessage> = Mediator::new();
//! mediator.attach(Arc::new(Greeter)).await?;
//!
//! let mut context = mediator.context();
//! context
//!     .process(AppMessage::Greet { who: "world".to_string() })
//!     .await?;
//! let greeted = context.receive_result().await;
//! assert!(greeted.is_some());
//! context.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod handler;
pub mod mediator;
pub mod message;
pub mod scope;

pub use config::MediatorConfig;
pub use context::Context;
pub use error::{AttachError, DispatchError};
pub use feed::{Feed, FeedSubscription};
pub use handler::Handler;
pub use mediator::Mediator;
pub use message::{Class, Envelope, Message};
pub use scope::Scope;
