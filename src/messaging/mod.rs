//! Event bus client: publish by routing key, dispatch by routing key.
//!
//! A [`MessageBus`] publishes raw payloads under a [`RoutingKey`] and runs a
//! background consume loop that hands every delivery to the [`Handlers`]
//! table. Delivery is at-least-once and unordered across keys, so handlers
//! must be idempotent.
//!
//! Two implementations exist:
//!
//! - [`AmqpBus`] talks to a RabbitMQ topic exchange through `lapin`.
//! - [`InProcessBus`] uses a `tokio::sync::broadcast` channel and connects
//!   services living in the same process.

pub mod amqp;
pub mod in_process;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::domain::RoutingKey;
use crate::error::GatewayError;

pub use amqp::AmqpBus;
pub use in_process::InProcessBus;

/// Callback invoked for every delivery carrying a registered routing key.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Processes one message body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be decoded or local state cannot
    /// be updated. The consume loop logs the error and moves on.
    async fn handle(&self, body: &[u8]) -> Result<(), GatewayError>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}

/// Dispatch table from exact routing key to handler.
#[derive(Clone, Default)]
pub struct Handlers {
    routes: HashMap<RoutingKey, Arc<dyn EventHandler>>,
}

impl Handlers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `key`, replacing any previous registration.
    #[must_use]
    pub fn register(mut self, key: RoutingKey, handler: Arc<dyn EventHandler>) -> Self {
        self.routes.insert(key, handler);
        self
    }

    /// Returns the routing keys that have a handler.
    pub fn keys(&self) -> impl Iterator<Item = &RoutingKey> {
        self.routes.keys()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Delivers `body` to the handler registered for `raw_key`.
    ///
    /// Returns `false` when the key is unknown and the message was dropped.
    /// Handler failures are logged, never propagated.
    pub async fn dispatch(&self, raw_key: &str, body: &[u8]) -> bool {
        let Some(handler) = raw_key
            .parse::<RoutingKey>()
            .ok()
            .and_then(|key| self.routes.get(&key))
        else {
            tracing::debug!(routing_key = raw_key, "no handler registered, dropping");
            return false;
        };

        match handler.handle(body).await {
            Ok(()) => {
                tracing::debug!(routing_key = raw_key, handler = handler.name(), "event handled");
            }
            Err(e) => {
                tracing::warn!(
                    routing_key = raw_key,
                    handler = handler.name(),
                    error = %e,
                    "event handler failed"
                );
            }
        }
        true
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.routes.keys().map(ToString::to_string).collect();
        f.debug_struct("Handlers").field("keys", &keys).finish()
    }
}

/// Topic-based message broker seen by a domain service.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes `payload` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Broker`] if the broker rejects the send.
    async fn publish(&self, key: &RoutingKey, payload: &[u8]) -> Result<(), GatewayError>;

    /// Binds the keys of `handlers` and starts the dispatch loop.
    ///
    /// The returned task runs until the process exits or the underlying
    /// channel closes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Broker`] if the subscription cannot be set up.
    async fn consume(&self, handlers: Handlers) -> Result<JoinHandle<()>, GatewayError>;
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::EntityKind;

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(&self, body: &[u8]) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if body.is_empty() {
                return Err(GatewayError::InvalidRequest("empty body".into()));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn dispatches_exact_key_only() {
        let handler = Arc::new(Counting::default());
        let handlers = Handlers::new().register(
            RoutingKey::deleted(EntityKind::Volume),
            Arc::clone(&handler) as Arc<dyn EventHandler>,
        );

        assert!(handlers.dispatch("PVC.DELETE", b"{}").await);
        assert!(!handlers.dispatch("PVC.CREATE", b"{}").await);
        assert!(!handlers.dispatch("NOTEBOOK.DELETE", b"{}").await);
        assert!(!handlers.dispatch("garbage", b"{}").await);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_errors_do_not_propagate() {
        let handler = Arc::new(Counting::default());
        let handlers = Handlers::new().register(
            RoutingKey::deleted(EntityKind::Notebook),
            Arc::clone(&handler) as Arc<dyn EventHandler>,
        );

        assert!(handlers.dispatch("NOTEBOOK.DELETE", b"").await);
        assert!(handlers.dispatch("NOTEBOOK.DELETE", b"{}").await);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn keys_lists_registrations() {
        let handlers = Handlers::new().register(
            RoutingKey::deleted(EntityKind::Volume),
            Arc::new(Counting::default()),
        );
        let keys: Vec<String> = handlers.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["PVC.DELETE".to_string()]);
        assert!(!handlers.is_empty());
    }
}
