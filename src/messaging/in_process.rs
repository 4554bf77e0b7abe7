//! Broadcast-channel message bus for services sharing one process.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::{Handlers, MessageBus};
use crate::domain::RoutingKey;
use crate::error::GatewayError;

/// A message as it travels through the channel.
#[derive(Debug, Clone)]
struct Envelope {
    routing_key: String,
    body: Vec<u8>,
}

/// In-process [`MessageBus`] backed by a [`tokio::sync::broadcast`] channel.
///
/// Every consumer sees every message and filters by its own handler table,
/// which matches a topic exchange with one queue per consumer. When the
/// ring buffer is full, the oldest messages are dropped for lagging
/// consumers.
#[derive(Debug, Clone)]
pub struct InProcessBus {
    sender: broadcast::Sender<Envelope>,
}

impl InProcessBus {
    /// Creates a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of running consume loops.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl MessageBus for InProcessBus {
    async fn publish(&self, key: &RoutingKey, payload: &[u8]) -> Result<(), GatewayError> {
        let envelope = Envelope {
            routing_key: key.to_string(),
            body: payload.to_vec(),
        };
        // No consumers is not a failure: the message is simply unrouted.
        let delivered = self.sender.send(envelope).unwrap_or(0);
        tracing::debug!(routing_key = %key, delivered, "event published");
        Ok(())
    }

    async fn consume(&self, handlers: Handlers) -> Result<JoinHandle<()>, GatewayError> {
        let mut rx = self.sender.subscribe();
        Ok(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => {
                        handlers
                            .dispatch(&envelope.routing_key, &envelope.body)
                            .await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "consumer lagged, messages dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::info!("in-process consume loop stopped");
        }))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::EntityKind;
    use crate::messaging::EventHandler;

    #[derive(Debug)]
    struct Forward {
        tx: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl EventHandler for Forward {
        async fn handle(&self, body: &[u8]) -> Result<(), GatewayError> {
            let _ = self.tx.send(body.to_vec());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "forward"
        }
    }

    #[tokio::test]
    async fn publish_without_consumers_succeeds() {
        let bus = InProcessBus::new(16);
        let result = bus
            .publish(&RoutingKey::deleted(EntityKind::Volume), b"{}")
            .await;
        assert!(result.is_ok());
        assert_eq!(bus.consumer_count(), 0);
    }

    #[tokio::test]
    async fn consumer_receives_only_bound_keys() {
        let bus = InProcessBus::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handlers = Handlers::new().register(
            RoutingKey::deleted(EntityKind::Volume),
            Arc::new(Forward { tx }),
        );
        let Ok(_task) = bus.consume(handlers).await else {
            panic!("consume failed");
        };
        assert_eq!(bus.consumer_count(), 1);

        let _ = bus
            .publish(&RoutingKey::created(EntityKind::Volume), b"created")
            .await;
        let _ = bus
            .publish(&RoutingKey::deleted(EntityKind::Volume), b"deleted")
            .await;

        let Some(body) = rx.recv().await else {
            panic!("expected a delivery");
        };
        assert_eq!(body, b"deleted".to_vec());
        assert!(rx.try_recv().is_err());
    }
}
