//! RabbitMQ implementation of [`MessageBus`] using `lapin`.

use std::fmt;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ConfirmSelectOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::task::JoinHandle;

use super::{Handlers, MessageBus};
use crate::domain::RoutingKey;
use crate::error::GatewayError;

/// AMQP 0-9-1 bus over a durable topic exchange.
///
/// One connection and one channel are opened at startup. The channel is in
/// confirm mode, so [`MessageBus::publish`] only returns once the broker has
/// acknowledged the message. There is no reconnection: a lost connection
/// surfaces as publish errors and ends the consume loop.
pub struct AmqpBus {
    connection: Connection,
    channel: Channel,
    exchange: String,
    service: &'static str,
}

impl AmqpBus {
    /// Connects to `url` and declares `exchange` as a durable topic exchange.
    ///
    /// `service` tags the consumer so broker dashboards show which domain
    /// owns the queue.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Broker`] if the broker is unreachable or
    /// rejects the declaration.
    pub async fn connect(
        url: &str,
        exchange: &str,
        service: &'static str,
    ) -> Result<Self, GatewayError> {
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(exchange, service, "broker connected");
        Ok(Self {
            connection,
            channel,
            exchange: exchange.to_string(),
            service,
        })
    }
}

impl fmt::Debug for AmqpBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmqpBus")
            .field("exchange", &self.exchange)
            .field("service", &self.service)
            .field("connected", &self.connection.status().connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageBus for AmqpBus {
    async fn publish(&self, key: &RoutingKey, payload: &[u8]) -> Result<(), GatewayError> {
        let routing_key = key.to_string();
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_message_id(uuid::Uuid::new_v4().to_string().into());

        let confirmation = self
            .channel
            .basic_publish(
                &self.exchange,
                &routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(GatewayError::Broker(format!(
                "broker rejected {routing_key}"
            )));
        }
        tracing::debug!(routing_key, "event published");
        Ok(())
    }

    async fn consume(&self, handlers: Handlers) -> Result<JoinHandle<()>, GatewayError> {
        let queue = self
            .channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        let queue_name = queue.name().as_str().to_string();

        for key in handlers.keys() {
            self.channel
                .queue_bind(
                    &queue_name,
                    &self.exchange,
                    &key.to_string(),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
            tracing::info!(queue = %queue_name, routing_key = %key, "queue bound");
        }

        let mut consumer = self
            .channel
            .basic_consume(
                &queue_name,
                &format!("{}-{}", self.service, uuid::Uuid::new_v4()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                let delivery = match delivery {
                    Ok(delivery) => delivery,
                    Err(e) => {
                        tracing::error!(error = %e, "consumer stream failed");
                        break;
                    }
                };

                handlers
                    .dispatch(delivery.routing_key.as_str(), &delivery.data)
                    .await;

                // Acked whatever the handler outcome; dispatch logs failures.
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::warn!(error = %e, "ack failed");
                }
            }
            tracing::info!(queue = %queue_name, "consume loop stopped");
        }))
    }
}
