//! RabbitMQ implementation of the broker seam using lapin.

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tracing::{debug, info, warn};

use super::{Broker, Deliveries, Delivery, DeliveryTag, Session};
use crate::error::{Error, Result};

/// Opens lapin connections with default connection properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpBroker;

#[async_trait]
impl Broker for AmqpBroker {
    type Session = AmqpSession;

    async fn open(&self, url: &str, queue: &str) -> Result<AmqpSession> {
        debug!(url_length = url.len(), queue = queue, "rabbitmq_connecting");

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")
            .map_err(Error::Connection)?;

        let channel = connection
            .create_channel()
            .await
            .context("Failed to create channel")?;

        // Non-durable, matching the default a plain queue declaration gets
        channel
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .with_context(|| format!("Failed to declare queue {queue}"))?;

        debug!(queue = queue, "rabbitmq_queue_declared");

        Ok(AmqpSession {
            connection,
            channel,
        })
    }
}

/// An open lapin connection and channel.
pub struct AmqpSession {
    connection: Connection,
    channel: Channel,
}

#[async_trait]
impl Session for AmqpSession {
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_content_type("text/plain".into()),
            )
            .await
            .context("Failed to publish message")?
            .await
            .context("Failed to confirm publish")?;

        Ok(())
    }

    async fn consume(&self, queue: &str, consumer_tag: &str, prefetch: u16) -> Result<Deliveries> {
        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .context("Failed to set QoS")?;

        info!(prefetch_count = prefetch, "rabbitmq_qos_set");

        // no_ack stays false: every delivery waits for an explicit ack
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("Failed to start consumer")?;

        info!(queue = queue, consumer_tag = consumer_tag, "rabbitmq_consumer_started");

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|d| Delivery::new(d.delivery_tag, d.data))
                    .context("Consumer delivery failed")
                    .map_err(Error::from)
            })
            .boxed())
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<()> {
        self.channel
            .basic_ack(tag, BasicAckOptions::default())
            .await
            .with_context(|| format!("Failed to ack delivery {tag}"))?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        if let Err(e) = self.channel.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_channel_close_error");
        }

        self.connection
            .close(200, "Normal shutdown")
            .await
            .context("Failed to close connection")?;

        info!("rabbitmq_connection_closed");
        Ok(())
    }
}
