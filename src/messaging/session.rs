use std::future::Future;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::broker::{Broker, Channel, Connection, QueueHandle};
use crate::messaging::config::{ConsumerOptions, ProducerOptions, QueueOptions};
use crate::messaging::envelope::{chain_correlation_id, Envelope, MessageContext};
use crate::messaging::producer::Producer;
use crate::utils::error::MessagingError;

/// Prefetch limit applied when the caller does not override it: at most this
/// many unacknowledged deliveries in flight per queue.
pub const DEFAULT_PREFETCH: u16 = 4;

/// Errors returned by consumer handlers. They are logged by the dispatcher
/// and never stop the consumption loop or requeue the message.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type ConsumerHandler =
    Box<dyn Fn(MessageContext, Value) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

struct RegisteredConsumer {
    stream: crate::broker::DeliveryStream,
    handler: ConsumerHandler,
}

/// Owner of the broker connection and its single channel.
///
/// One session per process instance. [`Session::open`] is a boot-time
/// dependency: callers treat a failure as fatal. Shutdown is global — closing
/// the session ends every consumption loop by closing their delivery
/// streams; there is no per-consumer cancellation.
pub struct Session {
    node_id: String,
    broker: Broker,
    prefetch: u16,
    connection: Option<Connection>,
    channel: Option<Channel>,
    consumers: Vec<RegisteredConsumer>,
}

impl Session {
    pub fn new(broker: Broker, node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            broker,
            prefetch: DEFAULT_PREFETCH,
            connection: None,
            channel: None,
            consumers: Vec::new(),
        }
    }

    pub fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Establishes the connection, opens the channel and applies the
    /// prefetch limit. No retries: a failure here means the process has no
    /// business starting.
    pub fn open(&mut self) -> Result<(), MessagingError> {
        let connection = self.broker.connect()?;
        let channel = connection.channel()?;
        channel.qos(self.prefetch)?;
        self.connection = Some(connection);
        self.channel = Some(channel);
        info!(node = %self.node_id, prefetch = self.prefetch, "broker session open");
        Ok(())
    }

    /// Releases the channel, then the connection. Tolerates either being
    /// unset; cleanup is best-effort and never propagates errors.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }

    fn channel(&self) -> Result<&Channel, MessagingError> {
        self.channel.as_ref().ok_or(MessagingError::ConnectionClosed)
    }

    /// Declares `queue` (idempotently) and returns it together with a bound
    /// [`Producer`]. Omitted options fall back to the standard profiles.
    pub fn create_producer(
        &self,
        queue: &str,
        queue_options: Option<QueueOptions>,
        producer_options: Option<ProducerOptions>,
    ) -> Result<(QueueHandle, Producer), MessagingError> {
        let channel = self.channel()?;
        let handle = channel.declare_queue(queue, &queue_options.unwrap_or_default())?;
        let producer = Producer::new(
            self.node_id.clone(),
            handle.name.clone(),
            channel.clone(),
            producer_options.unwrap_or_default(),
        );
        Ok((handle, producer))
    }

    /// Declares `queue`, opens its delivery stream and stores the pairing
    /// with `handler`. Consumption starts only when [`Session::listen`] is
    /// called. Omitted options fall back to the standard profiles.
    pub fn register_consumer<F, Fut>(
        &mut self,
        queue: &str,
        queue_options: Option<QueueOptions>,
        consumer_options: Option<ConsumerOptions>,
        handler: F,
    ) -> Result<(), MessagingError>
    where
        F: Fn(MessageContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let channel = self.channel()?;
        let handle = channel.declare_queue(queue, &queue_options.unwrap_or_default())?;
        let stream = channel.consume(&handle.name, &consumer_options.unwrap_or_default())?;
        self.consumers.push(RegisteredConsumer {
            stream,
            handler: Box::new(move |ctx, payload| Box::pin(handler(ctx, payload))),
        });
        Ok(())
    }

    /// Launches one consumption loop per registered pairing and returns
    /// immediately. Each loop runs until its delivery stream closes, which
    /// only happens when the session closes.
    pub fn listen(&mut self) {
        for consumer in self.consumers.drain(..) {
            info!(queue = %consumer.stream.queue(), "consumer loop starting");
            tokio::spawn(consume_loop(self.node_id.clone(), consumer));
        }
    }
}

/// Per-queue consumption loop: decode, rehydrate the correlation chain, run
/// the handler, acknowledge. Handler failures are terminal for that delivery
/// attempt — the message is acknowledged regardless — and every failure
/// class is logged instead of propagated.
async fn consume_loop(node_id: String, mut consumer: RegisteredConsumer) {
    while let Some(delivery) = consumer.stream.next().await {
        let queue = consumer.stream.queue();
        let envelope: Envelope = match serde_json::from_slice(delivery.body()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(queue = %queue, error = %e, "discarding undecodable delivery");
                if let Err(e) = delivery.reject() {
                    warn!(queue = %queue, error = %e, "failed to settle rejected delivery");
                }
                continue;
            }
        };
        debug!(
            queue = %queue,
            published_at = %delivery.published_at(),
            correlation = %envelope.metadata.correlation_id,
            "delivery received"
        );
        let correlation_id =
            chain_correlation_id(Some(&envelope.metadata.correlation_id), &node_id, queue);
        let ctx = MessageContext {
            correlation_id: Some(correlation_id),
            metadata: Some(envelope.metadata),
        };
        if let Err(e) = (consumer.handler)(ctx, envelope.data).await {
            error!(queue = %queue, error = %e, "consumer handler failed");
        }
        if let Err(e) = delivery.ack() {
            warn!(queue = %queue, error = %e, "failed to acknowledge delivery");
        }
    }
    info!(queue = %consumer.stream.queue(), "consumer loop closed");
}
