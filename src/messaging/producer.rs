use serde::Serialize;
use tracing::debug;

use crate::broker::Channel;
use crate::messaging::config::ProducerOptions;
use crate::messaging::envelope::{chain_correlation_id, Envelope, MessageContext, Metadata};
use crate::utils::error::MessagingError;

/// A send function bound to one declared queue.
///
/// Created by [`Session::create_producer`](crate::messaging::Session::create_producer).
/// Cloneable and safe for concurrent use; the broker serializes channel
/// access internally. Publish failures are returned synchronously and the
/// producer keeps no local buffer, so the caller decides whether to retry.
#[derive(Clone, Debug)]
pub struct Producer {
    node_id: String,
    queue: String,
    channel: Channel,
    options: ProducerOptions,
}

impl Producer {
    pub(crate) fn new(
        node_id: String,
        queue: String,
        channel: Channel,
        options: ProducerOptions,
    ) -> Self {
        Self {
            node_id,
            queue,
            channel,
            options,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Wraps `payload` in an envelope and publishes it.
    ///
    /// If `ctx` carries a correlation id it becomes the parent of the new
    /// chain segment; otherwise a fresh chain starts here. Non-serializable
    /// payloads yield a [`MessagingError::Codec`], never a panic.
    pub fn send<T: Serialize>(
        &self,
        ctx: &MessageContext,
        payload: &T,
    ) -> Result<(), MessagingError> {
        let correlation_id =
            chain_correlation_id(ctx.correlation_id.as_deref(), &self.node_id, &self.queue);
        let envelope = Envelope {
            metadata: Metadata { correlation_id },
            data: serde_json::to_value(payload)?,
        };
        let body = serde_json::to_vec(&envelope)?;
        self.channel.publish(&self.queue, body, &self.options)?;
        debug!(queue = %self.queue, correlation = %envelope.metadata.correlation_id, "message published");
        Ok(())
    }
}
