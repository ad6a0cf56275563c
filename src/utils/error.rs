//! Crate-wide error type for the messaging layer.
//!
//! Publish-side failures are returned synchronously to the caller through
//! this type; consume-side failures are logged by the dispatcher and never
//! surface to external callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessagingError {
    /// The broker connection (or its single channel) is closed or was never
    /// opened. Establishment failures are boot failures: the binary logs
    /// this and exits rather than retrying.
    #[error("broker connection is closed")]
    ConnectionClosed,

    /// Publish or consume against a queue that was never declared.
    #[error("queue {0:?} has not been declared")]
    UnknownQueue(String),

    /// The embedded broker supports a single delivery stream per queue.
    #[error("queue {0:?} already has a registered consumer")]
    ConsumerAlreadyRegistered(String),

    /// Envelope (de)serialization failure.
    #[error("message body codec failure: {0}")]
    Codec(#[from] serde_json::Error),

    /// The durability journal could not be read or written.
    #[error("durability journal failure: {0}")]
    Journal(#[from] sled::Error),
}
