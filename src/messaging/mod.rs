//! The `messaging` module is the asynchronous write path shared by the API
//! gateway and the catalog service.
//!
//! It wraps every payload in an [`Envelope`] carrying an append-only
//! correlation chain, declares queues with the standard durability profile,
//! and drives one concurrent consumption loop per registered queue with
//! explicit acknowledgment. Reads go over RPC elsewhere; only writes flow
//! through here.

pub mod config;
pub mod envelope;
pub mod producer;
pub mod session;

pub use config::{ConsumerOptions, DeliveryMode, ProducerOptions, QueueOptions};
pub use envelope::{Envelope, MessageContext, Metadata};
pub use producer::Producer;
pub use session::{HandlerError, Session, DEFAULT_PREFETCH};

#[cfg(test)]
mod tests;
