//! The `broker` module implements the embedded queue broker: named FIFO
//! queues with explicit acknowledgment, a per-channel prefetch limit for
//! backpressure, and an optional sled-backed journal for durable publishes.
//!
//! It stands in for an external broker in embedded deployments and in tests.
//! The `messaging` module talks to it exclusively through `Connection`,
//! `Channel` and `DeliveryStream`.

pub mod engine;
pub mod journal;
pub mod queue;

pub use engine::{Broker, Channel, Connection, QueueHandle};
pub use queue::{Delivery, DeliveryStream};
