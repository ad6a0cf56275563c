//! # ReelMQ
//!
//! `reelmq` is the messaging backbone of a small movie-catalog system split
//! into an API gateway and a domain service. Writes travel as correlated,
//! durable messages through per-queue FIFO streams with explicit
//! acknowledgment; reads go over RPC and are out of scope here.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `broker`: the embedded queue broker — FIFO queues, acks, prefetch backpressure and the sled-backed durability journal.
//! - `messaging`: envelopes with correlation chains, standard queue/consumer/producer profiles, the broker session, producers and the consumer dispatcher.
//! - `catalog`: the thin movie-catalog layer exercising the core (DTOs, gateway service, service entrypoint, store).
//! - `config`: loading and merging of node/broker configuration.
//! - `utils`: the shared error type and logging setup.

pub mod broker;
pub mod catalog;
pub mod config;
pub mod messaging;
pub mod utils;
