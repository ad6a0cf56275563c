use std::collections::HashMap;

use serde_json::Value;

/// Broker-specific declaration arguments.
pub type Arguments = HashMap<String, Value>;

/// Declarative queue settings. [`QueueOptions::default`] is the standard
/// profile: durable, not auto-deleted, not exclusive, no-wait off, no extra
/// arguments.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub no_wait: bool,
    pub arguments: Option<Arguments>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            durable: true,
            auto_delete: false,
            exclusive: false,
            no_wait: false,
            arguments: None,
        }
    }
}

/// Consumer settings. The standard profile uses manual acknowledgment with
/// every flag off.
#[derive(Debug, Clone, Default)]
pub struct ConsumerOptions {
    pub auto_ack: bool,
    pub exclusive: bool,
    pub no_local: bool,
    pub no_wait: bool,
    pub arguments: Option<Arguments>,
}

/// Whether a published message survives a broker restart (on durable queues).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    Transient,
    #[default]
    Persistent,
}

/// Producer settings. The standard profile publishes persistently to the
/// default exchange with the mandatory/immediate flags off.
#[derive(Debug, Clone, Default)]
pub struct ProducerOptions {
    pub exchange: String,
    pub mandatory: bool,
    pub immediate: bool,
    pub delivery_mode: DeliveryMode,
}
