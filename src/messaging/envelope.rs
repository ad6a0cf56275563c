use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Per-message metadata carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Append-only causal chain: one `node[queue-token]` segment per hop,
    /// joined by `-`. A message's correlation id always has its ancestor's
    /// id as a prefix.
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

/// Wire shape of every message: `{"metadata":{"correlationId":..},"data":..}`.
///
/// `data` is deliberately generic; consumers receive the decoded
/// [`Value`] and apply their own schema per queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub metadata: Metadata,
    pub data: Value,
}

/// Builds the next correlation id in a chain.
///
/// With no parent this starts a fresh chain (`node[queue-token]`); with a
/// parent it appends a segment (`parent-node[queue-token]`), so the parent id
/// is preserved verbatim as a prefix.
pub fn chain_correlation_id(parent: Option<&str>, node_id: &str, queue: &str) -> String {
    let token = Uuid::new_v4();
    match parent {
        Some(parent) => format!("{parent}-{node_id}[{queue}-{token}]"),
        None => format!("{node_id}[{queue}-{token}]"),
    }
}

/// Request-scoped values threaded through producers and handlers.
///
/// Producers read an optional inbound correlation id from here; the
/// dispatcher rehydrates a fresh one (plus the inbound metadata) before a
/// handler runs, so handlers never manage correlation themselves.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    pub correlation_id: Option<String>,
    pub metadata: Option<Metadata>,
}

impl MessageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            metadata: None,
        }
    }
}
