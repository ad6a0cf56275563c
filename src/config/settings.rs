use serde::Deserialize;
use uuid::Uuid;

/// Top-level configuration settings for the application.
///
/// Includes the node identity and the broker parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub node: NodeSettings,
    pub broker: BrokerSettings,
}

/// Node identity settings. The id becomes the first segment of every
/// correlation chain this instance starts.
#[derive(Debug, Deserialize, Clone)]
pub struct NodeSettings {
    pub id: String,
}

/// Broker settings: the channel prefetch limit and the optional durability
/// journal path (no journal means transient queues).
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub prefetch: u16,
    pub journal: Option<String>,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub node: Option<PartialNodeSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

/// Partial node settings.
#[derive(Debug, Deserialize)]
pub struct PartialNodeSettings {
    pub id: Option<String>,
}

/// Partial broker settings.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub prefetch: Option<u16>,
    pub journal: Option<String>,
}

/// Provides default values for `Settings`.
///
/// A fresh node id is generated per process, matching the behavior of the
/// gateway and service binaries that never share one.
impl Default for Settings {
    fn default() -> Self {
        Self {
            node: NodeSettings {
                id: format!("node-{}", Uuid::new_v4()),
            },
            broker: BrokerSettings {
                prefetch: crate::messaging::DEFAULT_PREFETCH,
                journal: None,
            },
        }
    }
}
