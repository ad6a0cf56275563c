mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, NodeSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the node and broker configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    Ok(Settings {
        node: NodeSettings {
            id: partial
                .node
                .as_ref()
                .and_then(|n| n.id.clone())
                .unwrap_or(default.node.id),
        },
        broker: BrokerSettings {
            prefetch: partial
                .broker
                .as_ref()
                .and_then(|b| b.prefetch)
                .unwrap_or(default.broker.prefetch),
            journal: partial
                .broker
                .as_ref()
                .and_then(|b| b.journal.clone())
                .or(default.broker.journal),
        },
    })
}
