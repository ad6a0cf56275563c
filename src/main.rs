//! Catalog domain-service binary: consumes movie commands from the broker
//! and applies them to the movie store until interrupted.

use std::process;
use std::sync::Arc;

use tracing::{error, info};

use reelmq::broker::Broker;
use reelmq::catalog::{InMemoryStore, MessagingEntrypoint};
use reelmq::config::load_config;
use reelmq::messaging::Session;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    reelmq::utils::logging::init("info");

    let settings = load_config().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}");
        process::exit(1);
    });

    let broker = match settings.broker.journal.as_deref() {
        Some(path) => Broker::with_journal(path),
        None => Ok(Broker::new()),
    }
    .unwrap_or_else(|e| {
        error!("Failed to open broker journal: {e}");
        process::exit(1);
    });

    let mut session =
        Session::new(broker, settings.node.id.clone()).with_prefetch(settings.broker.prefetch);
    if let Err(e) = session.open() {
        error!("Failed to open broker session: {e}");
        process::exit(1);
    }

    let store = Arc::new(InMemoryStore::new());
    let entrypoint = MessagingEntrypoint::new(store);
    if let Err(e) = entrypoint.register(&mut session) {
        error!("Failed to register catalog consumers: {e}");
        process::exit(1);
    }
    session.listen();
    info!(node = %settings.node.id, "catalog service listening for movie commands");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for shutdown signal: {e}");
    }
    info!("Shutdown signal received. Exiting gracefully.");
    session.close();
}
