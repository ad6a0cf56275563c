use tracing_subscriber::EnvFilter;

/// Initialize logging for the catalog services.
///
/// `RUST_LOG` directives take precedence when set; otherwise `default_level`
/// applies crate-wide. `try_init` keeps repeated calls (tests, embedded
/// wiring) from panicking.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
