#![cfg(not(tarpaulin_include))]

use fluxion::{app, config::Config};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "fluxion=debug,tower_http=info";

/// Main entry point for the web application
///
/// Initializes logging, loads the configuration from the environment (and a
/// `.env` file if present), then runs the server until Ctrl-C.
///
/// # Returns
/// * `anyhow::Result<()>` - Error if configuration or startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        "Configuration loaded - server will bind to {}",
        config.bind_address()
    );

    app::run(config).await
}
