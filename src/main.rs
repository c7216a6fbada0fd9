//! FOIAcquire - FOIA document acquisition and research system.
//!
//! A tool for acquiring, storing, and researching Freedom of Information Act
//! documents from various government sources.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "foiacquire=info"
    } else {
        "foiacquire=warn"
    };

    let (file_layer, _guard) = cli::rotating_file_layer();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    // Keep the non-blocking writer guard alive for the process lifetime.
    let result = cli::run().await;
    std::mem::forget(_guard);
    result
}
