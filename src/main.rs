//! planscout - eSIM data plan price tracker.
//!
//! Scrapes mobile data plan listings from eSIM provider storefronts and
//! keeps a local snapshot database for price comparison.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if planscout::cli::is_verbose() {
        "planscout=info"
    } else {
        "planscout=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    planscout::cli::run().await
}
