//! Bar inventory client - daily reconciliation report
//!
//! Opens the configured bar-day, fetches its inventory, merges any pending
//! local edits and prints the reconciled rows and cash summary as JSON.

use bar_inventory_client::{Config, FileStore, HttpInventoryApi, InventorySession};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barinv=info,bar_inventory_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    let context = config.session.resolve()?;

    tracing::info!("Starting bar inventory client");
    tracing::info!("Environment: {}", config.environment);

    let api = HttpInventoryApi::new(&config.api)?;
    let store = FileStore::open(&config.storage.path)?;
    tracing::info!("Local store: {}", store.path().display());

    let mut session = InventorySession::new(api, context, store);
    if let Err(err) = session.load().await {
        tracing::error!(error = %err, "{}", err.user_message());
        return Err(err.into());
    }

    let view = session.view();
    if view.pending_edits > 0 {
        tracing::info!(
            "{} row{} unsaved",
            view.pending_edits,
            if view.pending_edits > 1 { "s" } else { "" }
        );
    }
    for item in &view.low_stock {
        tracing::warn!(
            product = %item.product_id,
            on_hand = item.on_hand,
            threshold = item.threshold,
            "Low stock: {}",
            item.name
        );
    }
    if view.summary.shortage {
        if let Some(variance) = view.summary.cash_variance {
            tracing::warn!("Cash shortage of {}", variance.abs());
        }
    }

    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
