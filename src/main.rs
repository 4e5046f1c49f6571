use tracing_subscriber::{fmt, EnvFilter};

use snow_market::{App, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first so RUST_LOG and SNOW_MARKET_CONFIG can live in .env
    if dotenv::dotenv().is_err() {
        eprintln!("No .env file found, assuming environment variables are set.");
    }

    // 1. Initialize logger
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,snow_market=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    tracing::info!("❄️ Snow Market starting...");

    // 2. Load config and seed the market
    let config = Config::load_default()?;
    let mut app = App::build(config).await?;

    // 3. Log the live feed at debug level as a stand-in observer
    let mut prices = app.feed().subscribe();
    let observer = tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match prices.recv().await {
                Ok(snapshot) => tracing::debug!(seq = snapshot.seq, prices = ?snapshot.prices, "snapshot"),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "observer lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    app.start();
    tracing::info!("✅ Snow Market is running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutting down...");

    let summary = app.stop().await;
    observer.abort();

    tracing::info!(
        ticks = summary.ticks,
        snapshots = summary.snapshots,
        trades = summary.trades_stored,
        "bye"
    );
    Ok(())
}
