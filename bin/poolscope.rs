use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{error, info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

use poolscope::client::EthPriceOracle;
use poolscope::fetch::{PoolUpdater, ProtocolUpdater, TokenUpdater};
use poolscope::networks::NetworkId;
use poolscope::prefs::Preferences;
use poolscope::refresh::{RefreshScheduler, Updaters};
use poolscope::store::FetchTracker;
use poolscope::{EntityStore, NetworkRegistry, Settings, SubgraphClient};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let registry = Arc::new(NetworkRegistry::from_settings(&settings));
    let store = Arc::new(EntityStore::new());
    let tracker = FetchTracker::new();

    let client = SubgraphClient::new(Duration::from_secs(settings.http.request_timeout_secs))
        .context("Failed to build the subgraph client")?;
    let oracle = Arc::new(EthPriceOracle::new(Duration::from_secs(
        settings.oracle.ttl_secs,
    )));

    let prefs = Preferences::load(&settings.preferences_path);
    if prefs.sync_banner_dismissed() {
        info!("Sync-lag banner is dismissed; lag warnings stay at debug level");
    }

    // Register watchlist keys so the first scheduler tick picks them up.
    for entry in &settings.watchlist {
        let Some(id) = NetworkId::from_slug(&entry.network) else {
            warn!("Ignoring watchlist entry for unknown network {}", entry.network);
            continue;
        };
        store.ensure_token_keys(id, &entry.tokens);
        store.ensure_pool_keys(id, &entry.pools);
        info!(
            "Watching {} tokens and {} pools on {}",
            entry.tokens.len(),
            entry.pools.len(),
            id
        );
    }

    let updaters = Updaters {
        tokens: TokenUpdater::new(
            store.clone(),
            tracker.clone(),
            client.clone(),
            oracle.clone(),
        ),
        pools: PoolUpdater::new(store.clone(), tracker.clone(), client.clone()),
        protocol: ProtocolUpdater::new(store.clone(), tracker.clone(), client.clone()),
    };

    let scheduler = RefreshScheduler::new(
        store.clone(),
        registry.clone(),
        updaters,
        client.clone(),
        settings.refresh.clone(),
        prefs.sync_banner_dismissed(),
    );

    let cancellation_token = CancellationToken::new();
    let scheduler_token = cancellation_token.child_token();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run(scheduler_token).await {
            error!("Refresh scheduler failed: {:#}", e);
        }
    });

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Poolscope running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    info!("Finishing all tasks...");
    cancellation_token.cancel();

    let _ = scheduler_handle.await;

    info!("Scheduler stopped");
    Ok(())
}
