//! Periodic reconciliation of tracked cache keys.
//!
//! The scheduler is the crate's render loop stand-in: on every tick it walks
//! the registered keys of every network partition and lets each updater's
//! reconcile-and-fetch logic decide what, if anything, to fetch. Populated,
//! in-flight, and stalled slots all come back as no-ops, so a tick over a
//! warm cache issues no network calls.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info, warn};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::client::{sync_status, SubgraphClient};
use crate::config::RefreshSettings;
use crate::fetch::{PoolUpdater, ProtocolUpdater, TokenUpdater};
use crate::networks::NetworkRegistry;
use crate::store::EntityStore;

/// The three per-entity-kind updaters, shared by the scheduler and any
/// direct consumer.
#[derive(Clone)]
pub struct Updaters {
    pub tokens: TokenUpdater,
    pub pools: PoolUpdater,
    pub protocol: ProtocolUpdater,
}

/// Scheduler for the background refresh and health-check jobs.
pub struct RefreshScheduler {
    store: Arc<EntityStore>,
    registry: Arc<NetworkRegistry>,
    updaters: Updaters,
    client: SubgraphClient,
    settings: Arc<RefreshSettings>,
    banner_dismissed: bool,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<EntityStore>,
        registry: Arc<NetworkRegistry>,
        updaters: Updaters,
        client: SubgraphClient,
        settings: RefreshSettings,
        banner_dismissed: bool,
    ) -> Self {
        Self {
            store,
            registry,
            updaters,
            client,
            settings: Arc::new(settings),
            banner_dismissed,
        }
    }

    /// Starts the scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        self.register_summaries_job(&scheduler).await?;
        self.register_health_job(&scheduler).await?;

        scheduler.start().await?;
        info!("Refresh scheduler started");

        cancellation_token.cancelled().await;
        info!("Refresh scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_summaries_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let updaters = self.updaters.clone();
        let interval = self.settings.summary_interval_secs;

        let job = Job::new_repeated_async(
            std::time::Duration::from_secs(interval),
            move |_uuid, _lock| {
                let store = store.clone();
                let registry = registry.clone();
                let updaters = updaters.clone();
                Box::pin(async move {
                    refresh_summaries(&store, &registry, &updaters).await;
                })
            },
        )?;

        scheduler.add(job).await?;
        info!("Registered summary refresh job (every {}s)", interval);
        Ok(())
    }

    async fn register_health_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let registry = self.registry.clone();
        let client = self.client.clone();
        let interval = self.settings.health_interval_secs;
        let threshold = self.settings.sync_lag_threshold_blocks;
        let dismissed = self.banner_dismissed;

        let job = Job::new_repeated_async(
            std::time::Duration::from_secs(interval),
            move |_uuid, _lock| {
                let registry = registry.clone();
                let client = client.clone();
                Box::pin(async move {
                    check_sync_health(&registry, &client, threshold, dismissed).await;
                })
            },
        )?;

        scheduler.add(job).await?;
        info!("Registered sync health job (every {}s)", interval);
        Ok(())
    }
}

/// One reconciliation pass over every partition with registered keys.
async fn refresh_summaries(
    store: &Arc<EntityStore>,
    registry: &NetworkRegistry,
    updaters: &Updaters,
) {
    for network in registry.iter() {
        let tokens = store.token_addresses(network.id);
        if !tokens.is_empty() {
            if let Err(e) = updaters.tokens.ensure_summaries(network, &tokens).await {
                error!("Token summary refresh failed for {}: {:#}", network.id, e);
            }
        }

        let pools = store.pool_addresses(network.id);
        if !pools.is_empty() {
            if let Err(e) = updaters.pools.ensure_summaries(network, &pools).await {
                error!("Pool summary refresh failed for {}: {:#}", network.id, e);
            }
        }

        if let Err(e) = updaters.protocol.ensure_summary(network).await {
            error!("Protocol refresh failed for {}: {:#}", network.id, e);
        }
        if let Err(e) = updaters.protocol.ensure_chart(network).await {
            error!("Protocol chart refresh failed for {}: {:#}", network.id, e);
        }
    }
}

/// Logs a degradation banner for any subgraph lagging the chain head. Purely
/// informational; fetch behavior is unchanged. A dismissed banner demotes the
/// message to debug so it stays out of the default log level.
async fn check_sync_health(
    registry: &NetworkRegistry,
    client: &SubgraphClient,
    threshold_blocks: u64,
    banner_dismissed: bool,
) {
    for network in registry.iter() {
        match sync_status(client, network).await {
            Ok(status) if status.is_lagging(threshold_blocks) => {
                if banner_dismissed {
                    debug!(
                        "Subgraph for {} lags the chain head by {} blocks",
                        network.id,
                        status.lag()
                    );
                } else {
                    warn!(
                        "Subgraph for {} lags the chain head by {} blocks ({} vs {})",
                        network.id,
                        status.lag(),
                        status.indexed_block,
                        status.head_block
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Sync health check failed for {}: {:#}", network.id, e);
            }
        }
    }
}
