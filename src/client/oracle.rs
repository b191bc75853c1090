//! ETH price oracle backed by the subgraph bundle entity.
//!
//! Derived USD fields are computed as `derivedETH * bundle price at the same
//! window`, so every composite fetch needs the current/-24h/-48h/-week price
//! tuple. The tuple is cached per network with a TTL so bulk fetches for
//! many tokens share one lookup.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use log::warn;
use moka::future::Cache;

use crate::networks::{NetworkId, NetworkInfo};
use crate::utils::delta_timestamps;

use super::{blocks::blocks_for_timestamps, parse_num, SubgraphClient};

/// Oracle price readings at the standard comparison windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EthPrices {
    pub current: f64,
    pub one_day: f64,
    pub two_day: f64,
    pub week: f64,
}

/// TTL-cached per-network oracle.
pub struct EthPriceOracle {
    cache: Cache<NetworkId, EthPrices>,
}

impl EthPriceOracle {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(NetworkId::ALL.len() as u64)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Current oracle tuple for a network.
    ///
    /// Returns `None` when the oracle cannot be fetched right now. That is
    /// "still loading" for the caller, not an error: derived fields are
    /// simply not computed until a later attempt succeeds.
    pub async fn prices(
        &self,
        client: &SubgraphClient,
        network: &NetworkInfo,
    ) -> Option<EthPrices> {
        if let Some(prices) = self.cache.get(&network.id).await {
            return Some(prices);
        }

        match fetch_prices(client, network).await {
            Ok(prices) => {
                self.cache.insert(network.id, prices).await;
                Some(prices)
            }
            Err(e) => {
                warn!("Oracle prices unavailable for {}: {:#}", network.id, e);
                None
            }
        }
    }
}

async fn fetch_prices(client: &SubgraphClient, network: &NetworkInfo) -> Result<EthPrices> {
    let deltas = delta_timestamps(Utc::now());
    let blocks = blocks_for_timestamps(
        client,
        &network.blocks_endpoint,
        &[deltas.one_day, deltas.two_day, deltas.week],
    )
    .await?;

    let mut query = String::from("query prices {\n");
    query.push_str("  current: bundles(first: 1) { ethPriceUSD }\n");
    for (alias, block) in ["oneDay", "twoDay", "week"].iter().zip(blocks.iter()) {
        let block = block.with_context(|| format!("No block found for {alias} window"))?;
        query.push_str(&format!(
            "  {alias}: bundles(first: 1, block: {{number: {block}}}) {{ ethPriceUSD }}\n"
        ));
    }
    query.push('}');

    let data = client.query_value(&network.data_endpoint, &query).await?;

    let price_at = |alias: &str| -> f64 {
        data.get(alias)
            .and_then(|rows| rows.get(0))
            .and_then(|row| row.get("ethPriceUSD"))
            .and_then(|p| p.as_str())
            .map(parse_num)
            .unwrap_or(0.0)
    };

    Ok(EthPrices {
        current: price_at("current"),
        one_day: price_at("oneDay"),
        two_day: price_at("twoDay"),
        week: price_at("week"),
    })
}
