//! In-memory entity cache, partitioned by network.
//!
//! The store is the single shared mutable resource of the crate. It holds
//! only "populated" or "absent" data; fetch-in-flight and error state live
//! in the slot tracker. Records are never deleted within a session, and
//! switching the active network just reads a different partition.

use std::sync::RwLock;

use chrono::Utc;
use rustc_hash::FxHashMap;

use crate::networks::NetworkId;
use crate::store::models::{
    PoolChartEntry, PoolRecord, PoolSummary, PriceSeries, ProtocolChartEntry, ProtocolRecord,
    ProtocolSummary, TokenChartEntry, TokenRecord, TokenSummary, Transaction,
};

#[derive(Default)]
struct Partitions {
    tokens: FxHashMap<NetworkId, FxHashMap<String, TokenRecord>>,
    pools: FxHashMap<NetworkId, FxHashMap<String, PoolRecord>>,
    protocol: FxHashMap<NetworkId, ProtocolRecord>,
}

/// Network-partitioned cache of token, pool, and protocol records.
///
/// Every mutation happens under one lock acquisition, so a reader never
/// observes a partially written record. There is no eviction and no TTL;
/// staleness is the fetch layer's concern.
#[derive(Default)]
pub struct EntityStore {
    inner: RwLock<Partitions>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- tokens ----

    /// Registers keys with empty records. Idempotent; existing records are
    /// left untouched.
    pub fn ensure_token_keys(&self, network: NetworkId, addresses: &[String]) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.tokens.entry(network).or_default();
        for address in addresses {
            partition.entry(address.clone()).or_default();
        }
    }

    /// Merges freshly fetched summaries into their records, overwriting only
    /// the summary fields and the last-updated stamp. Sub-slots survive.
    pub fn update_token_summaries(&self, network: NetworkId, summaries: Vec<TokenSummary>) {
        let now = Utc::now();
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.tokens.entry(network).or_default();
        for summary in summaries {
            let record = partition.entry(summary.address.clone()).or_default();
            record.summary = Some(summary);
            record.last_updated = Some(now);
        }
    }

    pub fn set_token_pool_addresses(
        &self,
        network: NetworkId,
        address: &str,
        pool_addresses: Vec<String>,
    ) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.tokens.entry(network).or_default();
        partition.entry(address.to_string()).or_default().pool_addresses = Some(pool_addresses);
    }

    pub fn set_token_chart(&self, network: NetworkId, address: &str, chart: Vec<TokenChartEntry>) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.tokens.entry(network).or_default();
        partition.entry(address.to_string()).or_default().chart = Some(chart);
    }

    /// Writes the series for one interval; other intervals are untouched.
    pub fn set_token_price_series(
        &self,
        network: NetworkId,
        address: &str,
        interval_secs: u64,
        series: PriceSeries,
    ) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.tokens.entry(network).or_default();
        partition
            .entry(address.to_string())
            .or_default()
            .price_series
            .insert(interval_secs, series);
    }

    pub fn set_token_transactions(
        &self,
        network: NetworkId,
        address: &str,
        transactions: Vec<Transaction>,
    ) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.tokens.entry(network).or_default();
        partition.entry(address.to_string()).or_default().transactions = Some(transactions);
    }

    /// Current record for a token, or `None` if the key was never registered.
    pub fn token(&self, network: NetworkId, address: &str) -> Option<TokenRecord> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.tokens.get(&network)?.get(address).cloned()
    }

    /// All registered token addresses in one partition.
    pub fn token_addresses(&self, network: NetworkId) -> Vec<String> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .tokens
            .get(&network)
            .map(|partition| partition.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ---- pools ----

    pub fn ensure_pool_keys(&self, network: NetworkId, addresses: &[String]) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.pools.entry(network).or_default();
        for address in addresses {
            partition.entry(address.clone()).or_default();
        }
    }

    pub fn update_pool_summaries(&self, network: NetworkId, summaries: Vec<PoolSummary>) {
        let now = Utc::now();
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.pools.entry(network).or_default();
        for summary in summaries {
            let record = partition.entry(summary.address.clone()).or_default();
            record.summary = Some(summary);
            record.last_updated = Some(now);
        }
    }

    pub fn set_pool_chart(&self, network: NetworkId, address: &str, chart: Vec<PoolChartEntry>) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.pools.entry(network).or_default();
        partition.entry(address.to_string()).or_default().chart = Some(chart);
    }

    pub fn set_pool_transactions(
        &self,
        network: NetworkId,
        address: &str,
        transactions: Vec<Transaction>,
    ) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let partition = inner.pools.entry(network).or_default();
        partition.entry(address.to_string()).or_default().transactions = Some(transactions);
    }

    pub fn pool(&self, network: NetworkId, address: &str) -> Option<PoolRecord> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.pools.get(&network)?.get(address).cloned()
    }

    pub fn pool_addresses(&self, network: NetworkId) -> Vec<String> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .pools
            .get(&network)
            .map(|partition| partition.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ---- protocol ----

    pub fn update_protocol_summary(&self, network: NetworkId, summary: ProtocolSummary) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let record = inner.protocol.entry(network).or_default();
        record.summary = Some(summary);
        record.last_updated = Some(Utc::now());
    }

    pub fn set_protocol_chart(&self, network: NetworkId, chart: Vec<ProtocolChartEntry>) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.protocol.entry(network).or_default().chart = Some(chart);
    }

    pub fn protocol(&self, network: NetworkId) -> Option<ProtocolRecord> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.protocol.get(&network).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::PricePoint;

    fn addr(tag: &str) -> String {
        format!("0x{tag:0>40}")
    }

    #[test]
    fn read_before_ensure_is_none_then_empty_record() {
        let store = EntityStore::new();
        let address = addr("aa");

        assert!(store.token(NetworkId::Ethereum, &address).is_none());

        store.ensure_token_keys(NetworkId::Ethereum, &[address.clone()]);
        let record = store.token(NetworkId::Ethereum, &address).unwrap();
        assert!(record.summary.is_none());
        assert!(record.chart.is_none());
        assert!(record.price_series.is_empty());
    }

    #[test]
    fn ensure_is_idempotent_and_preserves_data() {
        let store = EntityStore::new();
        let address = addr("aa");

        store.ensure_token_keys(NetworkId::Ethereum, &[address.clone()]);
        store.update_token_summaries(
            NetworkId::Ethereum,
            vec![TokenSummary {
                address: address.clone(),
                volume_usd: 42.0,
                ..Default::default()
            }],
        );
        store.ensure_token_keys(NetworkId::Ethereum, &[address.clone()]);

        let record = store.token(NetworkId::Ethereum, &address).unwrap();
        assert_eq!(record.summary.unwrap().volume_usd, 42.0);
        assert_eq!(store.token_addresses(NetworkId::Ethereum).len(), 1);
    }

    #[test]
    fn sub_slots_are_independent() {
        let store = EntityStore::new();
        let address = addr("aa");

        store.set_token_price_series(
            NetworkId::Ethereum,
            &address,
            3600,
            PriceSeries {
                oldest_fetched_timestamp: 1000,
                points: vec![PricePoint {
                    timestamp: 1000,
                    price_usd: 1.5,
                }],
            },
        );
        store.update_token_summaries(
            NetworkId::Ethereum,
            vec![TokenSummary {
                address: address.clone(),
                tvl_usd: 7.0,
                ..Default::default()
            }],
        );
        store.set_token_chart(
            NetworkId::Ethereum,
            &address,
            vec![TokenChartEntry {
                date: 1,
                volume_usd: 2.0,
                tvl_usd: 3.0,
            }],
        );

        let record = store.token(NetworkId::Ethereum, &address).unwrap();
        assert_eq!(record.summary.as_ref().unwrap().tvl_usd, 7.0);
        assert_eq!(record.chart.as_ref().unwrap().len(), 1);
        assert_eq!(record.price_series[&3600].points.len(), 1);
    }

    #[test]
    fn price_intervals_do_not_invalidate_each_other() {
        let store = EntityStore::new();
        let address = addr("aa");

        store.set_token_price_series(
            NetworkId::Ethereum,
            &address,
            3600,
            PriceSeries {
                oldest_fetched_timestamp: 1000,
                points: Vec::new(),
            },
        );
        store.set_token_price_series(
            NetworkId::Ethereum,
            &address,
            86_400,
            PriceSeries {
                oldest_fetched_timestamp: 2000,
                points: Vec::new(),
            },
        );

        let record = store.token(NetworkId::Ethereum, &address).unwrap();
        assert_eq!(record.price_series[&3600].oldest_fetched_timestamp, 1000);
        assert_eq!(record.price_series[&86_400].oldest_fetched_timestamp, 2000);
    }

    #[test]
    fn network_partitions_are_isolated() {
        let store = EntityStore::new();
        let address = addr("aa");

        store.ensure_token_keys(NetworkId::Arbitrum, &[address.clone()]);
        store.update_token_summaries(
            NetworkId::Ethereum,
            vec![TokenSummary {
                address: address.clone(),
                volume_usd: 100.0,
                ..Default::default()
            }],
        );

        let arbitrum = store.token(NetworkId::Arbitrum, &address).unwrap();
        assert!(arbitrum.summary.is_none());
        let ethereum = store.token(NetworkId::Ethereum, &address).unwrap();
        assert_eq!(ethereum.summary.unwrap().volume_usd, 100.0);
    }

    #[test]
    fn protocol_record_is_per_network_singleton() {
        let store = EntityStore::new();
        store.update_protocol_summary(
            NetworkId::Base,
            ProtocolSummary {
                tvl_usd: 5.0,
                ..Default::default()
            },
        );

        assert!(store.protocol(NetworkId::Ethereum).is_none());
        assert_eq!(
            store.protocol(NetworkId::Base).unwrap().summary.unwrap().tvl_usd,
            5.0
        );
    }
}
