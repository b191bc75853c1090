//! Pool fetch triggers: composite summary fetch plus chart and transaction
//! sub-slots. Pool TVL and volume come from the subgraph already in USD, so
//! no oracle leg is needed here.

use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join4;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::client::{address_list, block_clause, parse_num, SubgraphClient};
use crate::metrics;
use crate::networks::NetworkInfo;
use crate::store::models::{PoolChartEntry, PoolSummary, PoolTokenRef};
use crate::store::{EntityStore, FetchAction, FetchTracker, SlotId, SlotKind};
use crate::utils::normalize_address;

use super::transactions::{collect_transactions, pool_transactions_query, EventRows};
use super::window_blocks;

#[derive(Deserialize)]
struct PoolsBulkData {
    pools: Vec<PoolFields>,
}

#[derive(Deserialize)]
struct PoolTokenFields {
    id: String,
    symbol: String,
    name: String,
    decimals: String,
    #[serde(rename = "derivedETH")]
    derived_eth: String,
}

#[derive(Deserialize)]
struct PoolFields {
    id: String,
    #[serde(rename = "feeTier")]
    fee_tier: String,
    liquidity: String,
    #[serde(rename = "sqrtPrice")]
    sqrt_price: String,
    tick: Option<String>,
    token0: PoolTokenFields,
    token1: PoolTokenFields,
    #[serde(rename = "token0Price")]
    token0_price: String,
    #[serde(rename = "token1Price")]
    token1_price: String,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
    #[serde(rename = "totalValueLockedToken0")]
    total_value_locked_token0: String,
    #[serde(rename = "totalValueLockedToken1")]
    total_value_locked_token1: String,
    #[serde(rename = "totalValueLockedUSD")]
    total_value_locked_usd: String,
}

#[derive(Deserialize)]
struct PoolDayDatasData {
    #[serde(rename = "poolDayDatas")]
    pool_day_datas: Vec<PoolDayDataFields>,
}

#[derive(Deserialize)]
struct PoolDayDataFields {
    date: i64,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
    #[serde(rename = "tvlUSD")]
    tvl_usd: String,
    #[serde(rename = "feesUSD")]
    fees_usd: String,
}

/// Fetch-trigger logic for pool records.
#[derive(Clone)]
pub struct PoolUpdater {
    store: Arc<EntityStore>,
    tracker: FetchTracker,
    client: SubgraphClient,
}

impl PoolUpdater {
    pub fn new(store: Arc<EntityStore>, tracker: FetchTracker, client: SubgraphClient) -> Self {
        Self {
            store,
            tracker,
            client,
        }
    }

    pub fn tracker(&self) -> &FetchTracker {
        &self.tracker
    }

    /// Registers the addresses and fetches summaries for absent slots: four
    /// time-windowed bulk queries joined behind the block lookup. One
    /// failing leg fails the composite and writes nothing.
    pub async fn ensure_summaries(
        &self,
        network: &NetworkInfo,
        addresses: &[String],
    ) -> Result<()> {
        let addresses: Vec<String> = addresses
            .iter()
            .filter_map(|a| normalize_address(a))
            .collect();
        if addresses.is_empty() {
            return Ok(());
        }
        self.store.ensure_pool_keys(network.id, &addresses);

        let mut to_fetch = Vec::new();
        let mut claimed = Vec::new();
        for address in &addresses {
            let populated = self
                .store
                .pool(network.id, address)
                .is_some_and(|record| record.summary.is_some());
            let id = SlotId::new(network.id, address.clone(), SlotKind::Summary);
            if self.tracker.plan(&id, populated) == FetchAction::Fetch {
                to_fetch.push(address.clone());
                claimed.push(id);
            }
        }
        if to_fetch.is_empty() {
            return Ok(());
        }

        match self.fetch_summaries(network, &to_fetch).await {
            Ok(summaries) => {
                self.store.update_pool_summaries(network.id, summaries);
                for id in &claimed {
                    self.tracker.complete(id);
                }
                Ok(())
            }
            Err(e) => {
                for id in &claimed {
                    self.tracker.fail(id);
                }
                Err(e)
            }
        }
    }

    async fn fetch_summaries(
        &self,
        network: &NetworkInfo,
        addresses: &[String],
    ) -> Result<Vec<PoolSummary>> {
        let blocks = window_blocks(&self.client, network).await?;

        let (current, one_day, two_day, week) = try_join4(
            self.pools_bulk(network, addresses, None),
            self.pools_bulk(network, addresses, Some(blocks.one_day)),
            self.pools_bulk(network, addresses, Some(blocks.two_day)),
            self.pools_bulk(network, addresses, Some(blocks.week)),
        )
        .await?;

        Ok(derive_summaries(addresses, current, one_day, two_day, week))
    }

    async fn pools_bulk(
        &self,
        network: &NetworkInfo,
        addresses: &[String],
        block: Option<u64>,
    ) -> Result<Vec<PoolFields>> {
        let query = format!(
            "query pools {{\n  pools({}where: {{ id_in: {} }}, \
             orderBy: totalValueLockedUSD, orderDirection: desc, subgraphError: allow) {{\n    \
             id feeTier liquidity sqrtPrice tick \
             token0 {{ id symbol name decimals derivedETH }} \
             token1 {{ id symbol name decimals derivedETH }} \
             token0Price token1Price volumeUSD \
             totalValueLockedToken0 totalValueLockedToken1 totalValueLockedUSD\n  }}\n}}",
            block_clause(block),
            address_list(addresses),
        );
        let data: PoolsBulkData = self.client.query(&network.data_endpoint, &query).await?;
        Ok(data.pools)
    }

    /// Fetches daily chart data for one pool if absent.
    pub async fn ensure_chart(&self, network: &NetworkInfo, address: &str) -> Result<()> {
        let Some(address) = normalize_address(address) else {
            return Ok(());
        };
        self.store.ensure_pool_keys(network.id, &[address.clone()]);

        let populated = self
            .store
            .pool(network.id, &address)
            .is_some_and(|record| record.chart.is_some());
        let id = SlotId::new(network.id, address.clone(), SlotKind::Chart);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        let query = format!(
            "query poolDayDatas {{\n  poolDayDatas(first: 1000, orderBy: date, \
             orderDirection: asc, where: {{ pool: \"{address}\" }}, subgraphError: allow) {{\n    \
             date volumeUSD tvlUSD feesUSD\n  }}\n}}"
        );
        match self
            .client
            .query::<PoolDayDatasData>(&network.data_endpoint, &query)
            .await
        {
            Ok(data) => {
                let chart = data
                    .pool_day_datas
                    .into_iter()
                    .map(|day| PoolChartEntry {
                        date: day.date,
                        volume_usd: parse_num(&day.volume_usd),
                        tvl_usd: parse_num(&day.tvl_usd),
                        fees_usd: parse_num(&day.fees_usd),
                    })
                    .collect();
                self.store.set_pool_chart(network.id, &address, chart);
                self.tracker.complete(&id);
                Ok(())
            }
            Err(e) => {
                self.tracker.fail(&id);
                Err(e)
            }
        }
    }

    /// Fetches the recent transaction list for one pool if absent.
    pub async fn ensure_transactions(&self, network: &NetworkInfo, address: &str) -> Result<()> {
        let Some(address) = normalize_address(address) else {
            return Ok(());
        };
        self.store.ensure_pool_keys(network.id, &[address.clone()]);

        let populated = self
            .store
            .pool(network.id, &address)
            .is_some_and(|record| record.transactions.is_some());
        let id = SlotId::new(network.id, address.clone(), SlotKind::Transactions);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        let query = pool_transactions_query(&address);
        match self
            .client
            .query::<EventRows>(&network.data_endpoint, &query)
            .await
        {
            Ok(rows) => {
                self.store
                    .set_pool_transactions(network.id, &address, collect_transactions(rows));
                self.tracker.complete(&id);
                Ok(())
            }
            Err(e) => {
                self.tracker.fail(&id);
                Err(e)
            }
        }
    }
}

fn token_ref(fields: &PoolTokenFields) -> PoolTokenRef {
    PoolTokenRef {
        address: fields.id.clone(),
        symbol: fields.symbol.clone(),
        name: fields.name.clone(),
        decimals: fields.decimals.parse().unwrap_or(18),
        derived_eth: parse_num(&fields.derived_eth),
    }
}

fn index_by_id(rows: Vec<PoolFields>) -> FxHashMap<String, PoolFields> {
    rows.into_iter().map(|row| (row.id.clone(), row)).collect()
}

fn derive_summaries(
    addresses: &[String],
    current: Vec<PoolFields>,
    one_day: Vec<PoolFields>,
    two_day: Vec<PoolFields>,
    week: Vec<PoolFields>,
) -> Vec<PoolSummary> {
    let current = index_by_id(current);
    let one_day = index_by_id(one_day);
    let two_day = index_by_id(two_day);
    let week = index_by_id(week);

    addresses
        .iter()
        .map(|address| {
            let now = current.get(address);
            let day = one_day.get(address);
            let two = two_day.get(address);
            let old = week.get(address);

            let volume_now = now.map(|p| parse_num(&p.volume_usd)).unwrap_or(0.0);
            let (volume_usd_24h, volume_usd_change) = match now {
                Some(_) => metrics::two_window_change(
                    volume_now,
                    day.map(|p| parse_num(&p.volume_usd)),
                    two.map(|p| parse_num(&p.volume_usd)),
                ),
                None => (0.0, 0.0),
            };
            let volume_usd_week = match now {
                Some(_) => metrics::week_delta(volume_now, old.map(|p| parse_num(&p.volume_usd))),
                None => 0.0,
            };

            PoolSummary {
                exists: now.is_some(),
                address: address.clone(),
                fee_tier: now.map(|p| parse_num(&p.fee_tier) as u32).unwrap_or(0),
                token0: now.map(|p| token_ref(&p.token0)).unwrap_or_default(),
                token1: now.map(|p| token_ref(&p.token1)).unwrap_or_default(),
                liquidity: now.map(|p| parse_num(&p.liquidity)).unwrap_or(0.0),
                sqrt_price: now.map(|p| parse_num(&p.sqrt_price)).unwrap_or(0.0),
                tick: now
                    .and_then(|p| p.tick.as_deref())
                    .and_then(|t| t.parse().ok()),
                token0_price: now.map(|p| parse_num(&p.token0_price)).unwrap_or(0.0),
                token1_price: now.map(|p| parse_num(&p.token1_price)).unwrap_or(0.0),
                volume_usd: volume_now,
                volume_usd_24h,
                volume_usd_change,
                volume_usd_week,
                tvl_usd: now
                    .map(|p| parse_num(&p.total_value_locked_usd))
                    .unwrap_or(0.0),
                tvl_usd_change: metrics::percent_change(
                    now.map(|p| parse_num(&p.total_value_locked_usd)),
                    day.map(|p| parse_num(&p.total_value_locked_usd)),
                ),
                tvl_token0: now
                    .map(|p| parse_num(&p.total_value_locked_token0))
                    .unwrap_or(0.0),
                tvl_token1: now
                    .map(|p| parse_num(&p.total_value_locked_token1))
                    .unwrap_or(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{NetworkId, NetworkRegistry};
    use std::time::Duration;

    const POOL: &str = "0x00000000000000000000000000000000000000cc";

    fn pool_fields(volume: &str, tvl: &str) -> PoolFields {
        PoolFields {
            id: POOL.to_string(),
            fee_tier: "3000".to_string(),
            liquidity: "1000000".to_string(),
            sqrt_price: "79228162514264337593543950336".to_string(),
            tick: Some("-100".to_string()),
            token0: PoolTokenFields {
                id: "0xaa".to_string(),
                symbol: "AAA".to_string(),
                name: "Token A".to_string(),
                decimals: "18".to_string(),
                derived_eth: "0.5".to_string(),
            },
            token1: PoolTokenFields {
                id: "0xbb".to_string(),
                symbol: "BBB".to_string(),
                name: "Token B".to_string(),
                decimals: "6".to_string(),
                derived_eth: "0.0005".to_string(),
            },
            token0_price: "1000".to_string(),
            token1_price: "0.001".to_string(),
            volume_usd: volume.to_string(),
            total_value_locked_token0: "10".to_string(),
            total_value_locked_token1: "20000".to_string(),
            total_value_locked_usd: tvl.to_string(),
        }
    }

    #[test]
    fn derives_pool_summary_windows() {
        let summaries = derive_summaries(
            &[POOL.to_string()],
            vec![pool_fields("100", "1100")],
            vec![pool_fields("80", "1000")],
            vec![pool_fields("60", "900")],
            vec![pool_fields("40", "800")],
        );

        let summary = &summaries[0];
        assert!(summary.exists);
        assert_eq!(summary.fee_tier, 3000);
        assert_eq!(summary.tick, Some(-100));
        assert_eq!(summary.token1.decimals, 6);
        assert_eq!(summary.volume_usd, 100.0);
        assert_eq!(summary.volume_usd_24h, 20.0);
        assert_eq!(summary.volume_usd_change, 100.0);
        assert_eq!(summary.volume_usd_week, 60.0);
        assert!((summary.tvl_usd_change - 10.0).abs() < 1e-9);
        assert_eq!(summary.tvl_token0, 10.0);
    }

    #[test]
    fn missing_pool_yields_default_fields() {
        let summaries = derive_summaries(
            &[POOL.to_string()],
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let summary = &summaries[0];
        assert!(!summary.exists);
        assert_eq!(summary.tick, None);
        assert_eq!(summary.volume_usd, 0.0);
    }

    #[tokio::test]
    async fn failing_block_lookup_stalls_pool_summaries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/blocks")
            .with_status(502)
            .create_async()
            .await;
        let data_mock = server.mock("POST", "/data").expect(0).create_async().await;

        let store = Arc::new(EntityStore::new());
        let updater = PoolUpdater::new(
            store.clone(),
            FetchTracker::new(),
            SubgraphClient::new(Duration::from_secs(5)).unwrap(),
        );
        let mut network = NetworkRegistry::new().default_network().clone();
        network.data_endpoint = format!("{}/data", server.url());
        network.blocks_endpoint = format!("{}/blocks", server.url());

        let result = updater.ensure_summaries(&network, &[POOL.to_string()]).await;
        assert!(result.is_err());

        let id = SlotId::new(NetworkId::Ethereum, POOL, SlotKind::Summary);
        assert_eq!(
            updater.tracker().phase(&id),
            crate::store::SlotPhase::Errored
        );
        assert!(store.pool(NetworkId::Ethereum, POOL).unwrap().summary.is_none());
        data_mock.assert_async().await;
    }
}
