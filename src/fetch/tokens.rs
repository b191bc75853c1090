//! Token fetch triggers: composite summary fetch and the lazy sub-slot
//! fetches (pool list, chart, price series, transactions).

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::try_join4;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::client::{
    address_list, block_clause, blocks::blocks_for_timestamps, parse_num, EthPriceOracle,
    EthPrices, SubgraphClient,
};
use crate::metrics;
use crate::networks::NetworkInfo;
use crate::store::models::{PricePoint, PriceSeries, TokenChartEntry, TokenSummary};
use crate::store::{EntityStore, FetchAction, FetchTracker, SlotId, SlotKind};
use crate::utils::{interval_timestamps, normalize_address};

use super::transactions::{collect_transactions, token_transactions_query, EventRows};
use super::window_blocks;

/// Timestamps resolved per aliased point-in-time price query.
const PRICE_CHUNK_SIZE: usize = 50;

#[derive(Deserialize)]
struct TokensBulkData {
    tokens: Vec<TokenFields>,
}

#[derive(Deserialize)]
struct TokenFields {
    id: String,
    symbol: String,
    name: String,
    #[serde(rename = "derivedETH")]
    derived_eth: String,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
    #[serde(rename = "feesUSD")]
    fees_usd: String,
    #[serde(rename = "txCount")]
    tx_count: String,
    #[serde(rename = "totalValueLocked")]
    total_value_locked: String,
    #[serde(rename = "totalValueLockedUSD")]
    total_value_locked_usd: String,
}

#[derive(Deserialize)]
struct TokenDayDatasData {
    #[serde(rename = "tokenDayDatas")]
    token_day_datas: Vec<TokenDayDataFields>,
}

#[derive(Deserialize)]
struct TokenDayDataFields {
    date: i64,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
    #[serde(rename = "totalValueLockedUSD")]
    total_value_locked_usd: String,
}

#[derive(Deserialize)]
struct PoolsForTokenData {
    #[serde(rename = "asToken0")]
    as_token0: Vec<PoolIdFields>,
    #[serde(rename = "asToken1")]
    as_token1: Vec<PoolIdFields>,
}

#[derive(Deserialize)]
struct PoolIdFields {
    id: String,
}

/// Fetch-trigger logic for token records.
#[derive(Clone)]
pub struct TokenUpdater {
    store: Arc<EntityStore>,
    tracker: FetchTracker,
    client: SubgraphClient,
    oracle: Arc<EthPriceOracle>,
}

impl TokenUpdater {
    pub fn new(
        store: Arc<EntityStore>,
        tracker: FetchTracker,
        client: SubgraphClient,
        oracle: Arc<EthPriceOracle>,
    ) -> Self {
        Self {
            store,
            tracker,
            client,
            oracle,
        }
    }

    /// Slot phases for consumers deciding between loading and error states.
    pub fn tracker(&self) -> &FetchTracker {
        &self.tracker
    }

    /// Registers the addresses and fetches summaries for every slot that is
    /// absent and not already in flight or stalled.
    ///
    /// The summary is a composite: four time-windowed bulk queries joined
    /// with the block lookup and the oracle tuple. If any leg fails nothing
    /// is written and all claimed slots go to `Errored`; a missing oracle
    /// releases the claims instead, since the oracle is expected to resolve
    /// shortly.
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
        self.store.ensure_token_keys(network.id, &addresses);

        let mut to_fetch = Vec::new();
        let mut claimed = Vec::new();
        for address in &addresses {
            let populated = self
                .store
                .token(network.id, address)
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

        let Some(prices) = self.oracle.prices(&self.client, network).await else {
            for id in &claimed {
                self.tracker.reset(id);
            }
            return Ok(());
        };

        match self.fetch_summaries(network, &to_fetch, prices).await {
            Ok(summaries) => {
                self.store.update_token_summaries(network.id, summaries);
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
        prices: EthPrices,
    ) -> Result<Vec<TokenSummary>> {
        let blocks = window_blocks(&self.client, network).await?;

        let (current, one_day, two_day, week) = try_join4(
            self.tokens_bulk(network, addresses, None),
            self.tokens_bulk(network, addresses, Some(blocks.one_day)),
            self.tokens_bulk(network, addresses, Some(blocks.two_day)),
            self.tokens_bulk(network, addresses, Some(blocks.week)),
        )
        .await?;

        Ok(derive_summaries(
            addresses, current, one_day, two_day, week, prices,
        ))
    }

    async fn tokens_bulk(
        &self,
        network: &NetworkInfo,
        addresses: &[String],
        block: Option<u64>,
    ) -> Result<Vec<TokenFields>> {
        let query = format!(
            "query tokens {{\n  tokens({}where: {{ id_in: {} }}, \
             orderBy: totalValueLockedUSD, orderDirection: desc, subgraphError: allow) {{\n    \
             id symbol name derivedETH volumeUSD feesUSD txCount totalValueLocked totalValueLockedUSD\n  }}\n}}",
            block_clause(block),
            address_list(addresses),
        );
        let data: TokensBulkData = self.client.query(&network.data_endpoint, &query).await?;
        Ok(data.tokens)
    }

    /// Fetches the pool-address list for one token if absent.
    pub async fn ensure_pools_for_token(&self, network: &NetworkInfo, address: &str) -> Result<()> {
        let Some(address) = normalize_address(address) else {
            return Ok(());
        };
        self.store.ensure_token_keys(network.id, &[address.clone()]);

        let populated = self
            .store
            .token(network.id, &address)
            .is_some_and(|record| record.pool_addresses.is_some());
        let id = SlotId::new(network.id, address.clone(), SlotKind::PoolList);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        let query = format!(
            "query poolsForToken {{\n  \
             asToken0: pools(first: 200, orderBy: totalValueLockedUSD, orderDirection: desc, \
             where: {{ token0: \"{address}\" }}) {{ id }}\n  \
             asToken1: pools(first: 200, orderBy: totalValueLockedUSD, orderDirection: desc, \
             where: {{ token1: \"{address}\" }}) {{ id }}\n}}"
        );
        match self
            .client
            .query::<PoolsForTokenData>(&network.data_endpoint, &query)
            .await
        {
            Ok(data) => {
                let pool_addresses = data
                    .as_token0
                    .into_iter()
                    .chain(data.as_token1)
                    .map(|p| p.id)
                    .collect();
                self.store
                    .set_token_pool_addresses(network.id, &address, pool_addresses);
                self.tracker.complete(&id);
                Ok(())
            }
            Err(e) => {
                self.tracker.fail(&id);
                Err(e)
            }
        }
    }

    /// Fetches daily chart data for one token if absent.
    pub async fn ensure_chart(&self, network: &NetworkInfo, address: &str) -> Result<()> {
        let Some(address) = normalize_address(address) else {
            return Ok(());
        };
        self.store.ensure_token_keys(network.id, &[address.clone()]);

        let populated = self
            .store
            .token(network.id, &address)
            .is_some_and(|record| record.chart.is_some());
        let id = SlotId::new(network.id, address.clone(), SlotKind::Chart);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        let query = format!(
            "query tokenDayDatas {{\n  tokenDayDatas(first: 1000, orderBy: date, \
             orderDirection: asc, where: {{ token: \"{address}\" }}, subgraphError: allow) {{\n    \
             date volumeUSD totalValueLockedUSD\n  }}\n}}"
        );
        match self
            .client
            .query::<TokenDayDatasData>(&network.data_endpoint, &query)
            .await
        {
            Ok(data) => {
                let chart = data
                    .token_day_datas
                    .into_iter()
                    .map(|day| TokenChartEntry {
                        date: day.date,
                        volume_usd: parse_num(&day.volume_usd),
                        tvl_usd: parse_num(&day.total_value_locked_usd),
                    })
                    .collect();
                self.store.set_token_chart(network.id, &address, chart);
                self.tracker.complete(&id);
                Ok(())
            }
            Err(e) => {
                self.tracker.fail(&id);
                Err(e)
            }
        }
    }

    /// Fetches the price series at one sampling interval if absent or if the
    /// cached series does not reach back to `start`.
    ///
    /// Each sample is a point-in-time read of the token's derived price and
    /// the oracle price at the block nearest the sample timestamp.
    pub async fn ensure_price_series(
        &self,
        network: &NetworkInfo,
        address: &str,
        interval_secs: u64,
        start: DateTime<Utc>,
    ) -> Result<()> {
        let Some(address) = normalize_address(address) else {
            return Ok(());
        };
        self.store.ensure_token_keys(network.id, &[address.clone()]);

        let start_ts = start.timestamp();
        let populated = self
            .store
            .token(network.id, &address)
            .and_then(|record| record.price_series.get(&interval_secs).cloned())
            .is_some_and(|series| series.oldest_fetched_timestamp <= start_ts);
        let id = SlotId::new(
            network.id,
            address.clone(),
            SlotKind::Price { interval_secs },
        );
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        match self
            .fetch_price_points(network, &address, interval_secs, start)
            .await
        {
            Ok(points) => {
                self.store.set_token_price_series(
                    network.id,
                    &address,
                    interval_secs,
                    PriceSeries {
                        oldest_fetched_timestamp: start_ts,
                        points,
                    },
                );
                self.tracker.complete(&id);
                Ok(())
            }
            Err(e) => {
                self.tracker.fail(&id);
                Err(e)
            }
        }
    }

    async fn fetch_price_points(
        &self,
        network: &NetworkInfo,
        address: &str,
        interval_secs: u64,
        start: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let timestamps = interval_timestamps(start, interval_secs, Utc::now());
        let mut points = Vec::with_capacity(timestamps.len());

        // Chunked like any other batched lookup so one query never carries
        // hundreds of aliases.
        for chunk in timestamps.chunks(PRICE_CHUNK_SIZE) {
            let blocks =
                blocks_for_timestamps(&self.client, &network.blocks_endpoint, chunk).await?;

            let mut query = String::from("query tokenPrices {\n");
            let mut sampled = Vec::new();
            for (i, (ts, block)) in chunk.iter().zip(blocks.iter()).enumerate() {
                // A timestamp with no block (pre-genesis or indexing hole)
                // just drops that sample.
                let Some(block) = block else { continue };
                query.push_str(&format!(
                    "  p{i}: token(id: \"{address}\", block: {{number: {block}}}) {{ derivedETH }}\n"
                ));
                query.push_str(&format!(
                    "  e{i}: bundle(id: \"1\", block: {{number: {block}}}) {{ ethPriceUSD }}\n"
                ));
                sampled.push((i, *ts));
            }
            query.push('}');

            if sampled.is_empty() {
                continue;
            }

            let data = self.client.query_value(&network.data_endpoint, &query).await?;
            for (i, ts) in sampled {
                let derived = data
                    .get(format!("p{i}"))
                    .and_then(|t| t.get("derivedETH"))
                    .and_then(|v| v.as_str())
                    .map(parse_num);
                let oracle = data
                    .get(format!("e{i}"))
                    .and_then(|b| b.get("ethPriceUSD"))
                    .and_then(|v| v.as_str())
                    .map(parse_num);
                if let (Some(derived), Some(oracle)) = (derived, oracle) {
                    points.push(PricePoint {
                        timestamp: ts,
                        price_usd: metrics::price_usd(derived, oracle),
                    });
                }
            }
        }

        Ok(points)
    }

    /// Fetches the recent transaction list for one token if absent.
    pub async fn ensure_transactions(&self, network: &NetworkInfo, address: &str) -> Result<()> {
        let Some(address) = normalize_address(address) else {
            return Ok(());
        };
        self.store.ensure_token_keys(network.id, &[address.clone()]);

        let populated = self
            .store
            .token(network.id, &address)
            .is_some_and(|record| record.transactions.is_some());
        let id = SlotId::new(network.id, address.clone(), SlotKind::Transactions);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        let query = token_transactions_query(&address);
        match self
            .client
            .query::<EventRows>(&network.data_endpoint, &query)
            .await
        {
            Ok(rows) => {
                self.store
                    .set_token_transactions(network.id, &address, collect_transactions(rows));
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

fn index_by_id(rows: Vec<TokenFields>) -> FxHashMap<String, TokenFields> {
    rows.into_iter().map(|row| (row.id.clone(), row)).collect()
}

fn derive_summaries(
    addresses: &[String],
    current: Vec<TokenFields>,
    one_day: Vec<TokenFields>,
    two_day: Vec<TokenFields>,
    week: Vec<TokenFields>,
    prices: EthPrices,
) -> Vec<TokenSummary> {
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

            let volume_now = now.map(|t| parse_num(&t.volume_usd)).unwrap_or(0.0);
            let (volume_usd_24h, volume_usd_change) = match now {
                Some(_) => metrics::two_window_change(
                    volume_now,
                    day.map(|t| parse_num(&t.volume_usd)),
                    two.map(|t| parse_num(&t.volume_usd)),
                ),
                None => (0.0, 0.0),
            };
            let volume_usd_week = match now {
                Some(_) => metrics::week_delta(volume_now, old.map(|t| parse_num(&t.volume_usd))),
                None => 0.0,
            };

            let price_usd = now
                .map(|t| metrics::price_usd(parse_num(&t.derived_eth), prices.current))
                .unwrap_or(0.0);
            let price_one_day = day
                .map(|t| metrics::price_usd(parse_num(&t.derived_eth), prices.one_day))
                .unwrap_or(0.0);
            let price_week = old
                .map(|t| metrics::price_usd(parse_num(&t.derived_eth), prices.week))
                .unwrap_or(0.0);

            TokenSummary {
                exists: now.is_some(),
                address: address.clone(),
                symbol: now.map(|t| t.symbol.clone()).unwrap_or_default(),
                name: now.map(|t| t.name.clone()).unwrap_or_default(),
                volume_usd: volume_now,
                volume_usd_24h,
                volume_usd_change,
                volume_usd_week,
                tx_count_24h: now
                    .map(|t| {
                        metrics::window_delta(
                            parse_num(&t.tx_count),
                            day.map(|d| parse_num(&d.tx_count)),
                        )
                    })
                    .unwrap_or(0.0),
                fees_usd_24h: now
                    .map(|t| {
                        metrics::window_delta(
                            parse_num(&t.fees_usd),
                            day.map(|d| parse_num(&d.fees_usd)),
                        )
                    })
                    .unwrap_or(0.0),
                tvl_usd: now
                    .map(|t| parse_num(&t.total_value_locked_usd))
                    .unwrap_or(0.0),
                tvl_usd_change: metrics::percent_change(
                    now.map(|t| parse_num(&t.total_value_locked_usd)),
                    day.map(|t| parse_num(&t.total_value_locked_usd)),
                ),
                tvl_token: now.map(|t| parse_num(&t.total_value_locked)).unwrap_or(0.0),
                price_usd,
                price_usd_change: metrics::price_percent_change(price_usd, price_one_day),
                price_usd_change_week: metrics::price_percent_change(price_usd, price_week),
            }
        })
        .collect()
}
