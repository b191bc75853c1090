//! Protocol-aggregate fetch triggers: the per-network singleton summary and
//! the daily snapshot series.

use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join3;
use serde::Deserialize;

use crate::client::{block_clause, parse_num, SubgraphClient};
use crate::metrics;
use crate::networks::NetworkInfo;
use crate::store::models::{ProtocolChartEntry, ProtocolSummary};
use crate::store::{EntityStore, FetchAction, FetchTracker, SlotId, SlotKind};

use super::window_blocks;

#[derive(Deserialize)]
struct FactoriesData {
    factories: Vec<FactoryFields>,
}

#[derive(Deserialize)]
struct FactoryFields {
    #[serde(rename = "txCount")]
    tx_count: String,
    #[serde(rename = "totalVolumeUSD")]
    total_volume_usd: String,
    #[serde(rename = "totalFeesUSD")]
    total_fees_usd: String,
    #[serde(rename = "totalValueLockedUSD")]
    total_value_locked_usd: String,
}

#[derive(Deserialize)]
struct DayDatasData {
    #[serde(rename = "uniswapDayDatas")]
    day_datas: Vec<DayDataFields>,
}

#[derive(Deserialize)]
struct DayDataFields {
    date: i64,
    #[serde(rename = "volumeUSD")]
    volume_usd: String,
    #[serde(rename = "tvlUSD")]
    tvl_usd: String,
}

/// Fetch-trigger logic for the protocol aggregate record.
#[derive(Clone)]
pub struct ProtocolUpdater {
    store: Arc<EntityStore>,
    tracker: FetchTracker,
    client: SubgraphClient,
}

impl ProtocolUpdater {
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

    /// Fetches the global summary if absent: the factory aggregate at the
    /// four window blocks, joined; one failing leg writes nothing.
    pub async fn ensure_summary(&self, network: &NetworkInfo) -> Result<()> {
        let populated = self
            .store
            .protocol(network.id)
            .is_some_and(|record| record.summary.is_some());
        let id = SlotId::protocol(network.id, SlotKind::Summary);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        match self.fetch_summary(network).await {
            Ok(summary) => {
                self.store.update_protocol_summary(network.id, summary);
                self.tracker.complete(&id);
                Ok(())
            }
            Err(e) => {
                self.tracker.fail(&id);
                Err(e)
            }
        }
    }

    async fn fetch_summary(&self, network: &NetworkInfo) -> Result<ProtocolSummary> {
        let blocks = window_blocks(&self.client, network).await?;

        let (current, one_day, two_day) = try_join3(
            self.factory(network, None),
            self.factory(network, Some(blocks.one_day)),
            self.factory(network, Some(blocks.two_day)),
        )
        .await?;

        Ok(derive_summary(current, one_day, two_day))
    }

    async fn factory(
        &self,
        network: &NetworkInfo,
        block: Option<u64>,
    ) -> Result<Option<FactoryFields>> {
        let query = format!(
            "query protocol {{\n  factories({}first: 1, subgraphError: allow) {{\n    \
             txCount totalVolumeUSD totalFeesUSD totalValueLockedUSD\n  }}\n}}",
            block_clause(block),
        );
        let data: FactoriesData = self.client.query(&network.data_endpoint, &query).await?;
        Ok(data.factories.into_iter().next())
    }

    /// Fetches the daily protocol snapshot series if absent.
    pub async fn ensure_chart(&self, network: &NetworkInfo) -> Result<()> {
        let populated = self
            .store
            .protocol(network.id)
            .is_some_and(|record| record.chart.is_some());
        let id = SlotId::protocol(network.id, SlotKind::Chart);
        if self.tracker.plan(&id, populated) != FetchAction::Fetch {
            return Ok(());
        }

        let query = "query dayDatas {\n  uniswapDayDatas(first: 1000, orderBy: date, \
                     orderDirection: asc, subgraphError: allow) {\n    \
                     date volumeUSD tvlUSD\n  }\n}";
        match self
            .client
            .query::<DayDatasData>(&network.data_endpoint, query)
            .await
        {
            Ok(data) => {
                let chart = data
                    .day_datas
                    .into_iter()
                    .map(|day| ProtocolChartEntry {
                        date: day.date,
                        volume_usd: parse_num(&day.volume_usd),
                        tvl_usd: parse_num(&day.tvl_usd),
                    })
                    .collect();
                self.store.set_protocol_chart(network.id, chart);
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

fn derive_summary(
    current: Option<FactoryFields>,
    one_day: Option<FactoryFields>,
    two_day: Option<FactoryFields>,
) -> ProtocolSummary {
    let now = current.as_ref();
    let day = one_day.as_ref();
    let two = two_day.as_ref();

    let volume_now = now.map(|f| parse_num(&f.total_volume_usd)).unwrap_or(0.0);
    let (volume_usd_24h, volume_usd_change) = match now {
        Some(_) => metrics::two_window_change(
            volume_now,
            day.map(|f| parse_num(&f.total_volume_usd)),
            two.map(|f| parse_num(&f.total_volume_usd)),
        ),
        None => (0.0, 0.0),
    };

    let fees_now = now.map(|f| parse_num(&f.total_fees_usd)).unwrap_or(0.0);
    let (fees_usd_24h, fees_usd_change) = match now {
        Some(_) => metrics::two_window_change(
            fees_now,
            day.map(|f| parse_num(&f.total_fees_usd)),
            two.map(|f| parse_num(&f.total_fees_usd)),
        ),
        None => (0.0, 0.0),
    };

    ProtocolSummary {
        volume_usd: volume_now,
        volume_usd_24h,
        volume_usd_change,
        fees_usd_24h,
        fees_usd_change,
        tvl_usd: now
            .map(|f| parse_num(&f.total_value_locked_usd))
            .unwrap_or(0.0),
        tvl_usd_change: metrics::percent_change(
            now.map(|f| parse_num(&f.total_value_locked_usd)),
            day.map(|f| parse_num(&f.total_value_locked_usd)),
        ),
        tx_count_24h: now
            .map(|f| {
                metrics::window_delta(
                    parse_num(&f.tx_count),
                    day.map(|d| parse_num(&d.tx_count)),
                )
            })
            .unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(volume: &str, fees: &str, tvl: &str, tx: &str) -> FactoryFields {
        FactoryFields {
            tx_count: tx.to_string(),
            total_volume_usd: volume.to_string(),
            total_fees_usd: fees.to_string(),
            total_value_locked_usd: tvl.to_string(),
        }
    }

    #[test]
    fn derives_protocol_windows() {
        let summary = derive_summary(
            Some(factory("100", "10", "1100", "500")),
            Some(factory("80", "8", "1000", "450")),
            Some(factory("60", "6", "900", "400")),
        );

        assert_eq!(summary.volume_usd, 100.0);
        assert_eq!(summary.volume_usd_24h, 20.0);
        assert_eq!(summary.volume_usd_change, 100.0);
        assert_eq!(summary.fees_usd_24h, 2.0);
        assert_eq!(summary.fees_usd_change, 100.0);
        assert!((summary.tvl_usd_change - 10.0).abs() < 1e-9);
        assert_eq!(summary.tx_count_24h, 50.0);
    }

    #[test]
    fn missing_factory_yields_defaults() {
        let summary = derive_summary(None, None, None);
        assert_eq!(summary, ProtocolSummary::default());
    }
}
