use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

/// Summary fields of one token, derived at fetch time.
///
/// All monetary fields are already converted to USD using the oracle price
/// at the matching window. Absent inputs default to zero change so renderers
/// never see an undefined field.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TokenSummary {
    /// False when the subgraph did not return this token at the current
    /// block (the key was requested but the entity does not exist).
    pub exists: bool,
    pub address: String,
    pub symbol: String,
    pub name: String,

    /// Cumulative volume at the current block.
    pub volume_usd: f64,
    /// Absolute volume of the most recent 24h window.
    pub volume_usd_24h: f64,
    /// Percent change of the 24h window against the preceding one.
    pub volume_usd_change: f64,
    /// Week-over-window volume, an absolute USD delta.
    pub volume_usd_week: f64,
    pub tx_count_24h: f64,
    pub fees_usd_24h: f64,

    pub tvl_usd: f64,
    pub tvl_usd_change: f64,
    pub tvl_token: f64,

    pub price_usd: f64,
    pub price_usd_change: f64,
    pub price_usd_change_week: f64,
}

/// One day of chart data for a token.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TokenChartEntry {
    pub date: i64,
    pub volume_usd: f64,
    pub tvl_usd: f64,
}

/// One sampled price reading.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub price_usd: f64,
}

/// Price series at one sampling interval.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PriceSeries {
    /// Start of the window this series was fetched for; a consumer asking
    /// for an older start needs a refetch.
    pub oldest_fetched_timestamp: i64,
    pub points: Vec<PricePoint>,
}

/// Cached state of one token on one network.
///
/// Each field is an independently fetched slot; a record may hold summary
/// data while its chart slot is still absent. Price series are additionally
/// keyed by sampling interval so intervals never invalidate each other.
#[derive(Debug, Clone, Default)]
pub struct TokenRecord {
    pub summary: Option<TokenSummary>,
    pub last_updated: Option<DateTime<Utc>>,
    pub pool_addresses: Option<Vec<String>>,
    pub chart: Option<Vec<TokenChartEntry>>,
    pub price_series: FxHashMap<u64, PriceSeries>,
    pub transactions: Option<Vec<super::Transaction>>,
}
