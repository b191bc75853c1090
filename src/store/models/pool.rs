use chrono::{DateTime, Utc};

/// Denormalized reference to one side of a pool's token pair.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PoolTokenRef {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    /// Protocol-native derived price, used for USD conversion.
    pub derived_eth: f64,
}

/// Summary fields of one pool, derived at fetch time.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PoolSummary {
    pub exists: bool,
    pub address: String,
    pub fee_tier: u32,
    pub token0: PoolTokenRef,
    pub token1: PoolTokenRef,

    // Current in-range state, kept for liquidity-distribution charts
    pub liquidity: f64,
    pub sqrt_price: f64,
    pub tick: Option<i32>,
    pub token0_price: f64,
    pub token1_price: f64,

    pub volume_usd: f64,
    pub volume_usd_24h: f64,
    pub volume_usd_change: f64,
    pub volume_usd_week: f64,

    pub tvl_usd: f64,
    pub tvl_usd_change: f64,
    pub tvl_token0: f64,
    pub tvl_token1: f64,
}

/// One day of chart data for a pool.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PoolChartEntry {
    pub date: i64,
    pub volume_usd: f64,
    pub tvl_usd: f64,
    pub fees_usd: f64,
}

/// Cached state of one pool on one network. Slots are fetched independently.
#[derive(Debug, Clone, Default)]
pub struct PoolRecord {
    pub summary: Option<PoolSummary>,
    pub last_updated: Option<DateTime<Utc>>,
    pub chart: Option<Vec<PoolChartEntry>>,
    pub transactions: Option<Vec<super::Transaction>>,
}
