use chrono::{DateTime, Utc};

/// Protocol-wide aggregates for one network, derived at fetch time.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ProtocolSummary {
    pub volume_usd: f64,
    pub volume_usd_24h: f64,
    pub volume_usd_change: f64,
    pub fees_usd_24h: f64,
    pub fees_usd_change: f64,
    pub tvl_usd: f64,
    pub tvl_usd_change: f64,
    pub tx_count_24h: f64,
}

/// One daily protocol snapshot.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ProtocolChartEntry {
    pub date: i64,
    pub volume_usd: f64,
    pub tvl_usd: f64,
}

/// Singleton protocol record per network.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRecord {
    pub summary: Option<ProtocolSummary>,
    pub last_updated: Option<DateTime<Utc>>,
    pub chart: Option<Vec<ProtocolChartEntry>>,
}
