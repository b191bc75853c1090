use config::{Config, ConfigError, File};
use serde::Deserialize;

/// HTTP transport configuration for subgraph queries.
///
/// The request timeout is the only bound on an in-flight fetch; a slot stays
/// in `Fetching` until the client either answers or times out.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Background refresh configuration.
///
/// Controls how often the scheduler reconciles tracked keys and how often the
/// subgraph sync-lag health check runs.
#[derive(Debug, Deserialize, Clone)]
pub struct RefreshSettings {
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
    /// Blocks of lag between subgraph head and chain head before the
    /// degradation banner is logged.
    #[serde(default = "default_sync_lag_threshold_blocks")]
    pub sync_lag_threshold_blocks: u64,
}

fn default_summary_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_health_interval_secs() -> u64 {
    120
}

fn default_sync_lag_threshold_blocks() -> u64 {
    50
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            summary_interval_secs: default_summary_interval_secs(),
            health_interval_secs: default_health_interval_secs(),
            sync_lag_threshold_blocks: default_sync_lag_threshold_blocks(),
        }
    }
}

/// ETH price oracle cache configuration.
///
/// Bundle prices are cached per network for the TTL so composite fetches for
/// many tokens share one oracle lookup.
#[derive(Debug, Deserialize, Clone)]
pub struct OracleSettings {
    #[serde(default = "default_oracle_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_oracle_ttl_secs() -> u64 {
    60
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_oracle_ttl_secs(),
        }
    }
}

/// Addresses the daemon keeps warm for one network.
#[derive(Debug, Deserialize, Clone)]
pub struct WatchlistEntry {
    /// Network slug ("ethereum", "arbitrum", ...)
    pub network: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub pools: Vec<String>,
}

/// Per-network endpoint override, mainly for self-hosted subgraphs and tests.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointOverride {
    pub network: String,
    #[serde(default)]
    pub data_endpoint: Option<String>,
    #[serde(default)]
    pub blocks_endpoint: Option<String>,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub watchlist: Vec<WatchlistEntry>,
    #[serde(default)]
    pub endpoints: Vec<EndpointOverride>,
    /// Path of the JSON file holding dismissed-banner state.
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
}

fn default_preferences_path() -> String {
    "preferences.json".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            refresh: RefreshSettings::default(),
            oracle: OracleSettings::default(),
            watchlist: Vec::new(),
            endpoints: Vec::new(),
            preferences_path: default_preferences_path(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
