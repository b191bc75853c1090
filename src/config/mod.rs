mod config;

pub use config::{
    EndpointOverride, HttpSettings, OracleSettings, RefreshSettings, Settings, WatchlistEntry,
};
