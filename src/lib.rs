pub mod client;
pub mod config;
pub mod fetch;
pub mod metrics;
pub mod networks;
pub mod prefs;
pub mod refresh;
pub mod store;
pub mod utils;

pub use client::{EthPriceOracle, SubgraphClient};
pub use config::Settings;
pub use networks::{NetworkId, NetworkInfo, NetworkRegistry};
pub use refresh::RefreshScheduler;
pub use store::EntityStore;
