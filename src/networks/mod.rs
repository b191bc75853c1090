//! Registry of supported networks and active-network selection.
//!
//! Every cached record is partitioned by [`NetworkId`]; switching the active
//! network never drops another partition's records.

use log::warn;
use once_cell::sync::Lazy;
use url::Url;

use crate::config::Settings;

/// Identifier of a supported chain. Used as the first key of every cache
/// partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Ethereum,
    Arbitrum,
    Optimism,
    Polygon,
    Base,
}

impl NetworkId {
    pub const ALL: [NetworkId; 5] = [
        NetworkId::Ethereum,
        NetworkId::Arbitrum,
        NetworkId::Optimism,
        NetworkId::Polygon,
        NetworkId::Base,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Ethereum => "ethereum",
            NetworkId::Arbitrum => "arbitrum",
            NetworkId::Optimism => "optimism",
            NetworkId::Polygon => "polygon",
            NetworkId::Base => "base",
        }
    }

    pub fn from_slug(slug: &str) -> Option<NetworkId> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == slug.to_lowercase())
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration for one supported chain.
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub id: NetworkId,
    pub name: String,
    /// Leading route segment that selects this network. Empty for the
    /// default network.
    pub route_prefix: String,
    /// Subgraph endpoint for entity data.
    pub data_endpoint: String,
    /// Endpoint mapping timestamps to block numbers.
    pub blocks_endpoint: String,
}

static DEFAULT_NETWORKS: Lazy<Vec<NetworkInfo>> = Lazy::new(|| {
    vec![
        NetworkInfo {
            id: NetworkId::Ethereum,
            name: "Ethereum".to_string(),
            route_prefix: String::new(),
            data_endpoint: "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3".to_string(),
            blocks_endpoint: "https://api.thegraph.com/subgraphs/name/blocklytics/ethereum-blocks"
                .to_string(),
        },
        NetworkInfo {
            id: NetworkId::Arbitrum,
            name: "Arbitrum".to_string(),
            route_prefix: "arbitrum".to_string(),
            data_endpoint: "https://api.thegraph.com/subgraphs/name/ianlapham/arbitrum-minimal"
                .to_string(),
            blocks_endpoint:
                "https://api.thegraph.com/subgraphs/name/ianlapham/arbitrum-one-blocks".to_string(),
        },
        NetworkInfo {
            id: NetworkId::Optimism,
            name: "Optimism".to_string(),
            route_prefix: "optimism".to_string(),
            data_endpoint: "https://api.thegraph.com/subgraphs/name/ianlapham/optimism-post-regenesis"
                .to_string(),
            blocks_endpoint: "https://api.thegraph.com/subgraphs/name/ianlapham/uni-testing-subgraph"
                .to_string(),
        },
        NetworkInfo {
            id: NetworkId::Polygon,
            name: "Polygon".to_string(),
            route_prefix: "polygon".to_string(),
            data_endpoint: "https://api.thegraph.com/subgraphs/name/ianlapham/uniswap-v3-polygon"
                .to_string(),
            blocks_endpoint: "https://api.thegraph.com/subgraphs/name/ianlapham/polygon-blocks"
                .to_string(),
        },
        NetworkInfo {
            id: NetworkId::Base,
            name: "Base".to_string(),
            route_prefix: "base".to_string(),
            data_endpoint: "https://api.studio.thegraph.com/query/48211/uniswap-v3-base/version/latest"
                .to_string(),
            blocks_endpoint: "https://api.studio.thegraph.com/query/48211/base-blocks/version/latest"
                .to_string(),
        },
    ]
});

/// Lookup table of supported networks.
///
/// The registry order matters for route matching: the first entry with a
/// matching non-empty prefix wins, and the first entry is the default.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: Vec<NetworkInfo>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self {
            networks: DEFAULT_NETWORKS.clone(),
        }
    }

    /// Registry with per-network endpoint overrides applied from settings.
    /// Malformed override URLs are skipped, the built-in endpoint stays.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new();
        for over in &settings.endpoints {
            let Some(id) = NetworkId::from_slug(&over.network) else {
                warn!("Ignoring endpoint override for unknown network {}", over.network);
                continue;
            };
            if let Some(info) = registry.networks.iter_mut().find(|n| n.id == id) {
                if let Some(url) = valid_endpoint(over.data_endpoint.as_deref()) {
                    info.data_endpoint = url;
                }
                if let Some(url) = valid_endpoint(over.blocks_endpoint.as_deref()) {
                    info.blocks_endpoint = url;
                }
            }
        }
        registry
    }

    /// Registry over an explicit network list. Used by tests to point at a
    /// mock server.
    pub fn with_networks(networks: Vec<NetworkInfo>) -> Self {
        Self { networks }
    }

    pub fn get(&self, id: NetworkId) -> Option<&NetworkInfo> {
        self.networks.iter().find(|n| n.id == id)
    }

    pub fn default_network(&self) -> &NetworkInfo {
        &self.networks[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkInfo> {
        self.networks.iter()
    }

    /// Resolves the active network from a route path.
    ///
    /// The first registry entry whose non-empty route prefix matches the
    /// leading path segment wins; anything else falls back to the default
    /// network.
    pub fn network_from_route<'a>(&'a self, path: &str) -> &'a NetworkInfo {
        let trimmed = path.trim_start_matches('/');
        let first_segment = trimmed.split('/').next().unwrap_or("");

        self.networks
            .iter()
            .find(|n| !n.route_prefix.is_empty() && n.route_prefix == first_segment)
            .unwrap_or_else(|| self.default_network())
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn valid_endpoint(candidate: Option<&str>) -> Option<String> {
    let raw = candidate?;
    match Url::parse(raw) {
        Ok(_) => Some(raw.to_string()),
        Err(e) => {
            warn!("Ignoring malformed endpoint override {raw}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_prefix_selects_network() {
        let registry = NetworkRegistry::new();
        assert_eq!(
            registry.network_from_route("/arbitrum/tokens/0xabc").id,
            NetworkId::Arbitrum
        );
        assert_eq!(
            registry.network_from_route("polygon").id,
            NetworkId::Polygon
        );
    }

    #[test]
    fn unknown_route_falls_back_to_default() {
        let registry = NetworkRegistry::new();
        assert_eq!(registry.network_from_route("/").id, NetworkId::Ethereum);
        assert_eq!(
            registry.network_from_route("/tokens/0xabc").id,
            NetworkId::Ethereum
        );
        // a prefix has to match the whole segment
        assert_eq!(
            registry.network_from_route("/basednetwork").id,
            NetworkId::Ethereum
        );
    }

    #[test]
    fn overrides_apply_only_when_valid() {
        let mut settings = Settings::default();
        settings.endpoints = vec![
            crate::config::EndpointOverride {
                network: "arbitrum".to_string(),
                data_endpoint: Some("http://localhost:8000/subgraph".to_string()),
                blocks_endpoint: Some("not a url".to_string()),
            },
            crate::config::EndpointOverride {
                network: "solana".to_string(),
                data_endpoint: Some("http://localhost:9000".to_string()),
                blocks_endpoint: None,
            },
        ];

        let registry = NetworkRegistry::from_settings(&settings);
        let arbitrum = registry.get(NetworkId::Arbitrum).unwrap();
        assert_eq!(arbitrum.data_endpoint, "http://localhost:8000/subgraph");
        // malformed override keeps the built-in endpoint
        assert!(arbitrum.blocks_endpoint.starts_with("https://"));
    }

    #[test]
    fn slug_roundtrip() {
        for id in NetworkId::ALL {
            assert_eq!(NetworkId::from_slug(id.as_str()), Some(id));
        }
        assert_eq!(NetworkId::from_slug("ETHEREUM"), Some(NetworkId::Ethereum));
        assert_eq!(NetworkId::from_slug("solana"), None);
    }
}
