//! Passive subgraph health check.
//!
//! Compares the block the subgraph has indexed up to against the chain head
//! reported by the blocks endpoint. The result is purely informational: a
//! lagging subgraph is surfaced as a banner, it never blocks or alters
//! fetches.

use anyhow::{Context, Result};

use crate::networks::NetworkInfo;

use super::{blocks::latest_block, SubgraphClient};

/// Sync position of a network's subgraph relative to the chain head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub indexed_block: u64,
    pub head_block: u64,
}

impl SyncStatus {
    pub fn lag(&self) -> u64 {
        self.head_block.saturating_sub(self.indexed_block)
    }

    pub fn is_lagging(&self, threshold_blocks: u64) -> bool {
        self.lag() > threshold_blocks
    }
}

/// Reads the subgraph's indexed head and the chain head.
pub async fn sync_status(client: &SubgraphClient, network: &NetworkInfo) -> Result<SyncStatus> {
    let query = "query meta { _meta { block { number } } }";
    let data = client.query_value(&network.data_endpoint, query).await?;

    let indexed_block = data
        .get("_meta")
        .and_then(|meta| meta.get("block"))
        .and_then(|block| block.get("number"))
        .and_then(|n| n.as_u64())
        .context("Subgraph _meta carried no block number")?;

    let head_block = latest_block(client, &network.blocks_endpoint).await?;

    Ok(SyncStatus {
        indexed_block,
        head_block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lag_is_saturating() {
        let status = SyncStatus {
            indexed_block: 90,
            head_block: 100,
        };
        assert_eq!(status.lag(), 10);
        assert!(status.is_lagging(5));
        assert!(!status.is_lagging(10));

        // an indexed head slightly past the sampled chain head is no lag
        let ahead = SyncStatus {
            indexed_block: 101,
            head_block: 100,
        };
        assert_eq!(ahead.lag(), 0);
    }
}
