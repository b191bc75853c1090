//! Fetch-trigger updaters: one per entity kind.
//!
//! Each updater follows the same shape: plan the slot against the tracker,
//! run the fetch when claimed, write the result through the store, settle the
//! tracker. Writes are keyed by the request's own network and address, so a
//! late response after the consumer moved on still lands under its original
//! key and cannot corrupt anything else.

pub mod pools;
pub mod protocol;
pub mod tokens;
mod transactions;

pub use pools::PoolUpdater;
pub use protocol::ProtocolUpdater;
pub use tokens::TokenUpdater;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::client::{blocks::blocks_for_timestamps, SubgraphClient};
use crate::networks::NetworkInfo;
use crate::utils::delta_timestamps;

/// Resolved block numbers for the standard comparison windows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WindowBlocks {
    pub one_day: u64,
    pub two_day: u64,
    pub week: u64,
}

/// Resolves the -24h/-48h/-week blocks for a network. Every window is
/// required: a composite fetch with a missing window would produce derived
/// percentages from mismatched data.
pub(crate) async fn window_blocks(
    client: &SubgraphClient,
    network: &NetworkInfo,
) -> Result<WindowBlocks> {
    let deltas = delta_timestamps(Utc::now());
    let blocks = blocks_for_timestamps(
        client,
        &network.blocks_endpoint,
        &[deltas.one_day, deltas.two_day, deltas.week],
    )
    .await?;

    Ok(WindowBlocks {
        one_day: blocks[0].context("No block found for the 24h window")?,
        two_day: blocks[1].context("No block found for the 48h window")?,
        week: blocks[2].context("No block found for the week window")?,
    })
}
