//! Timestamp-to-block lookups against a network's blocks endpoint.

use anyhow::{Context, Result};

use super::SubgraphClient;

/// Width of the search window after each timestamp. A block lands within
/// ten minutes on every supported chain.
const WINDOW_SECS: i64 = 600;

/// Resolves each timestamp to the first block mined after it.
///
/// Aliases are positional (`b0`, `b1`, ...) so the response maps back to the
/// input order. A timestamp with no block in its window yields `None`;
/// callers decide whether that fails the whole fetch or skips one sample.
pub async fn blocks_for_timestamps(
    client: &SubgraphClient,
    endpoint: &str,
    timestamps: &[i64],
) -> Result<Vec<Option<u64>>> {
    if timestamps.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("query blocks {\n");
    for (i, ts) in timestamps.iter().enumerate() {
        query.push_str(&format!(
            "  b{i}: blocks(first: 1, orderBy: timestamp, orderDirection: asc, \
             where: {{ timestamp_gt: {ts}, timestamp_lt: {} }}) {{ number }}\n",
            ts + WINDOW_SECS
        ));
    }
    query.push('}');

    let data = client.query_value(endpoint, &query).await?;

    let mut blocks = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        let number = data
            .get(format!("b{i}"))
            .and_then(|rows| rows.get(0))
            .and_then(|row| row.get("number"))
            .and_then(|n| n.as_str())
            .and_then(|n| n.parse::<u64>().ok());
        blocks.push(number);
    }
    Ok(blocks)
}

/// Head block of the chain per the blocks endpoint.
pub async fn latest_block(client: &SubgraphClient, endpoint: &str) -> Result<u64> {
    let query = "query latest { blocks(first: 1, orderBy: timestamp, orderDirection: desc) { number } }";
    let data = client.query_value(endpoint, query).await?;

    data.get("blocks")
        .and_then(|rows| rows.get(0))
        .and_then(|row| row.get("number"))
        .and_then(|n| n.as_str())
        .and_then(|n| n.parse::<u64>().ok())
        .context("Blocks endpoint returned no head block")
}
