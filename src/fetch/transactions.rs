//! Shared transaction-list fetch pieces for token and pool updaters.

use serde::Deserialize;

use crate::client::parse_num;
use crate::store::models::{Transaction, TransactionKind};

pub(crate) const TRANSACTIONS_PAGE: usize = 100;

#[derive(Deserialize)]
pub(crate) struct TransactionRef {
    pub id: String,
    pub timestamp: String,
}

#[derive(Deserialize)]
pub(crate) struct EventTokenRef {
    pub id: String,
    pub symbol: String,
}

/// Row shape shared by mints, burns, and swaps. The sender field differs per
/// event type in the schema; queries alias it to `origin`.
#[derive(Deserialize)]
pub(crate) struct EventRow {
    pub transaction: TransactionRef,
    pub origin: String,
    pub token0: EventTokenRef,
    pub token1: EventTokenRef,
    pub amount0: String,
    pub amount1: String,
    #[serde(rename = "amountUSD")]
    pub amount_usd: String,
}

#[derive(Deserialize, Default)]
pub(crate) struct EventRows {
    #[serde(default)]
    pub mints: Vec<EventRow>,
    #[serde(default)]
    pub swaps: Vec<EventRow>,
    #[serde(default)]
    pub burns: Vec<EventRow>,
}

const EVENT_FIELDS: &str = "transaction { id timestamp } origin amount0 amount1 amountUSD \
                            token0 { id symbol } token1 { id symbol }";

/// Query for events touching one token, on either side of the pair.
pub(crate) fn token_transactions_query(address: &str) -> String {
    let mut query = String::from("query transactions {\n");
    for entity in ["mints", "swaps", "burns"] {
        query.push_str(&format!(
            "  {entity}(first: {TRANSACTIONS_PAGE}, orderBy: timestamp, orderDirection: desc, \
             where: {{ or: [{{ token0: \"{address}\" }}, {{ token1: \"{address}\" }}] }}, \
             subgraphError: allow) {{ {EVENT_FIELDS} }}\n"
        ));
    }
    query.push('}');
    query
}

/// Query for events of one pool.
pub(crate) fn pool_transactions_query(address: &str) -> String {
    let mut query = String::from("query transactions {\n");
    for entity in ["mints", "swaps", "burns"] {
        query.push_str(&format!(
            "  {entity}(first: {TRANSACTIONS_PAGE}, orderBy: timestamp, orderDirection: desc, \
             where: {{ pool: \"{address}\" }}, subgraphError: allow) {{ {EVENT_FIELDS} }}\n"
        ));
    }
    query.push('}');
    query
}

/// Flattens the three event lists into one series sorted newest first.
pub(crate) fn collect_transactions(rows: EventRows) -> Vec<Transaction> {
    let mut transactions = Vec::new();
    for (kind, events) in [
        (TransactionKind::Mint, rows.mints),
        (TransactionKind::Swap, rows.swaps),
        (TransactionKind::Burn, rows.burns),
    ] {
        for row in events {
            transactions.push(Transaction {
                kind,
                hash: row.transaction.id,
                timestamp: parse_num(&row.transaction.timestamp) as i64,
                sender: row.origin,
                token0_address: row.token0.id,
                token1_address: row.token1.id,
                token0_symbol: row.token0.symbol,
                token1_symbol: row.token1.symbol,
                amount_usd: parse_num(&row.amount_usd),
                amount_token0: parse_num(&row.amount0),
                amount_token1: parse_num(&row.amount1),
            });
        }
    }
    transactions.sort_by_key(|tx| std::cmp::Reverse(tx.timestamp));
    transactions
}
