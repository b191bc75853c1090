#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Swap,
    Mint,
    Burn,
}

/// One historical transaction touching a token or pool.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub hash: String,
    pub timestamp: i64,
    pub sender: String,
    pub token0_address: String,
    pub token1_address: String,
    pub token0_symbol: String,
    pub token1_symbol: String,
    pub amount_usd: f64,
    pub amount_token0: f64,
    pub amount_token1: f64,
}
