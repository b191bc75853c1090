pub mod blocks;
pub mod health;
pub mod oracle;
mod subgraph;

pub use health::{sync_status, SyncStatus};
pub use oracle::{EthPriceOracle, EthPrices};
pub use subgraph::SubgraphClient;

/// Subgraphs return numeric fields as strings; anything unparseable reads
/// as zero, matching the "never undefined" rule for derived fields.
pub(crate) fn parse_num(value: &str) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Renders an address list as a GraphQL string array.
pub(crate) fn address_list(addresses: &[String]) -> String {
    let quoted: Vec<String> = addresses.iter().map(|a| format!("\"{a}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Renders the optional point-in-time block argument of a bulk query.
pub(crate) fn block_clause(block: Option<u64>) -> String {
    match block {
        Some(number) => format!("block: {{number: {number}}}, "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_num_defaults_to_zero() {
        assert_eq!(parse_num("123.5"), 123.5);
        assert_eq!(parse_num(""), 0.0);
        assert_eq!(parse_num("not-a-number"), 0.0);
    }

    #[test]
    fn address_list_renders_graphql_array() {
        let addrs = vec!["0xaa".to_string(), "0xbb".to_string()];
        assert_eq!(address_list(&addrs), "[\"0xaa\", \"0xbb\"]");
    }
}
