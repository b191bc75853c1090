//! Address validation and normalization.
//!
//! All cache keys are lowercase hex addresses so lookups never miss on
//! checksum casing.

/// Normalizes a hex address to its lowercase form.
///
/// Returns `None` for anything that is not a 20-byte `0x`-prefixed hex
/// string, so invalid route params never create cache keys.
pub fn normalize_address(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() != 42 {
        return None;
    }
    let (prefix, hex) = trimmed.split_at(2);
    if !prefix.eq_ignore_ascii_case("0x") {
        return None;
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_checksummed_address() {
        let addr = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        assert_eq!(
            normalize_address(addr).as_deref(),
            Some("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(normalize_address("0x123"), None);
        assert_eq!(normalize_address("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48ab"), None);
        assert_eq!(
            normalize_address("0xzzb86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            None
        );
    }
}
