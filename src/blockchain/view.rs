use super::Block;

pub const EMPTY_CHAIN_NOTICE: &str = "No blocks found.";

/// One display line per block; never mutates the chain.
pub fn render(chain: &[Block]) -> Vec<String> {
    if chain.is_empty() {
        return vec![EMPTY_CHAIN_NOTICE.to_string()];
    }
    chain
        .iter()
        .map(|b| {
            format!(
                "ID: {}, Hash: {}, Timestamp: {}, Data: {}, Author: {}",
                b.id,
                b.hash,
                b.timestamp.to_rfc3339(),
                b.data,
                b.author.as_deref().unwrap_or("-")
            )
        })
        .collect()
}
