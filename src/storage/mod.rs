pub mod json_file;

pub use json_file::JsonFileStore;

use log::warn;

use crate::blockchain::Block;
use crate::error::Result;

/// Durable home of the full block sequence.
pub trait BlockStore: Send + Sync {
    /// Read the whole chain. An absent store is an empty chain, not an error.
    fn try_load(&self) -> Result<Vec<Block>>;

    /// Replace the stored chain with `chain` in one step.
    fn store(&self, chain: &[Block]) -> Result<()>;

    /// Like `try_load`, but an unreadable store is treated as empty.
    fn load(&self) -> Vec<Block> {
        match self.try_load() {
            Ok(chain) => chain,
            Err(e) => {
                warn!("STORE - {e}; treating chain as empty");
                Vec::new()
            }
        }
    }
}
