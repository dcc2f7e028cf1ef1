pub mod block;
pub mod model;
pub mod pow;
pub mod view;

pub use block::{Block, derive_hash};
pub use model::{Blockchain, MineOutcome};
pub use pow::{CancelToken, MiningProgress, ProofOfWork, SearchOutcome};
pub use view::render;

/// Payload of the first block of every chain.
pub const GENESIS_DATA: &str = "genesis block";

/// Author recorded on blocks produced by the mining engine.
pub const MINER_AUTHOR: &str = "miner";

/// Attempts between two progress reports (and cancellation checks).
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Highest difficulty a block may carry: the hex digits of a digest.
pub const MAX_DIFFICULTY: u32 = 64;
