use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures at the storage boundary of the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The backing store exists but could not be read or decoded.
    /// `BlockStore::load` recovers from this by treating the chain as empty.
    #[error("store {path} is unreadable: {reason}")]
    StoreUnreadable { path: PathBuf, reason: String },

    /// Persisting the chain failed; the previous store content is untouched.
    #[error("store {path} is unwritable: {source}")]
    StoreUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The loaded chain cannot be extended.
    #[error(transparent)]
    Chain(#[from] ChainFault),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// First inconsistency found while walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("block at position 0 is not a valid first block")]
    BadGenesis,
    #[error("block at position {position} has id {found}")]
    BadId { position: usize, found: u64 },
    #[error("block #{id} does not reference the hash of block #{prev_id}")]
    BrokenLink { id: u64, prev_id: u64 },
    #[error("block #{id} hash does not match its data")]
    HashMismatch { id: u64 },
    #[error("block #{id} lowers difficulty from {previous} to {found}")]
    DifficultyRegression { id: u64, previous: u32, found: u32 },
    #[error("mined block #{id} does not satisfy the target set by its predecessor")]
    InsufficientWork { id: u64 },
    #[error("block #{id} has difficulty {found}, above the limit of {max}")]
    DifficultyOutOfRange { id: u64, found: u32, max: u32 },
    #[error("block #{id} has no successor id")]
    IdExhausted { id: u64 },
    #[error("block #{id} is at the difficulty limit; nothing can be mined on top of it")]
    DifficultyExhausted { id: u64 },
}
