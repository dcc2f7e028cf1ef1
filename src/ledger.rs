use log::{debug, info};

use crate::blockchain::{
    Block, Blockchain, CancelToken, MineOutcome, MiningProgress, PROGRESS_INTERVAL,
};
use crate::error::{ChainFault, Result};
use crate::storage::BlockStore;

/// Summary of a stored chain and the first fault found in it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub length: usize,
    pub difficulty: u32,
    pub fault: Option<ChainFault>,
}

/// Driver-facing operations. Each call brackets its work with a full
/// load from and (for mutations) a full write to the store.
pub struct Ledger<S> {
    store: S,
    progress_interval: u64,
}

impl<S: BlockStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append an authored block, seeding genesis on an empty store.
    pub fn append_authored(&self, author: String, data: String) -> Result<Block> {
        let mut bc = Blockchain::from_blocks(self.store.load());
        if bc.is_empty() {
            info!("LEDGER - empty store, seeding genesis block");
            bc = Blockchain::new();
        }

        let block = bc.append_authored(author, data)?.clone();
        self.store.store(&bc.chain)?;
        info!("LEDGER - block #{} appended by {:?}", block.id, block.author);
        Ok(block)
    }

    /// Mine the next block. An empty store is reported as `NothingToMine`
    /// and nothing is written; a cancelled search writes nothing either.
    pub fn mine<F>(&self, cancel: &CancelToken, mut on_progress: F) -> Result<MineOutcome>
    where
        F: FnMut(&MiningProgress),
    {
        let mut bc = Blockchain::from_blocks(self.store.load());
        if let Some(last) = bc.last_block() {
            info!(
                "MINER - searching on top of block #{} (difficulty={})",
                last.id, last.difficulty
            );
        }

        let outcome = bc.mine_block(self.progress_interval, cancel, |p| {
            debug!(
                "MINER - {} attempts, nonce={}, last digest={}",
                p.attempts, p.nonce, p.last_digest
            );
            on_progress(p);
        })?;

        match &outcome {
            MineOutcome::Mined {
                block,
                nonce,
                attempts,
            } => {
                self.store.store(&bc.chain)?;
                info!(
                    "MINER - sealed block #{} (hash={}, nonce={}, attempts={})",
                    block.id, block.hash, nonce, attempts
                );
            }
            MineOutcome::Cancelled { attempts } => {
                info!("MINER - search cancelled after {attempts} attempts");
            }
            MineOutcome::NothingToMine => {
                info!("MINER - nothing to mine, chain is empty");
            }
        }
        Ok(outcome)
    }

    /// Current chain for display. Read-only: no genesis seeding, no write.
    pub fn load_for_display(&self) -> Vec<Block> {
        self.store.load()
    }

    pub fn validate(&self) -> ChainReport {
        let bc = Blockchain::from_blocks(self.store.load());
        ChainReport {
            length: bc.len(),
            difficulty: bc.difficulty(),
            fault: bc.validate().err(),
        }
    }
}
