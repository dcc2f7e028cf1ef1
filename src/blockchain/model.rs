use log::debug;

use super::{
    Block, CancelToken, MAX_DIFFICULTY, MiningProgress, ProofOfWork, SearchOutcome, derive_hash,
};
use crate::error::ChainFault;

/// Result of asking the chain to mine its next block.
#[derive(Debug, Clone, PartialEq)]
pub enum MineOutcome {
    Mined {
        block: Block,
        nonce: u64,
        attempts: u64,
    },
    /// The chain has no block to set a target; nothing was appended.
    NothingToMine,
    Cancelled {
        attempts: u64,
    },
}

/// In-memory append-only chain of blocks.
#[derive(Debug, Default, Clone)]
pub struct Blockchain {
    pub chain: Vec<Block>,
}

impl Blockchain {
    /// Initialize a new blockchain with a genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    /// Wrap blocks as loaded from a store, without checking them.
    pub fn from_blocks(chain: Vec<Block>) -> Self {
        Self { chain }
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.chain
    }

    /// Return the last block in the chain, if any.
    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Difficulty the next mined block must satisfy (0 for an empty chain).
    pub fn difficulty(&self) -> u32 {
        self.last_block().map_or(0, |b| b.difficulty)
    }

    /// Append a block written by `author`. Difficulty is carried forward
    /// unchanged; no content validation is performed.
    pub fn append_authored(&mut self, author: String, data: String) -> Result<&Block, ChainFault> {
        let (id, prev_hash) = match self.last_block() {
            Some(last) => (next_id(last)?, Some(last.hash.clone())),
            None => (0, None),
        };
        let block = Block::new(id, prev_hash, author, data, self.difficulty());
        debug!("CHAIN - appended authored block #{} ({})", block.id, block.hash);

        self.chain.push(block);
        Ok(&self.chain[self.chain.len() - 1])
    }

    /// Run Proof-of-Work against the last block and append the mined block.
    ///
    /// Fails without searching when the last block leaves no room for a
    /// successor id or a higher difficulty.
    pub fn mine_block<F>(
        &mut self,
        progress_interval: u64,
        cancel: &CancelToken,
        on_progress: F,
    ) -> Result<MineOutcome, ChainFault>
    where
        F: FnMut(&MiningProgress),
    {
        let Some(last) = self.last_block() else {
            return Ok(MineOutcome::NothingToMine);
        };
        let id = next_id(last)?;
        if last.difficulty >= MAX_DIFFICULTY {
            return Err(ChainFault::DifficultyExhausted { id: last.id });
        }
        let (prev_hash, difficulty) = (last.hash.clone(), last.difficulty + 1);
        let mut pow = ProofOfWork::for_block(last).with_progress_interval(progress_interval);

        let solution = match pow.run(cancel, on_progress) {
            SearchOutcome::Found(s) => s,
            SearchOutcome::Cancelled { attempts } => {
                return Ok(MineOutcome::Cancelled { attempts });
            }
        };

        let block = Block::mined(
            id,
            prev_hash,
            solution.hash,
            solution.nonce,
            difficulty,
            pow.target_pattern().to_string(),
        );
        self.chain.push(block.clone());

        Ok(MineOutcome::Mined {
            block,
            nonce: solution.nonce,
            attempts: solution.attempts,
        })
    }

    /// Validate the entire chain: ids, linkage, hashes and difficulty.
    ///
    /// A block that keeps its predecessor's difficulty is authored and must
    /// hash its data; one that raises it by one is mined and must meet the
    /// predecessor's target. Hashes cover `data` only, so a payload rewritten
    /// together with its hash is not detected.
    pub fn validate(&self) -> Result<(), ChainFault> {
        let Some(first) = self.chain.first() else {
            return Ok(());
        };
        if first.id != 0 || first.prev_hash.is_some() || first.hash != derive_hash(&first.data) {
            return Err(ChainFault::BadGenesis);
        }
        check_difficulty_range(first)?;

        for (i, pair) in self.chain.windows(2).enumerate() {
            let (prev, current) = (&pair[0], &pair[1]);
            let position = i + 1;

            if current.id != position as u64 {
                return Err(ChainFault::BadId {
                    position,
                    found: current.id,
                });
            }
            if current.prev_hash.as_deref() != Some(prev.hash.as_str()) {
                return Err(ChainFault::BrokenLink {
                    id: current.id,
                    prev_id: prev.id,
                });
            }
            check_difficulty_range(current)?;

            // Both sides are at most MAX_DIFFICULTY here.
            if current.difficulty < prev.difficulty {
                return Err(ChainFault::DifficultyRegression {
                    id: current.id,
                    previous: prev.difficulty,
                    found: current.difficulty,
                });
            } else if current.difficulty == prev.difficulty {
                if current.hash != derive_hash(&current.data) {
                    return Err(ChainFault::HashMismatch { id: current.id });
                }
            } else {
                let expected = "0".repeat(prev.difficulty as usize);
                if current.difficulty != prev.difficulty + 1
                    || current.target_pattern != expected
                    || !current.hash.starts_with(&expected)
                {
                    return Err(ChainFault::InsufficientWork { id: current.id });
                }
            }
        }

        Ok(())
    }
}

fn next_id(last: &Block) -> Result<u64, ChainFault> {
    last.id
        .checked_add(1)
        .ok_or(ChainFault::IdExhausted { id: last.id })
}

fn check_difficulty_range(block: &Block) -> Result<(), ChainFault> {
    if block.difficulty > MAX_DIFFICULTY {
        return Err(ChainFault::DifficultyOutOfRange {
            id: block.id,
            found: block.difficulty,
            max: MAX_DIFFICULTY,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Blockchain, MineOutcome};
    use crate::blockchain::{
        Block, CancelToken, MAX_DIFFICULTY, MINER_AUTHOR, PROGRESS_INTERVAL, derive_hash,
    };
    use crate::error::ChainFault;

    fn mine(bc: &mut Blockchain) -> (Block, u64) {
        match bc.mine_block(PROGRESS_INTERVAL, &CancelToken::new(), |_| {}) {
            Ok(MineOutcome::Mined { block, nonce, .. }) => (block, nonce),
            other => panic!("expected a mined block, got {other:?}"),
        }
    }

    fn append(bc: &mut Blockchain, author: &str, data: &str) -> Block {
        bc.append_authored(author.into(), data.into())
            .expect("append")
            .clone()
    }

    #[test]
    fn new_chain_starts_at_genesis() {
        let bc = Blockchain::new();
        assert_eq!(bc.len(), 1);
        assert!(bc.validate().is_ok());
        assert_eq!(bc.difficulty(), 0);
    }

    #[test]
    fn append_on_empty_chain_starts_at_zero() {
        let mut bc = Blockchain::default();
        let b = append(&mut bc, "alice", "first");
        assert_eq!(b.id, 0);
        assert!(b.prev_hash.is_none());
        assert_eq!(b.difficulty, 0);
    }

    #[test]
    fn append_links_to_previous_block() {
        let mut bc = Blockchain::new();
        for (n, data) in ["a", "b", "", "d"].into_iter().enumerate() {
            let prev_hash = bc.last_block().map(|b| b.hash.clone());
            let b = append(&mut bc, "bob", data);
            assert_eq!(b.id, n as u64 + 1);
            assert_eq!(b.prev_hash, prev_hash);
            assert_eq!(b.hash, derive_hash(data));
        }
        assert_eq!(bc.len(), 5);
        for (i, b) in bc.chain.iter().enumerate() {
            assert_eq!(b.id, i as u64);
        }
        assert!(bc.validate().is_ok());
    }

    #[test]
    fn author_named_like_miner_is_still_valid() {
        let mut bc = Blockchain::new();
        append(&mut bc, MINER_AUTHOR, "hello");
        mine(&mut bc);
        append(&mut bc, MINER_AUTHOR, "again");
        assert_eq!(bc.validate(), Ok(()));
    }

    #[test]
    fn append_after_last_id_is_refused() {
        let mut bc = Blockchain::new();
        bc.chain[0].id = u64::MAX;
        assert_eq!(
            bc.append_authored("a".into(), "x".into()).map(|b| b.id),
            Err(ChainFault::IdExhausted { id: u64::MAX })
        );
        assert_eq!(
            bc.mine_block(PROGRESS_INTERVAL, &CancelToken::new(), |_| {}),
            Err(ChainFault::IdExhausted { id: u64::MAX })
        );
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn mining_at_difficulty_limit_is_refused() {
        let mut bc = Blockchain::new();
        bc.chain[0].difficulty = MAX_DIFFICULTY;
        assert_eq!(
            bc.mine_block(PROGRESS_INTERVAL, &CancelToken::new(), |_| {}),
            Err(ChainFault::DifficultyExhausted { id: 0 })
        );
        bc.chain[0].difficulty = u32::MAX;
        assert_eq!(
            bc.mine_block(PROGRESS_INTERVAL, &CancelToken::new(), |_| {}),
            Err(ChainFault::DifficultyExhausted { id: 0 })
        );
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn validate_rejects_oversized_difficulty() {
        let mut bc = Blockchain::new();
        bc.chain[0].difficulty = u32::MAX;
        assert_eq!(
            bc.validate(),
            Err(ChainFault::DifficultyOutOfRange {
                id: 0,
                found: u32::MAX,
                max: MAX_DIFFICULTY
            })
        );

        let mut bc = Blockchain::new();
        mine(&mut bc);
        bc.chain[1].difficulty = u32::MAX;
        assert_eq!(
            bc.validate(),
            Err(ChainFault::DifficultyOutOfRange {
                id: 1,
                found: u32::MAX,
                max: MAX_DIFFICULTY
            })
        );
    }

    #[test]
    fn mining_empty_chain_is_noop() {
        let mut bc = Blockchain::default();
        assert_eq!(
            bc.mine_block(PROGRESS_INTERVAL, &CancelToken::new(), |_| {}),
            Ok(MineOutcome::NothingToMine)
        );
        assert!(bc.is_empty());
    }

    #[test]
    fn mining_at_zero_difficulty_is_immediate() {
        let mut bc = Blockchain::new();
        append(&mut bc, "alice", "hello");
        let (block, nonce) = mine(&mut bc);
        assert_eq!(nonce, 0);
        assert_eq!(block.id, 2);
        assert_eq!(block.difficulty, 1);
        assert_eq!(block.target_pattern, "");
        assert_eq!(block.author.as_deref(), Some(MINER_AUTHOR));
        assert_eq!(block.prev_hash.as_deref(), Some(derive_hash("hello").as_str()));
        assert_eq!(block.hash, derive_hash(&format!("{}0hello", derive_hash("hello"))));
    }

    #[test]
    fn difficulty_rises_by_one_per_mined_block() {
        let mut bc = Blockchain::new();
        for expected in 1..=3 {
            let (block, _) = mine(&mut bc);
            assert_eq!(block.difficulty, expected);
            assert!(block.hash.starts_with(&"0".repeat(expected as usize - 1)));
        }
        let authored = append(&mut bc, "carol", "note");
        assert_eq!(authored.difficulty, 3);
        assert!(bc.validate().is_ok());
    }

    #[test]
    fn cancelled_mining_leaves_chain_untouched() {
        let mut bc = Blockchain::new();
        bc.chain[0].difficulty = MAX_DIFFICULTY - 1;
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            bc.mine_block(10, &token, |_| {}),
            Ok(MineOutcome::Cancelled { attempts: 10 })
        );
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn validate_reports_broken_link() {
        let mut bc = Blockchain::new();
        append(&mut bc, "a", "x");
        append(&mut bc, "a", "y");
        bc.chain[2].prev_hash = Some("forged".into());
        assert_eq!(
            bc.validate(),
            Err(ChainFault::BrokenLink { id: 2, prev_id: 1 })
        );
    }

    #[test]
    fn validate_reports_tampered_data() {
        let mut bc = Blockchain::new();
        append(&mut bc, "a", "x");
        bc.chain[1].data = "changed".into();
        assert_eq!(bc.validate(), Err(ChainFault::HashMismatch { id: 1 }));
    }

    #[test]
    fn validate_reports_forged_mined_block() {
        let mut bc = Blockchain::new();
        mine(&mut bc);
        mine(&mut bc);
        bc.chain[2].hash = "f".repeat(64);
        assert_eq!(bc.validate(), Err(ChainFault::InsufficientWork { id: 2 }));
    }

    #[test]
    fn validate_reports_difficulty_jump() {
        let mut bc = Blockchain::new();
        append(&mut bc, "a", "x");
        bc.chain[1].difficulty = 2;
        assert_eq!(bc.validate(), Err(ChainFault::InsufficientWork { id: 1 }));
    }

    #[test]
    fn validate_reports_bad_ids() {
        let mut bc = Blockchain::new();
        append(&mut bc, "a", "x");
        bc.chain[1].id = 5;
        assert_eq!(
            bc.validate(),
            Err(ChainFault::BadId {
                position: 1,
                found: 5
            })
        );
    }
}
