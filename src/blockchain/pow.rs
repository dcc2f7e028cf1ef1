use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Block, MAX_DIFFICULTY, PROGRESS_INTERVAL, derive_hash};

/// Shared flag a running search polls once per progress batch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Informational snapshot emitted every progress batch.
#[derive(Debug, Clone)]
pub struct MiningProgress {
    pub attempts: u64,
    pub nonce: u64,
    pub last_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub hash: String,
    /// Attempts spent across every `run` of the search.
    pub attempts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Solution),
    Cancelled { attempts: u64 },
}

/// Proof-of-Work search over `last_hash || nonce || last_data`.
///
/// The search counter lives only here and is never persisted. A cancelled
/// search keeps its position, so calling `run` again resumes where it stopped.
/// A difficulty above `MAX_DIFFICULTY` is unsatisfiable and `run` would only
/// end by cancellation.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    last_hash: String,
    last_data: String,
    target_pattern: String,
    search_counter: u64,
    attempts: u64,
    progress_interval: u64,
}

impl ProofOfWork {
    pub fn new(last_hash: impl Into<String>, last_data: impl Into<String>, difficulty: u32) -> Self {
        Self {
            last_hash: last_hash.into(),
            last_data: last_data.into(),
            // One zero past the digest width is already unreachable.
            target_pattern: "0".repeat(difficulty.min(MAX_DIFFICULTY + 1) as usize),
            search_counter: 0,
            attempts: 0,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Search whose target is set by `last`.
    pub fn for_block(last: &Block) -> Self {
        Self::new(last.hash.as_str(), last.data.as_str(), last.difficulty)
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn target_pattern(&self) -> &str {
        &self.target_pattern
    }

    pub fn candidate_digest(&self, nonce: u64) -> String {
        derive_hash(&format!("{}{}{}", self.last_hash, nonce, self.last_data))
    }

    /// Try candidates until one matches the target pattern or `cancel` is
    /// observed at a batch boundary. There is no attempt cap.
    pub fn run<F>(&mut self, cancel: &CancelToken, mut on_progress: F) -> SearchOutcome
    where
        F: FnMut(&MiningProgress),
    {
        loop {
            let nonce = self.search_counter;
            let digest = self.candidate_digest(nonce);
            self.attempts += 1;

            if digest.starts_with(&self.target_pattern) {
                return SearchOutcome::Found(Solution {
                    nonce,
                    hash: digest,
                    attempts: self.attempts,
                });
            }
            self.search_counter = self.search_counter.wrapping_add(1);

            if self.attempts % self.progress_interval == 0 {
                on_progress(&MiningProgress {
                    attempts: self.attempts,
                    nonce,
                    last_digest: digest,
                });
                if cancel.is_cancelled() {
                    return SearchOutcome::Cancelled {
                        attempts: self.attempts,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelToken, ProofOfWork, SearchOutcome, Solution};
    use crate::blockchain::derive_hash;

    fn solve(pow: &mut ProofOfWork) -> Solution {
        match pow.run(&CancelToken::new(), |_| {}) {
            SearchOutcome::Found(s) => s,
            SearchOutcome::Cancelled { .. } => panic!("search was never cancelled"),
        }
    }

    #[test]
    fn zero_difficulty_matches_first_candidate() {
        let mut pow = ProofOfWork::new("abc", "data", 0);
        let s = solve(&mut pow);
        assert_eq!(s.nonce, 0);
        assert_eq!(s.attempts, 1);
        assert_eq!(s.hash, derive_hash("abc0data"));
        assert_eq!(pow.target_pattern(), "");
    }

    #[test]
    fn found_hash_meets_target() {
        let mut pow = ProofOfWork::new(derive_hash("hello"), "hello", 2);
        let s = solve(&mut pow);
        assert!(s.hash.starts_with("00"));
        assert_eq!(s.hash, pow.candidate_digest(s.nonce));
        assert_eq!(s.attempts, s.nonce + 1);
    }

    #[test]
    fn replaying_search_gives_same_solution() {
        let first = solve(&mut ProofOfWork::new(derive_hash("x"), "x", 2));
        let second = solve(&mut ProofOfWork::new(derive_hash("x"), "x", 2));
        assert_eq!(first, second);
    }

    #[test]
    fn progress_is_reported_per_batch() {
        let mut reports = Vec::new();
        let mut pow = ProofOfWork::new(derive_hash("y"), "y", 3).with_progress_interval(50);
        let outcome = pow.run(&CancelToken::new(), |p| reports.push(p.attempts));
        let SearchOutcome::Found(s) = outcome else {
            panic!("expected a solution");
        };
        assert_eq!(reports.len() as u64, (s.attempts - 1) / 50);
        assert!(reports.iter().all(|a| a % 50 == 0));
    }

    #[test]
    fn cancelled_search_resumes_to_same_solution() {
        let expected = solve(&mut ProofOfWork::new(derive_hash("z"), "z", 2));

        let token = CancelToken::new();
        token.cancel();
        let mut pow = ProofOfWork::new(derive_hash("z"), "z", 2).with_progress_interval(1);
        match pow.run(&token, |_| {}) {
            SearchOutcome::Cancelled { attempts } => assert_eq!(attempts, 1),
            SearchOutcome::Found(s) => assert_eq!(s, expected),
        }

        token.reset();
        assert_eq!(solve(&mut pow), expected);
    }

    #[test]
    fn oversized_difficulty_caps_pattern() {
        assert_eq!(ProofOfWork::new("h", "d", 64).target_pattern().len(), 64);
        assert_eq!(ProofOfWork::new("h", "d", u32::MAX).target_pattern().len(), 65);
    }

    #[test]
    fn unreachable_target_stops_on_cancel() {
        let token = CancelToken::new();
        token.cancel();
        let mut pow = ProofOfWork::new("h", "d", 64).with_progress_interval(100);
        assert_eq!(
            pow.run(&token, |_| {}),
            SearchOutcome::Cancelled { attempts: 100 }
        );
    }
}
