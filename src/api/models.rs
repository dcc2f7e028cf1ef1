use std::sync::Mutex;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, CancelToken, MineOutcome};
use crate::config::Config;
use crate::ledger::Ledger;
use crate::storage::JsonFileStore;

/// Shared application state around the file-backed ledger.
pub struct AppState {
    pub ledger: Ledger<JsonFileStore>,
    /// Held across every load-mutate-store cycle so they never overlap.
    pub write_lock: Mutex<()>,
    /// Polled by the running search; set by `/mine/cancel/`.
    pub cancel: CancelToken,
    pub searching: AtomicBool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let ledger = Ledger::new(JsonFileStore::new(config.ledger_path.clone()))
            .with_progress_interval(config.progress_interval);
        Self {
            ledger,
            write_lock: Mutex::new(()),
            cancel: CancelToken::new(),
            searching: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn for_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(&Config {
            ledger_path: path.into(),
            ..Config::default()
        })
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Deserialize)]
pub struct NewBlockRequest {
    pub author: String,
    pub data: String,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub difficulty: u32,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ViewResponse {
    pub lines: Vec<String>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
    pub fault: Option<String>,
}

/* ---------- Mining API Models ---------- */

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MineResponse {
    Mined {
        block: Block,
        nonce: u64,
        attempts: u64,
    },
    NothingToMine,
    Cancelled {
        attempts: u64,
    },
}

impl From<MineOutcome> for MineResponse {
    fn from(outcome: MineOutcome) -> Self {
        match outcome {
            MineOutcome::Mined {
                block,
                nonce,
                attempts,
            } => MineResponse::Mined {
                block,
                nonce,
                attempts,
            },
            MineOutcome::NothingToMine => MineResponse::NothingToMine,
            MineOutcome::Cancelled { attempts } => MineResponse::Cancelled { attempts },
        }
    }
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}
