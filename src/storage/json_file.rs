use std::fs;
use std::io;
use std::path::PathBuf;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::BlockStore;
use crate::blockchain::Block;
use crate::error::{LedgerError, Result};

/// One record as found on disk: `{"block": {...}}` or a bare block object.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Wrapped { block: Block },
    Bare(Block),
}

/// Top-level store shapes: a list of records, or a single record.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    Chain(Vec<StoredRecord>),
    Single(StoredRecord),
}

impl StoredRecord {
    fn into_block(self) -> Block {
        match self {
            StoredRecord::Wrapped { block } | StoredRecord::Bare(block) => block,
        }
    }
}

impl StoredLayout {
    fn into_blocks(self) -> Vec<Block> {
        match self {
            StoredLayout::Chain(records) => records.into_iter().map(StoredRecord::into_block).collect(),
            StoredLayout::Single(record) => vec![record.into_block()],
        }
    }
}

#[derive(Serialize)]
struct WrappedRef<'a> {
    block: &'a Block,
}

/// Chain persisted as a pretty-printed JSON array at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "blocks".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn unreadable(&self, reason: impl ToString) -> LedgerError {
        LedgerError::StoreUnreadable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn unwritable(&self, source: io::Error) -> LedgerError {
        LedgerError::StoreUnwritable {
            path: self.path.clone(),
            source,
        }
    }
}

impl BlockStore for JsonFileStore {
    fn try_load(&self) -> Result<Vec<Block>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("STORE - {} absent, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unreadable(e)),
        };

        let layout: StoredLayout = serde_json::from_str(&raw).map_err(|e| self.unreadable(e))?;
        let chain = layout.into_blocks();
        debug!("STORE - loaded {} blocks from {}", chain.len(), self.path.display());
        Ok(chain)
    }

    fn store(&self, chain: &[Block]) -> Result<()> {
        let records: Vec<WrappedRef> = chain.iter().map(|block| WrappedRef { block }).collect();
        let json = serde_json::to_vec_pretty(&records).map_err(|e| self.unwritable(e.into()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.unwritable(e))?;
        }

        // Write beside the target, then rename over it.
        let tmp = self.tmp_path();
        fs::write(&tmp, &json).map_err(|e| self.unwritable(e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!("STORE - could not remove {}: {cleanup}", tmp.display());
            }
            return Err(self.unwritable(e));
        }

        debug!("STORE - wrote {} blocks to {}", chain.len(), self.path.display());
        Ok(())
    }
}
