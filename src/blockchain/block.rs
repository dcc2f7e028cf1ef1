use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{GENESIS_DATA, MINER_AUTHOR};

/// A single ledger entry linked to its predecessor by hash.
///
/// Key aliases keep stores written by older layouts readable
/// (`utente`, `nonce`, `to_find`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub prev_hash: Option<String>,
    pub hash: String,
    #[serde(with = "iso_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub data: String,
    #[serde(default, alias = "utente")]
    pub author: Option<String>,
    /// Leading zeros the next mined block must produce.
    #[serde(default, alias = "nonce")]
    pub difficulty: u32,
    /// Zero prefix this block satisfied when it was mined ("" otherwise).
    #[serde(default, alias = "to_find")]
    pub target_pattern: String,
}

impl Block {
    /// Create the genesis block (first block in the chain).
    pub fn genesis() -> Self {
        Self {
            id: 0,
            prev_hash: None,
            hash: derive_hash(GENESIS_DATA),
            timestamp: Utc::now(),
            data: GENESIS_DATA.to_string(),
            author: None,
            difficulty: 0,
            target_pattern: String::new(),
        }
    }

    /// Create an authored block. Its hash covers `data` only.
    pub fn new(
        id: u64,
        prev_hash: Option<String>,
        author: String,
        data: String,
        difficulty: u32,
    ) -> Self {
        Self {
            id,
            prev_hash,
            hash: derive_hash(&data),
            timestamp: Utc::now(),
            data,
            author: Some(author),
            difficulty,
            target_pattern: String::new(),
        }
    }

    /// Create a block sealed by the mining engine with an already-found hash.
    pub fn mined(
        id: u64,
        prev_hash: String,
        hash: String,
        nonce: u64,
        difficulty: u32,
        target_pattern: String,
    ) -> Self {
        Self {
            id,
            prev_hash: Some(prev_hash),
            hash,
            timestamp: Utc::now(),
            data: format!("Block mined with nonce {nonce}"),
            author: Some(MINER_AUTHOR.to_string()),
            difficulty,
            target_pattern,
        }
    }
}

/// Hex-encoded SHA-256 of `data`. No other block field participates.
pub fn derive_hash(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// RFC 3339 on write; on read also accepts naive ISO-8601 instants (taken as UTC).
mod iso_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, NAIVE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}
