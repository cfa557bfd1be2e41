//! Snapshot row types shared by the normalizer, writer, and runner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Durability mode for snapshot writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Pure insert; duplicate natural keys across runs are intentional history
    Append,
    /// Insert-or-replace on (address, snapshot key, fetched_at)
    UpsertSnapshot,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Append => "append",
            WriteMode::UpsertSnapshot => "upsert_snapshot",
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(WriteMode::Append),
            "upsert_snapshot" | "upsert-snapshot" => Ok(WriteMode::UpsertSnapshot),
            other => Err(format!(
                "unknown write mode \"{other}\" (expected \"append\" or \"upsert_snapshot\")"
            )),
        }
    }
}

/// One protocol position entry for one wallet, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolSnapshot {
    pub address: String,
    pub protocol_id: String,
    pub chain: Option<String>,
    pub portfolio_usd: Option<f64>,
    /// Untouched source fragment, kept for re-extraction without re-fetching
    pub raw: Value,
    pub fetched_at: DateTime<Utc>,
}

/// Snapshot type tag for Hyperliquid clearinghouse state rows
pub const CLEARINGHOUSE_STATE: &str = "clearinghouseState";

/// One account-state document for one wallet, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub address: String,
    pub snapshot_type: String,
    pub equity_usd: Option<f64>,
    pub positions_count: Option<i64>,
    pub raw: Value,
    pub fetched_at: DateTime<Utc>,
}

/// Per-address failure recorded by the runner without aborting the run
#[derive(Debug, Clone)]
pub struct AddressFailure {
    pub address: String,
    pub error: String,
}

/// Outcome of one orchestrator run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Snapshot timestamp shared by every row of the run
    pub fetched_at: DateTime<Utc>,
    pub addresses_ok: usize,
    pub rows_written: usize,
    pub failures: Vec<AddressFailure>,
}

impl RunSummary {
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            addresses_ok: 0,
            rows_written: 0,
            failures: Vec::new(),
        }
    }

    /// True when at least one address was attempted and none succeeded
    pub fn all_failed(&self) -> bool {
        self.addresses_ok == 0 && !self.failures.is_empty()
    }
}
