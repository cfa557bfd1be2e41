//! Mapping of fetch results into snapshot rows.
//!
//! Every input entry yields exactly one row, even when identifiers or metrics
//! are missing; the untouched source JSON always rides along in `raw`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{AccountSnapshot, ProtocolSnapshot, CLEARINGHOUSE_STATE};
use crate::extract::Extracted;

/// Identifier fields tried in order for a protocol entry
const PROTOCOL_ID_FIELDS: &[&str] = &["id", "name"];

/// Chain fields tried in order for a protocol entry
const CHAIN_FIELDS: &[&str] = &["chain", "portfolio_chain"];

/// Sentinel identifier for entries that carry none of the known id fields
const UNKNOWN_ID: &str = "unknown";

/// Build one row per protocol entry. Entries are never dropped: a missing
/// identifier becomes the "unknown" sentinel, a non-numeric portfolio value
/// becomes NULL.
pub fn protocol_rows(
    address: &str,
    items: &[Value],
    fetched_at: DateTime<Utc>,
) -> Vec<ProtocolSnapshot> {
    let address = address.to_lowercase();

    items
        .iter()
        .map(|item| ProtocolSnapshot {
            address: address.clone(),
            protocol_id: protocol_identifier(item),
            chain: first_string(item, CHAIN_FIELDS),
            portfolio_usd: item.get("portfolio_usd_value").and_then(Value::as_f64),
            raw: item.clone(),
            fetched_at,
        })
        .collect()
}

/// Build the single account-state row for one wallet.
pub fn account_row(
    address: &str,
    raw: Value,
    extracted: &Extracted,
    fetched_at: DateTime<Utc>,
) -> AccountSnapshot {
    AccountSnapshot {
        address: address.to_lowercase(),
        snapshot_type: CLEARINGHOUSE_STATE.to_string(),
        equity_usd: extracted.equity,
        positions_count: extracted.positions.map(|n| n as i64),
        raw,
        fetched_at,
    }
}

fn protocol_identifier(item: &Value) -> String {
    for field in PROTOCOL_ID_FIELDS {
        match item.get(field) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Null) | Some(Value::String(_)) | None => continue,
            // Numeric ids occur in older payloads; stringify them
            Some(other) => return other.to_string(),
        }
    }
    UNKNOWN_ID.to_string()
}

fn first_string(item: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|f| {
            item.get(*f)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .map(str::to_string)
}
