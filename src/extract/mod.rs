//! Schema-agnostic metric extraction over arbitrary JSON documents.
//!
//! Upstream APIs rename and re-nest their numeric fields across versions, so
//! extraction never assumes a fixed shape: an optional dot-path hint is tried
//! first, then a breadth-first search over the document for candidate field
//! names. "Not found" is a normal outcome, never an error.

use serde_json::Value;
use std::collections::{HashSet, VecDeque};

/// Field names that typically carry account equity, tried case-insensitively
pub const EQUITY_CANDIDATES: &[&str] = &[
    "accountValue",
    "equity",
    "equityUsd",
    "equity_usd",
    "account_value",
    "netLiq",
    "net_liq",
];

/// Keys whose value is a collection of open positions
const POSITION_COLLECTIONS: &[&str] = &[
    "assetpositions",
    "perppositions",
    "positions",
    "openpositions",
];

/// One step into a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of an extracted value, e.g. `marginSummary.equity` or `items[2].value`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn from_keys<I: IntoIterator<Item = S>, S: Into<String>>(keys: I) -> Self {
        Self(keys.into_iter().map(|k| PathSegment::Key(k.into())).collect())
    }

    fn child_key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    fn child_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{k}")?;
                }
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// Coerce a JSON value to a number: numbers pass through, strings parse as
/// floats after trimming. Everything else does not coerce.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Resolve a dot-separated key path against the document. Every segment must
/// be an object key and the terminal value must coerce; otherwise `None`, which
/// callers treat as a fallback trigger rather than an error.
pub fn resolve_hint(doc: &Value, hint: &str) -> Option<(f64, JsonPath)> {
    let mut node = doc;
    let mut keys = Vec::new();
    for segment in hint.split('.') {
        node = node.as_object()?.get(segment)?;
        keys.push(segment);
    }
    let num = coerce_f64(node)?;
    Some((num, JsonPath::from_keys(keys)))
}

/// Breadth-first search for the first coercible value under a candidate name.
///
/// At each object node the node's own keys are scanned (case-insensitively, in
/// key order) before any child is enqueued, so a shallower match always wins
/// over a deeper one with the same name.
pub fn find_metric(doc: &Value, candidates: &[&str]) -> Option<(f64, JsonPath)> {
    let wanted: HashSet<String> = candidates.iter().map(|n| n.to_lowercase()).collect();

    let mut queue: VecDeque<(&Value, JsonPath)> = VecDeque::new();
    queue.push_back((doc, JsonPath::default()));

    while let Some((node, path)) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if wanted.contains(&key.to_lowercase()) {
                        if let Some(num) = coerce_f64(value) {
                            return Some((num, path.child_key(key)));
                        }
                    }
                }
                for (key, value) in map {
                    if value.is_object() || value.is_array() {
                        queue.push_back((value, path.child_key(key)));
                    }
                }
            }
            Value::Array(items) => {
                for (index, value) in items.iter().enumerate() {
                    if value.is_object() || value.is_array() {
                        queue.push_back((value, path.child_index(index)));
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Breadth-first search for a position collection; returns its element count
/// (array length, or key count for an object). Independent of the numeric
/// search and shares no state with it.
pub fn count_positions(doc: &Value) -> Option<usize> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(doc);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                for (key, value) in map {
                    if POSITION_COLLECTIONS.contains(&key.to_lowercase().as_str()) {
                        match value {
                            Value::Array(items) => return Some(items.len()),
                            Value::Object(inner) => return Some(inner.len()),
                            _ => {}
                        }
                    }
                    if value.is_object() || value.is_array() {
                        queue.push_back(value);
                    }
                }
            }
            Value::Array(items) => {
                for value in items {
                    if value.is_object() || value.is_array() {
                        queue.push_back(value);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Metrics pulled out of one account-state document
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub equity: Option<f64>,
    pub positions: Option<usize>,
    /// Where the equity value was found, for diagnostics
    pub path: Option<JsonPath>,
}

/// Extract equity and position count from an account-state document.
///
/// The hint path, when provided and resolvable, takes precedence over the
/// structural search; hint failure silently falls back.
pub fn extract_metrics(doc: &Value, hint: Option<&str>, candidates: &[&str]) -> Extracted {
    let positions = count_positions(doc);

    if let Some(hint) = hint.filter(|h| !h.is_empty()) {
        if let Some((equity, path)) = resolve_hint(doc, hint) {
            return Extracted {
                equity: Some(equity),
                positions,
                path: Some(path),
            };
        }
    }

    match find_metric(doc, candidates) {
        Some((equity, path)) => Extracted {
            equity: Some(equity),
            positions,
            path: Some(path),
        },
        None => Extracted {
            equity: None,
            positions,
            path: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_numbers_and_numeric_strings() {
        assert_eq!(coerce_f64(&json!(42)), Some(42.0));
        assert_eq!(coerce_f64(&json!(-1.5)), Some(-1.5));
        assert_eq!(coerce_f64(&json!("  1234.5 ")), Some(1234.5));
        assert_eq!(coerce_f64(&json!("not a number")), None);
        assert_eq!(coerce_f64(&json!(true)), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!([1.0])), None);
    }

    #[test]
    fn finds_equity_inside_margin_summary() {
        let doc = json!({"marginSummary": {"equity": "1234.5"}});
        let (value, path) = find_metric(&doc, EQUITY_CANDIDATES).unwrap();
        assert_eq!(value, 1234.5);
        assert_eq!(path.to_string(), "marginSummary.equity");
    }

    #[test]
    fn own_level_match_beats_deeper_same_named_field() {
        let doc = json!({
            "nested": {"equity": "999.0"},
            "equity": 10.0,
        });
        let (value, path) = find_metric(&doc, EQUITY_CANDIDATES).unwrap();
        assert_eq!(value, 10.0);
        assert_eq!(path.to_string(), "equity");
    }

    #[test]
    fn non_coercible_own_key_does_not_shadow_deeper_match() {
        let doc = json!({
            "equity": {"currency": "USD"},
            "summary": {"equity": 55.5},
        });
        let (value, path) = find_metric(&doc, EQUITY_CANDIDATES).unwrap();
        assert_eq!(value, 55.5);
        assert_eq!(path.to_string(), "summary.equity");
    }

    #[test]
    fn candidate_match_is_case_insensitive() {
        let doc = json!({"ACCOUNTVALUE": "77"});
        let (value, path) = find_metric(&doc, EQUITY_CANDIDATES).unwrap();
        assert_eq!(value, 77.0);
        assert_eq!(path.to_string(), "ACCOUNTVALUE");
    }

    #[test]
    fn searches_through_arrays() {
        let doc = json!({"accounts": [{"meta": {}}, {"netLiq": 3.25}]});
        let (value, path) = find_metric(&doc, EQUITY_CANDIDATES).unwrap();
        assert_eq!(value, 3.25);
        assert_eq!(path.to_string(), "accounts[1].netLiq");
    }

    #[test]
    fn missing_candidate_is_absent_not_error() {
        let doc = json!({"a": {"b": [{"c": "text"}]}, "d": null});
        assert!(find_metric(&doc, EQUITY_CANDIDATES).is_none());
        assert!(count_positions(&doc).is_none());
    }

    #[test]
    fn counts_asset_positions_array() {
        let doc = json!({"assetPositions": [{}, {}, {}]});
        assert_eq!(count_positions(&doc), Some(3));
    }

    #[test]
    fn counts_position_mapping_by_keys() {
        let doc = json!({"state": {"openPositions": {"BTC": {}, "ETH": {}}}});
        assert_eq!(count_positions(&doc), Some(2));
    }

    #[test]
    fn scalar_valued_position_key_is_skipped() {
        let doc = json!({"positions": 5, "inner": {"assetPositions": [{}]}});
        assert_eq!(count_positions(&doc), Some(1));
    }

    #[test]
    fn hint_path_wins_over_candidates_elsewhere() {
        let doc = json!({
            "equity": 1.0,
            "data": {"marginSummary": {"equity": 2.0}},
        });
        let extracted = extract_metrics(&doc, Some("data.marginSummary.equity"), EQUITY_CANDIDATES);
        assert_eq!(extracted.equity, Some(2.0));
        assert_eq!(
            extracted.path.unwrap(),
            JsonPath::from_keys(["data", "marginSummary", "equity"])
        );
    }

    #[test]
    fn unresolvable_hint_falls_back_to_search() {
        let doc = json!({"marginSummary": {"equity": 42.0}});
        let extracted = extract_metrics(&doc, Some("data.missing.equity"), EQUITY_CANDIDATES);
        assert_eq!(extracted.equity, Some(42.0));
        assert_eq!(extracted.path.unwrap().to_string(), "marginSummary.equity");
    }

    #[test]
    fn hint_to_non_coercible_leaf_falls_back() {
        let doc = json!({"summary": {"equity": {"nested": true}}, "netLiq": "8"});
        let extracted = extract_metrics(&doc, Some("summary.equity"), EQUITY_CANDIDATES);
        assert_eq!(extracted.equity, Some(8.0));
        assert_eq!(extracted.path.unwrap().to_string(), "netLiq");
    }

    #[test]
    fn extracts_both_metrics_from_clearinghouse_shape() {
        let doc = json!({
            "marginSummary": {"accountValue": "2500.75"},
            "assetPositions": [{"coin": "BTC"}, {"coin": "ETH"}],
        });
        let extracted = extract_metrics(&doc, None, EQUITY_CANDIDATES);
        assert_eq!(extracted.equity, Some(2500.75));
        assert_eq!(extracted.positions, Some(2));
    }
}
