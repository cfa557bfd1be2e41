//! Per-run orchestration: one snapshot timestamp, a sequential loop over
//! wallets, and per-address failure isolation for fetch errors.

use chrono::{DateTime, Timelike, Utc};
use tracing::{info, warn};

use crate::adapters::{DebankClient, HyperliquidClient, PostgresStore};
use crate::domain::{AddressFailure, RunSummary, WriteMode};
use crate::error::{Result, SnapError};
use crate::extract::{self, EQUITY_CANDIDATES};
use crate::normalize;

pub struct SnapshotRunner {
    store: PostgresStore,
    mode: WriteMode,
}

impl SnapshotRunner {
    pub fn new(store: PostgresStore, mode: WriteMode) -> Self {
        Self { store, mode }
    }

    /// Snapshot DeBank protocol positions for each wallet. A fetch failure is
    /// fatal for its own address only; write failures abort the run since they
    /// would recur for every remaining address.
    pub async fn run_debank(
        &self,
        client: &DebankClient,
        table: &str,
        wallets: &[String],
    ) -> Result<RunSummary> {
        require_wallets(wallets)?;

        // One run = one timestamp, captured before any fetch begins
        let fetched_at = run_timestamp();
        let mut summary = RunSummary::new(fetched_at);

        for address in wallets {
            info!(%address, "fetching DeBank protocols");
            let items = match client.fetch_protocols(address).await {
                Ok(items) => items,
                Err(err) => {
                    warn!(%address, error = %err, "skipping address after fetch failure");
                    summary.failures.push(AddressFailure {
                        address: address.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let rows = normalize::protocol_rows(address, &items, fetched_at);
            self.store.write_protocols(table, &rows, self.mode).await?;

            info!(%address, rows = rows.len(), mode = %self.mode, "wrote protocol snapshot");
            summary.addresses_ok += 1;
            summary.rows_written += rows.len();
        }

        Ok(summary)
    }

    /// Snapshot Hyperliquid clearinghouse state for each wallet.
    pub async fn run_hyperliquid(
        &self,
        client: &HyperliquidClient,
        table: &str,
        wallets: &[String],
        equity_path: Option<&str>,
    ) -> Result<RunSummary> {
        require_wallets(wallets)?;

        let fetched_at = run_timestamp();
        let mut summary = RunSummary::new(fetched_at);

        for address in wallets {
            info!(%address, "fetching Hyperliquid clearinghouse state");
            let raw = match client.fetch_clearinghouse_state(address).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%address, error = %err, "skipping address after fetch failure");
                    summary.failures.push(AddressFailure {
                        address: address.clone(),
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let extracted = extract::extract_metrics(&raw, equity_path, EQUITY_CANDIDATES);
            match (extracted.equity, extracted.path.as_ref()) {
                (Some(equity), Some(path)) => {
                    info!(%address, equity, path = %path, positions = ?extracted.positions, "extracted metrics")
                }
                _ => info!(%address, positions = ?extracted.positions, "no equity field found"),
            }

            let row = normalize::account_row(address, raw, &extracted, fetched_at);
            self.store
                .write_accounts(table, std::slice::from_ref(&row), self.mode)
                .await?;

            info!(%address, mode = %self.mode, "wrote account snapshot");
            summary.addresses_ok += 1;
            summary.rows_written += 1;
        }

        Ok(summary)
    }
}

fn require_wallets(wallets: &[String]) -> Result<()> {
    if wallets.is_empty() {
        return Err(SnapError::InvalidConfig(
            "no wallets provided; use --wallets or set a wallets list in the config".to_string(),
        ));
    }
    Ok(())
}

/// Current UTC time truncated to whole seconds, shared by every row of a run.
fn run_timestamp() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(0).unwrap_or(now)
}
