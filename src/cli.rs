use clap::{Parser, Subcommand};

use crate::domain::WriteMode;

/// Wallet portfolio snapshot collector
#[derive(Parser, Debug)]
#[command(name = "walletsnap")]
#[command(author, version, about = "Fetch wallet state and write history-preserving snapshots")]
pub struct Cli {
    /// Configuration directory
    #[arg(long, default_value = "config")]
    pub config_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Snapshot DeBank protocol positions for each wallet
    Debank {
        /// Comma-separated wallet addresses (overrides config)
        #[arg(long)]
        wallets: Option<String>,
        /// append (default) or upsert_snapshot
        #[arg(long)]
        mode: Option<WriteMode>,
    },

    /// Snapshot Hyperliquid clearinghouse state for each wallet
    Hyperliquid {
        /// Comma-separated wallet addresses (overrides config)
        #[arg(long)]
        wallets: Option<String>,
        /// append (default) or upsert_snapshot
        #[arg(long)]
        mode: Option<WriteMode>,
        /// Optional dot-path hint for equity inside the response JSON,
        /// e.g. data.userAccountSummary.marginSummary.equity
        #[arg(long)]
        equity_path: Option<String>,
    },

    /// Run database migrations
    Migrate,
}

/// Split a comma-separated wallet list, dropping empty fragments.
pub fn parse_wallet_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Wallet precedence: CLI flag, then the source's own config list, then the
/// shared top-level list.
pub fn resolve_wallets(
    cli_wallets: Option<&str>,
    source_wallets: &[String],
    shared_wallets: &[String],
) -> Vec<String> {
    if let Some(raw) = cli_wallets {
        return parse_wallet_list(raw);
    }
    if !source_wallets.is_empty() {
        return source_wallets.to_vec();
    }
    shared_wallets.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_list_trims_and_drops_empties() {
        assert_eq!(
            parse_wallet_list(" 0xA , 0xB ,, 0xC,"),
            vec!["0xA", "0xB", "0xC"]
        );
        assert!(parse_wallet_list("  ,  ").is_empty());
    }

    #[test]
    fn cli_wallets_take_precedence() {
        let source = vec!["0xSOURCE".to_string()];
        let shared = vec!["0xSHARED".to_string()];

        assert_eq!(
            resolve_wallets(Some("0xCLI"), &source, &shared),
            vec!["0xCLI"]
        );
        assert_eq!(resolve_wallets(None, &source, &shared), source);
        assert_eq!(resolve_wallets(None, &[], &shared), shared);
    }
}
