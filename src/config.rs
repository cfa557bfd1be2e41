use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Shared wallet list, used when a source has no list of its own
    #[serde(default)]
    pub wallets: Vec<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub debank: DebankConfig,
    #[serde(default)]
    pub hyperliquid: HyperliquidConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "postgres://localhost/walletsnap".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriterConfig {
    /// Rows per INSERT statement
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Default write mode: "append" or "upsert_snapshot"
    #[serde(default = "default_write_mode")]
    pub mode: String,
}

fn default_batch_size() -> usize {
    500
}

fn default_write_mode() -> String {
    "append".to_string()
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            mode: default_write_mode(),
        }
    }
}

/// Retry/backoff tuning for upstream requests
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts before giving up (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff (default: 1000ms)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum backoff delay (default: 16000ms)
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Per-request socket timeout (default: 30s)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_cap_ms() -> u64 {
    16000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetryConfig {
    /// Delay to sleep after a failed attempt (1-based), doubling up to the cap.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let delay = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(exp));
        Duration::from_millis(delay.min(self.backoff_cap_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebankConfig {
    #[serde(default = "default_debank_base_url")]
    pub base_url: String,
    /// DeBank Pro AccessKey (WALLETSNAP__DEBANK__API_KEY)
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_debank_table")]
    pub table: String,
    /// Wallets for this source; falls back to the shared list when empty
    #[serde(default)]
    pub wallets: Vec<String>,
}

fn default_debank_base_url() -> String {
    "https://pro-openapi.debank.com".to_string()
}

fn default_debank_table() -> String {
    "debank_protocols".to_string()
}

impl Default for DebankConfig {
    fn default() -> Self {
        Self {
            base_url: default_debank_base_url(),
            api_key: String::new(),
            table: default_debank_table(),
            wallets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HyperliquidConfig {
    #[serde(default = "default_hyperliquid_api_url")]
    pub api_url: String,
    #[serde(default = "default_hyperliquid_table")]
    pub table: String,
    /// Optional dot-path hint for equity inside the response JSON,
    /// e.g. "data.userAccountSummary.marginSummary.equity"
    #[serde(default)]
    pub equity_path: Option<String>,
    #[serde(default)]
    pub wallets: Vec<String>,
}

fn default_hyperliquid_api_url() -> String {
    "https://api.hyperliquid.xyz/info".to_string()
}

fn default_hyperliquid_table() -> String {
    "hyperliquid_state".to_string()
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            api_url: default_hyperliquid_api_url(),
            table: default_hyperliquid_table(),
            equity_path: None,
            wallets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific config (e.g. config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("WALLETSNAP_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (WALLETSNAP__DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("WALLETSNAP")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.url.is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if self.writer.batch_size == 0 {
            errors.push("writer.batch_size must be positive".to_string());
        }

        if !matches!(self.writer.mode.as_str(), "append" | "upsert_snapshot") {
            errors.push(format!(
                "writer.mode must be \"append\" or \"upsert_snapshot\", got \"{}\"",
                self.writer.mode
            ));
        }

        if self.retry.max_attempts == 0 {
            errors.push("retry.max_attempts must be at least 1".to_string());
        }

        if self.retry.backoff_cap_ms < self.retry.backoff_base_ms {
            errors.push("retry.backoff_cap_ms must be >= retry.backoff_base_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
