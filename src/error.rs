use thiserror::Error;

/// Main error type for the snapshot collector
#[derive(Error, Debug)]
pub enum SnapError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_api} API error {status}: {body}")]
    Fetch {
        source_api: &'static str,
        status: u16,
        body: String,
    },

    #[error("{source_api} API failed after {attempts} attempts: {status} {body}")]
    FetchExhausted {
        source_api: &'static str,
        attempts: u32,
        status: u16,
        body: String,
    },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Write-time schema errors
    #[error(
        "unique constraint `{constraint}` on ({columns}) omits fetched_at, so history \
         cannot be retained. Drop the constraint, or keep it only as a UNIQUE index \
         that includes fetched_at and use --mode upsert_snapshot"
    )]
    SchemaMismatch { constraint: String, columns: String },

    #[error("snapshot run failed for all {0} addresses")]
    RunFailed(usize),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for SnapError
pub type Result<T> = std::result::Result<T, SnapError>;
