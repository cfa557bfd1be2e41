pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod services;

pub use adapters::{DebankClient, HyperliquidClient, PostgresStore};
pub use config::AppConfig;
pub use domain::{AccountSnapshot, ProtocolSnapshot, RunSummary, WriteMode};
pub use error::{Result, SnapError};
pub use services::SnapshotRunner;
