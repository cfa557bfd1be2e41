//! DeBank Pro REST adapter.
//!
//! One GET per wallet against `all_complex_protocol_list`, authenticated with
//! the AccessKey header. The response is a JSON array of protocol entries.

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::{DebankConfig, RetryConfig};
use crate::error::{Result, SnapError};

const PROTOCOL_LIST_PATH: &str = "/v1/user/all_complex_protocol_list";

const SOURCE: &str = "DeBank";

#[derive(Clone, Debug)]
pub struct DebankClient {
    http: Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

impl DebankClient {
    pub fn new(config: &DebankConfig, retry: RetryConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(SnapError::InvalidConfig(
                "debank.api_key is required (WALLETSNAP__DEBANK__API_KEY)".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent("walletsnap/0.1")
            .timeout(retry.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all protocol positions for one wallet. An empty or `null` body
    /// normalizes to an empty list.
    pub async fn fetch_protocols(&self, address: &str) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, PROTOCOL_LIST_PATH);
        debug!(address, "fetching DeBank protocol list");

        let body = super::send_with_retry(SOURCE, &self.retry, || {
            self.http
                .get(&url)
                .query(&[("id", address)])
                .header("Accept", "application/json")
                .header("AccessKey", &self.api_key)
        })
        .await?;

        match body {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(SnapError::Fetch {
                source_api: SOURCE,
                status: 200,
                body: format!("expected a JSON array of protocol entries, got: {other}"),
            }),
        }
    }
}
