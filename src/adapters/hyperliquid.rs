//! Hyperliquid info-endpoint adapter.
//!
//! One POST per wallet asking for `clearinghouseState`; the response is a
//! single account-state document whose exact shape varies across API versions
//! (which is why metric extraction downstream is structural, not typed).

use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{HyperliquidConfig, RetryConfig};
use crate::error::Result;

const SOURCE: &str = "Hyperliquid";

#[derive(Clone)]
pub struct HyperliquidClient {
    http: Client,
    api_url: String,
    retry: RetryConfig,
}

impl HyperliquidClient {
    pub fn new(config: &HyperliquidConfig, retry: RetryConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("walletsnap/0.1")
            .timeout(retry.timeout())
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            retry,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetch the clearinghouse state document for one wallet.
    pub async fn fetch_clearinghouse_state(&self, address: &str) -> Result<Value> {
        debug!(address, "fetching Hyperliquid clearinghouse state");

        super::send_with_retry(SOURCE, &self.retry, || {
            self.http
                .post(&self.api_url)
                .header("Accept", "application/json")
                .json(&json!({"type": "clearinghouseState", "user": address}))
        })
        .await
    }
}
