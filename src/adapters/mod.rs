pub mod debank;
pub mod hyperliquid;
pub mod postgres;

pub use debank::DebankClient;
pub use hyperliquid::HyperliquidClient;
pub use postgres::PostgresStore;

use crate::config::RetryConfig;
use crate::error::{Result, SnapError};
use serde_json::Value;
use tracing::{debug, warn};

/// Send a request, retrying rate-limit and server-side failures with
/// exponential backoff. Any other non-2xx status fails immediately with the
/// response body attached; a 2xx body that is not valid JSON is also a fetch
/// error. The closure rebuilds the request for each attempt.
pub(crate) async fn send_with_retry(
    source_api: &'static str,
    retry: &RetryConfig,
    build: impl Fn() -> reqwest::RequestBuilder,
) -> Result<Value> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;

        let response = build().send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| SnapError::Fetch {
                source_api,
                status: status.as_u16(),
                body: format!("JSON parse error: {e}; body={}", truncate(&body, 500)),
            });
        }

        let retryable = status.as_u16() == 429 || status.is_server_error();
        if !retryable {
            return Err(SnapError::Fetch {
                source_api,
                status: status.as_u16(),
                body,
            });
        }

        if attempt >= retry.max_attempts {
            return Err(SnapError::FetchExhausted {
                source_api,
                attempts: attempt,
                status: status.as_u16(),
                body,
            });
        }

        let delay = retry.backoff_after(attempt);
        warn!(
            source = source_api,
            status = status.as_u16(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "transient upstream failure, backing off"
        );
        tokio::time::sleep(delay).await;
        debug!(source = source_api, attempt = attempt + 1, "retrying");
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
