//! Shared HTTP client for the REST gateways.

use super::market_data::DataUnavailableError;
use crate::common::RetryPolicy;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, DataUnavailableError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("traderoad/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// GET `url` and decode the body as JSON, retrying transient failures.
    pub async fn get_json(&self, url: &Url) -> Result<Value, DataUnavailableError> {
        let label = url.path().to_string();
        self.retry
            .run(&label, || self.get_once(url), DataUnavailableError::is_retryable)
            .await
            .map_err(|err| {
                warn!(
                    url = %url.path(),
                    attempts = err.attempts,
                    error = %err.last_error,
                    "market data request failed"
                );
                err.into_inner()
            })
    }

    async fn get_once(&self, url: &Url) -> Result<Value, DataUnavailableError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(DataUnavailableError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataUnavailableError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}
