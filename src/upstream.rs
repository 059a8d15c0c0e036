use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::UpstreamPolicy;
use crate::fetch_error::{FetchError, Operation};

/// HTTP client shared by the provider fetchers: one timeout per request and
/// exponential-backoff retries for transient failures.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    policy: UpstreamPolicy,
}

impl UpstreamClient {
    pub fn new(policy: UpstreamPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, policy })
    }

    #[instrument(skip(self, query), fields(operation = %operation))]
    pub async fn get_json<T, Q>(
        &self,
        operation: Operation,
        url: &str,
        query: &Q,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self
            .fetch_text(operation, || self.client.get(url).query(query))
            .await?;
        Self::decode(operation, &body)
    }

    #[instrument(skip(self, query, payload), fields(operation = %operation))]
    pub async fn post_json<T, Q, P>(
        &self,
        operation: Operation,
        url: &str,
        query: &Q,
        payload: &P,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        P: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(payload).map_err(|e| FetchError::schema(operation, e))?;
        let body = self
            .fetch_text(operation, || {
                self.client
                    .post(url)
                    .query(query)
                    .header(CONTENT_TYPE, "application/json")
                    .body(payload.clone())
            })
            .await?;
        Self::decode(operation, &body)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.policy.retry_delay)
            .with_max_delay(self.policy.retry_delay * 8)
            .with_factor(2.0)
            .with_max_times(self.policy.max_retries)
    }

    async fn fetch_text<F>(&self, operation: Operation, build: F) -> Result<String, FetchError>
    where
        F: Fn() -> RequestBuilder,
    {
        let build = &build;
        (move || async move { self.send_once(operation, build()).await })
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(FetchError::is_retryable)
            .notify(|err: &FetchError, delay: Duration| {
                warn!("{} (retrying in {:?}): {:?}", err, delay, err);
            })
            .await
    }

    async fn send_once(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<String, FetchError> {
        debug!("Sending {} request", operation);
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::transport(operation, e))?;

        let status = response.status();
        debug!("Received {} response with status: {}", operation, status);

        if !status.is_success() {
            warn!("{} request returned non-success status {}", operation, status);
            return Err(FetchError::status(operation, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::transport(operation, e))?;
        debug!("Retrieved {} body, size: {} bytes", operation, body.len());
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(operation: Operation, body: &str) -> Result<T, FetchError> {
        serde_json::from_str(body).map_err(|e| {
            warn!("{} response did not match schema: {}", operation, e);
            FetchError::schema(operation, e)
        })
    }
}

/// Joins a configured base URL and an endpoint path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_slashes() {
        assert_eq!(
            endpoint("https://api.example.com/", "/data/2.5/weather"),
            "https://api.example.com/data/2.5/weather"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:1234", "geo/1.0/direct"),
            "http://127.0.0.1:1234/geo/1.0/direct"
        );
    }
}
