use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use spi_core::config::SearchConfig;
use spi_core::market::existence::hits_confirm_product;
use spi_core::{ExistenceOracle, ExistenceQuery, ExternalServiceError, SearchHit};

const SERVICE: &str = "web search";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

/// Existence oracle backed by SerpApi's Google engine.
pub struct SerpApiOracle {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    num_results: u32,
}

impl SerpApiOracle {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        num_results: u32,
        timeout: Duration,
    ) -> Result<Self, ExternalServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ExternalServiceError::Request { service: SERVICE, message: error.to_string() })?;
        Ok(Self { http, api_key, base_url: base_url.into(), num_results })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, ExternalServiceError> {
        let api_key =
            config.api_key.clone().ok_or(ExternalServiceError::NotConfigured { service: SERVICE })?;
        Self::new(api_key, &config.base_url, config.num_results, config.timeout())
    }

    async fn search(&self, query_text: &str) -> Result<Vec<SearchHit>, ExternalServiceError> {
        let num = self.num_results.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("engine", "google"),
                ("q", query_text),
                ("api_key", self.api_key.expose_secret()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|error| request_error(error.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExternalServiceError::Request {
                service: SERVICE,
                message: format!("search endpoint returned {status}"),
            });
        }

        let body = response.text().await.map_err(|error| request_error(error.without_url()))?;
        decode_hits(&body)
    }
}

#[async_trait]
impl ExistenceOracle for SerpApiOracle {
    async fn check_exists(&self, query: &ExistenceQuery) -> Result<bool, ExternalServiceError> {
        let hits = self.search(&query.query_text).await?;
        let confirmed = hits_confirm_product(query, &hits);
        debug!(
            event_name = "advisor.search.completed",
            query = %query.query_text,
            hits = hits.len(),
            confirmed,
            "web search completed"
        );
        Ok(confirmed)
    }
}

fn request_error(error: reqwest::Error) -> ExternalServiceError {
    ExternalServiceError::Request { service: SERVICE, message: error.to_string() }
}

/// Organic results from a SerpApi response body. An `error` field in the
/// body is reported as a failed request even when the status was 200.
pub fn decode_hits(body: &str) -> Result<Vec<SearchHit>, ExternalServiceError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|error| ExternalServiceError::Decode { service: SERVICE, message: error.to_string() })?;

    match response.error {
        Some(message) if !message.contains("hasn't returned any results") => {
            Err(ExternalServiceError::Request { service: SERVICE, message })
        }
        _ => Ok(response.organic_results),
    }
}
