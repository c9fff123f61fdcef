use std::time::Duration;

use async_trait::async_trait;
use pulse_api_types::{
    validate_campaigns, AudienceSegment, Campaign, ChannelPerformance, Collection, MetricsBundle,
    RevenuePoint, Validate,
};
use pulse_core::config::ApiConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::FetchError;
use crate::source::DataSource;

/// HTTP client for the analytics API.
///
/// Each collection is a single `GET` relative to the base URL. Non-2xx
/// responses become [`FetchError::Http`]; bodies that fail to parse or
/// validate become [`FetchError::Decode`].
#[derive(Debug, Clone)]
pub struct RemoteDataSource {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteDataSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn from_config(cfg: &ApiConfig) -> Result<Self, FetchError> {
        Self::new(
            cfg.base_url.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, collection: Collection) -> Result<T, FetchError> {
        let Some(path) = collection.endpoint() else {
            return Err(FetchError::Network(format!(
                "{collection} has no remote endpoint"
            )));
        };
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body
            };
            return Err(FetchError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Decode(format!("{collection}: {e}")))
    }

    async fn get_validated<T>(&self, collection: Collection) -> Result<T, FetchError>
    where
        T: DeserializeOwned + Validate,
    {
        let value: T = self.get_json(collection).await?;
        value
            .validate()
            .map_err(|e| FetchError::Decode(format!("{collection}: {e}")))?;
        Ok(value)
    }
}

#[async_trait]
impl DataSource for RemoteDataSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn revenue(&self) -> Result<Vec<RevenuePoint>, FetchError> {
        self.get_validated(Collection::Revenue).await
    }

    async fn channels(&self) -> Result<Vec<ChannelPerformance>, FetchError> {
        self.get_validated(Collection::Channels).await
    }

    async fn audience(&self) -> Result<Vec<AudienceSegment>, FetchError> {
        self.get_validated(Collection::Audience).await
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, FetchError> {
        let rows: Vec<Campaign> = self.get_json(Collection::Campaigns).await?;
        validate_campaigns(&rows)
            .map_err(|e| FetchError::Decode(format!("{}: {e}", Collection::Campaigns)))?;
        Ok(rows)
    }

    async fn metrics(&self) -> Result<MetricsBundle, FetchError> {
        self.get_validated(Collection::Metrics).await
    }
}
