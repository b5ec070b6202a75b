//! API client for communicating with the carbon agent

use anyhow::{Context, Result};
use carbon_lib::models::AdvisoryOutcome;
use carbon_lib::refresh::RefreshOutcome;
use carbon_lib::responses::{ErrorResponse, EstimateResponse, ForecastResponse, RegionsResponse, SummaryResponse};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the carbon agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Send a request and decode the JSON body, surfacing the agent's error message
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path)?;
        self.send(self.client.get(url).query(query)).await
    }

    /// Make a POST request without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.send(self.client.post(url)).await
    }

    pub async fn regions(&self) -> Result<RegionsResponse> {
        self.get("api/v1/regions", &[]).await
    }

    pub async fn summary(&self) -> Result<SummaryResponse> {
        self.get("api/v1/summary", &[]).await
    }

    pub async fn forecast(&self) -> Result<ForecastResponse> {
        self.get("api/v1/forecast", &[]).await
    }

    pub async fn advisory(&self, region: Option<&str>) -> Result<AdvisoryOutcome> {
        let query: Vec<_> = region.map(|r| ("region", r.to_string())).into_iter().collect();
        self.get("api/v1/advisory", &query).await
    }

    pub async fn estimate(&self, query: &[(&str, String)]) -> Result<EstimateResponse> {
        self.get("api/v1/estimate", query).await
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.post("api/v1/refresh").await
    }
}
