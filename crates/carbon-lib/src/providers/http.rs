//! Shared HTTP plumbing for the live adapters

use super::ProviderError;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Longest response body kept in a status error
const MAX_ERROR_BODY: usize = 256;

/// Build a client that enforces `timeout` on every request
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("carbon-lib/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Parse a base URL so that relative joins append rather than replace
pub(crate) fn parse_base(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid provider URL: {}", base_url))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Join a relative path onto a base URL
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ProviderError> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Send a request and decode a JSON body, failing on any non-2xx status
pub(crate) async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Malformed(e.to_string()))
}
