//! Pinned HTTP client
//!
//! A thin wrapper around `reqwest::Client` whose connection-level address
//! lookup is forced through the [`DohResolver`] instead of system DNS.
//! Responses with a status other than 200 are classified as failures; the
//! response is dropped (closing its connection) before the error is
//! returned.
//!
//! IP-literal hosts bypass the resolver entirely, which keeps local test
//! servers reachable without DNS round-trips.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::app::resolver::DohResolver;
use crate::constants::{doh, http};
use crate::errors::{FetchError, FetchResult};

/// Configuration for the pinned HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// dns-json endpoint used for address resolution
    pub doh_endpoint: String,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            doh_endpoint: doh::ENDPOINT.to_string(),
            connect_timeout: http::CONNECT_TIMEOUT,
        }
    }
}

/// HTTP client pinned to DNS-over-HTTPS resolution
pub struct PinnedClient {
    http: Client,
    resolver: Arc<DohResolver>,
}

impl PinnedClient {
    /// Creates a client with the default configuration
    pub fn new() -> FetchResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// No total request timeout is set: downloads stream bodies of
    /// arbitrary size and must not be cut off mid-transfer.
    pub fn with_config(config: ClientConfig) -> FetchResult<Self> {
        let resolver = Arc::new(DohResolver::new(config.doh_endpoint)?);
        let http = Client::builder()
            .user_agent(http::USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .dns_resolver(resolver.clone())
            .build()?;

        Ok(Self { http, resolver })
    }

    /// Performs a GET and returns the raw response for streaming
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for any status other than 200; the
    /// response body is dropped before the error is raised.
    pub async fn get_response(&self, url: &Url) -> FetchResult<Response> {
        let response = self.http.get(url.as_str()).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            drop(response);
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.clone(),
            });
        }

        debug!("fetched {url}");
        Ok(response)
    }

    /// Fetches a URL and accumulates the full decoded body
    ///
    /// Suitable for bounded index pages, not for large binaries.
    pub async fn get_text(&self, url: &Url) -> FetchResult<String> {
        let response = self.get_response(url).await?;
        Ok(response.text().await?)
    }

    /// The resolver backing this client's connections
    pub fn resolver(&self) -> &DohResolver {
        &self.resolver
    }
}
