use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::SyncConfig;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const INITIAL_RETRY_DELAY_MS: u64 = 500;
const CLIENT_USER_AGENT: &str = concat!("feedloom/", env!("CARGO_PKG_VERSION"));

/// Retrieves raw feed content for a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Body returned by an AllOrigins-style relay
#[derive(Debug, Deserialize)]
struct RelayResponse {
    contents: Option<String>,
}

/// reqwest-backed fetcher with retry, proxy and relay support
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    relay_url: Option<Url>,
}

impl HttpFetcher {
    /// Create a new fetcher from the sync configuration
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Self::build_client(config.request_timeout_secs, &config.proxy_url)?;

        let relay_url = config
            .cors_proxy_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| Error::Config(format!("Invalid relay URL: {}", e)))?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
            relay_url,
        })
    }

    /// Build HTTP client with optional proxy
    fn build_client(timeout_secs: u64, proxy_url: &Option<String>) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(ref proxy) = proxy_url {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for feed fetching");
        }

        builder.build().map_err(Error::Http)
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.9,*/*;q=0.8"
            )
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers
    }

    /// URL actually requested for `url`, routed through the relay if configured
    pub fn request_url(&self, url: &str) -> String {
        match &self.relay_url {
            Some(relay) => relay_request_url(relay, url),
            None => url.to_string(),
        }
    }

    /// Fetch with retry and exponential backoff
    async fn fetch_with_retry(&self, url: &str) -> Result<Bytes> {
        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..self.max_retries {
            tracing::debug!("Fetch attempt {} for {}", attempt + 1, url);

            match self.client.get(url).headers(Self::build_headers()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        tracing::warn!(
                            "Received {} for {}, retrying after {}ms...",
                            status,
                            url,
                            delay_ms
                        );
                        last_error = Some(Error::Network(format!("HTTP {} for URL: {}", status, url)));
                    } else if !status.is_success() {
                        return Err(Error::Network(format!("HTTP {} for URL: {}", status, url)));
                    } else {
                        match response.bytes().await {
                            Ok(bytes) => return Ok(bytes),
                            Err(e) => {
                                tracing::warn!("Failed to read response body: {}", e);
                                last_error = Some(Error::Http(e));
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed for {} (attempt {}): {}",
                        url,
                        attempt + 1,
                        e
                    );
                    last_error = Some(Error::Http(e));
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Network(format!("Failed to fetch URL after {} retries: {}", self.max_retries, url))
        }))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let request_url = self.request_url(url);

        tracing::debug!("Fetching feed from: {}", request_url);

        let body = self.fetch_with_retry(&request_url).await?;
        ensure_content_size(body.len(), url)?;

        if self.relay_url.is_some() {
            return unwrap_relay_body(&body, url);
        }

        Ok(body)
    }
}

fn relay_request_url(relay: &Url, url: &str) -> String {
    let mut request = relay.clone();
    request
        .query_pairs_mut()
        .append_pair("disableCache", "true")
        .append_pair("url", url);
    request.to_string()
}

fn unwrap_relay_body(body: &[u8], url: &str) -> Result<Bytes> {
    let response: RelayResponse = serde_json::from_slice(body)?;
    response
        .contents
        .map(Bytes::from)
        .ok_or_else(|| Error::Network(format!("Relay returned no contents for URL: {}", url)))
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_FEED_BYTES {
        return Err(Error::Network(format!(
            "Feed too large ({} bytes) for URL: {}",
            size,
            url
        )));
    }
    Ok(())
}
