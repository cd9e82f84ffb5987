//! Reqwest-based HTTP transport to a license publisher.
//!
//! The publish request is POSTed as JSON; the body of the reply is the
//! encrypted response string.

use crate::config::ClientConfig;
use crate::protocol::{LicenseClient, PublishRequest, PublisherTransport};
use crate::update::FeedSource;
use crate::LicentiaError;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::time::Duration;
use tracing::debug;

fn build_client(timeout: Duration) -> Result<Client, LicentiaError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LicentiaError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

fn read_body(response: reqwest::blocking::Response, what: &str) -> Result<String, LicentiaError> {
    let status = response.status();
    if !status.is_success() {
        return Err(LicentiaError::Transport(format!(
            "{} returned HTTP {}",
            what,
            status.as_u16()
        )));
    }
    response
        .text()
        .map_err(|e| LicentiaError::Transport(format!("Failed to read body: {}", e)))
}

/// Publisher transport over HTTP.
pub struct HttpTransport {
    client: Client,
    url: String,
    user_agent: String,
}

impl HttpTransport {
    /// Transport for the publisher named in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, LicentiaError> {
        Ok(Self {
            client: build_client(config.request_timeout)?,
            url: config.publisher_url.to_string(),
            user_agent: build_user_agent(config),
        })
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LicentiaError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Publisher URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PublisherTransport for HttpTransport {
    fn publish(&self, request: &PublishRequest) -> Result<String, LicentiaError> {
        debug!(url = %self.url, product = %request.product, "POST publish request");
        let response = self
            .client
            .post(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/plain")
            .json(request)
            .send()
            .map_err(|e| LicentiaError::Transport(format!("Request failed: {}", e)))?;
        read_body(response, "Publisher")
    }
}

/// Release feed fetched over HTTP.
pub struct HttpFeed {
    client: Client,
    url: String,
    user_agent: String,
}

impl HttpFeed {
    /// Feed at `config.release_feed_url`.
    pub fn new(config: &ClientConfig) -> Result<Self, LicentiaError> {
        let url = config.release_feed_url.ok_or_else(|| {
            LicentiaError::ConfigError("release_feed_url is not configured".to_string())
        })?;
        Ok(Self {
            client: build_client(config.request_timeout)?,
            url: url.to_string(),
            user_agent: build_user_agent(config),
        })
    }
}

impl FeedSource for HttpFeed {
    fn fetch(&self) -> Result<String, LicentiaError> {
        debug!(url = %self.url, "GET release feed");
        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| LicentiaError::UpdateFeed(format!("Request failed: {}", e)))?;
        read_body(response, "Release feed").map_err(|e| LicentiaError::UpdateFeed(e.to_string()))
    }
}

impl LicenseClient<HttpTransport> {
    /// Validate `config` and build an HTTP client for its publisher.
    pub fn from_config(config: &ClientConfig) -> Result<Self, LicentiaError> {
        config.validate()?;
        LicenseClient::new(HttpTransport::new(config)?, config.publisher_public_key_xml)
    }
}

/// Build a User-Agent string from config.
///
/// Format: `<product>/licentia-<version> <app>`
/// Example: `acme-grid/licentia-0.1.0 gridview/2.1.0`
pub fn build_user_agent(config: &ClientConfig) -> String {
    format!(
        "{}/licentia-{} {}",
        config.user_agent_product,
        env!("CARGO_PKG_VERSION"),
        config.app_name
    )
}
