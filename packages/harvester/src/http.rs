//! HTTP transport for talking to catalogue endpoints.
//!
//! Requests are sent exactly once. A failed request surfaces as an error
//! and the caller decides whether to try again.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::config::HTTP_TIMEOUT_SECS;
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("csw-harvester/", env!("CARGO_PKG_VERSION"));

/// Moves request documents to a catalogue endpoint and returns response bodies.
pub trait Transport: Send + Sync {
    /// GET `url` with the given query parameters appended.
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String>;

    /// POST an XML document to `url`.
    fn post_xml(&self, url: &str, body: String) -> Result<String>;
}

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with timeout and user agent.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// [`Transport`] over a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_client()?,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let full = Url::parse_with_params(url, query).map_err(|e| HarvesterError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(url = %full, "GET");
        let response = self.client.get(full.as_str()).send()?;
        read_body(response, url)
    }

    fn post_xml(&self, url: &str, body: String) -> Result<String> {
        tracing::debug!(url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
            .send()?;
        read_body(response, url)
    }
}

fn read_body(response: reqwest::blocking::Response, url: &str) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = %status, url, "Catalogue returned an error status");
        return Err(HarvesterError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.text()?)
}
