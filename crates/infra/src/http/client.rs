//! Outbound HTTP client shared by delivery adapters.

use std::time::Duration;

use bulwark_domain::constants::DEFAULT_WEBHOOK_TIMEOUT_SECS;
use bulwark_domain::BulwarkError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client for outbound delivery, one attempt per request.
///
/// Retrying is left to the recovery layer. Any response is returned as-is so
/// callers decide what a non-2xx status means.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, BulwarkError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Build and execute `builder`, mapping transport failures to [`BulwarkError`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, BulwarkError> {
        let request = builder.build().map_err(|err| BulwarkError::from(InfraError::from(err)))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, %url, error = %err, "HTTP request failed");
            BulwarkError::from(InfraError::from(err))
        })?;
        debug!(%method, %url, status = %response.status(), "received HTTP response");
        Ok(response)
    }
}

/// Parse `(name, value)` pairs into a header map, rejecting invalid ones.
pub fn header_map(pairs: &[(String, String)]) -> Result<HeaderMap, BulwarkError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| BulwarkError::Config(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| BulwarkError::Config(format!("invalid value for header '{name}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            user_agent: Some(concat!("bulwark/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    /// Whole-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` sent with every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Headers sent with every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, BulwarkError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| BulwarkError::from(InfraError::from(err)))?;
        Ok(HttpClient { client })
    }
}
