// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport built on `reqwest`.

use std::time::Duration;

use reqwest::{Client, Method};

use crate::error::TransportError;
use crate::protocol::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Substitution};

/// HTTP client executing configured device requests.
///
/// One client is shared by every channel of an accessory; `reqwest` pools
/// connections underneath.
///
/// # Examples
///
/// ```no_run
/// use http_lightbulb::protocol::{HttpClient, HttpRequest, HttpTransport, Substitution};
///
/// # async fn example() -> Result<(), http_lightbulb::error::TransportError> {
/// let client = HttpClient::new()?;
/// let request = HttpRequest::get("http://192.168.1.100/brightness?value=%s");
/// let response = client.request(&request, &[Substitution::primary("80")]).await?;
/// assert!(response.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        HttpClientBuilder::new().build()
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

impl HttpTransport for HttpClient {
    async fn request(
        &self,
        request: &HttpRequest,
        substitutions: &[Substitution],
    ) -> Result<HttpResponse, TransportError> {
        let url = request.render_url(substitutions);
        let url = reqwest::Url::parse(&url)
            .map_err(|e| TransportError::InvalidRequest(format!("{url}: {e}")))?;

        tracing::debug!(method = %request.method(), url = %url, "Sending HTTP request");

        let mut builder = self.client.request(reqwest_method(request.method()), url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.render_body(substitutions) {
            builder = builder.body(body);
        }
        if let Some(credentials) = request.credentials() {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = builder.send().await.map_err(TransportError::Http)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(TransportError::Http)?;

        tracing::debug!(status, body = %body, "Received HTTP response");

        Ok(HttpResponse::new(status, body))
    }
}

/// Builder for creating an HTTP client with custom configuration.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl HttpClientBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the `User-Agent` header sent with every request.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns error if client creation fails.
    pub fn build(self) -> Result<HttpClient, TransportError> {
        let timeout = self.timeout.unwrap_or(HttpClient::DEFAULT_TIMEOUT);
        let user_agent = self.user_agent.unwrap_or_else(|| {
            format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        });

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::Http)?;

        Ok(HttpClient { client, timeout })
    }
}
