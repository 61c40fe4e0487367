// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports for talking to the device.
//!
//! The accessory only sees two small traits: [`HttpTransport`] performs one
//! templated request and [`MqttTransport`] publishes one payload. The
//! concrete clients live behind the `http` and `mqtt` features.
//!
//! # Protocols
//!
//! - [`HttpClient`]: `reqwest`-based request execution with token substitution
//! - [`MqttClient`]: `rumqttc`-based publish/subscribe with inbound forwarding
//! - [`NoBroker`]: placeholder transport for devices without MQTT

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mqtt")]
mod mqtt;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

#[cfg(feature = "http")]
pub use http::{HttpClient, HttpClientBuilder};
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttClient, MqttClientBuilder};

use crate::error::TransportError;
use crate::types::Characteristic;

// ============================================================================
// HTTP request descriptors
// ============================================================================

/// HTTP method of a configured request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(s.to_string()),
        }
    }
}

/// HTTP basic authentication credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

/// A configured HTTP request whose URL and body may carry substitution
/// tokens.
///
/// # Examples
///
/// ```
/// use http_lightbulb::protocol::{HttpMethod, HttpRequest};
///
/// let request = HttpRequest::get("http://bulb.local/set?b=%s")
///     .with_method(HttpMethod::Post)
///     .with_body("{\"brightness\":%s}")
///     .with_header("Content-Type", "application/json");
/// assert_eq!(request.method(), HttpMethod::Post);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    url: String,
    method: HttpMethod,
    body: Option<String>,
    headers: Vec<(String, String)>,
    credentials: Option<Credentials>,
}

impl HttpRequest {
    /// Creates a `GET` request with no body.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            body: None,
            headers: Vec::new(),
            credentials: None,
        }
    }

    /// Sets the method.
    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the body template.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets basic authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets credentials only if the request has none of its own.
    #[must_use]
    pub fn or_credentials(mut self, credentials: Option<&Credentials>) -> Self {
        if self.credentials.is_none() {
            self.credentials = credentials.cloned();
        }
        self
    }

    /// Returns the URL template.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the body template, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the credentials, if any.
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the URL with all substitutions applied.
    #[must_use]
    pub fn render_url(&self, substitutions: &[Substitution]) -> String {
        substitute(&self.url, substitutions)
    }

    /// Returns the body with all substitutions applied.
    #[must_use]
    pub fn render_body(&self, substitutions: &[Substitution]) -> Option<String> {
        self.body.as_deref().map(|b| substitute(b, substitutions))
    }
}

/// One token replacement for a request template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    token: &'static str,
    value: String,
}

impl Substitution {
    /// The token carrying the value being set.
    pub const PRIMARY: &'static str = "%s";

    /// Creates a replacement of `token` by `value`.
    #[must_use]
    pub fn new(token: &'static str, value: impl Into<String>) -> Self {
        Self {
            token,
            value: value.into(),
        }
    }

    /// Creates a replacement of the primary `%s` token.
    #[must_use]
    pub fn primary(value: impl Into<String>) -> Self {
        Self::new(Self::PRIMARY, value)
    }

    /// Returns the token.
    #[must_use]
    pub const fn token(&self) -> &'static str {
        self.token
    }

    /// Returns the replacement value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Applies substitutions to a template.
///
/// Named tokens are replaced before `%s`, longest first, so `%s` never eats
/// the prefix of `%saturation`. Every occurrence of a token is replaced.
///
/// # Examples
///
/// ```
/// use http_lightbulb::protocol::{Substitution, substitute};
///
/// let out = substitute(
///     "/set?v=%s&s=%saturation",
///     &[Substitution::primary("10"), Substitution::new("%saturation", "80")],
/// );
/// assert_eq!(out, "/set?v=10&s=80");
/// ```
#[must_use]
pub fn substitute(template: &str, substitutions: &[Substitution]) -> String {
    let mut ordered: Vec<&Substitution> = substitutions.iter().collect();
    ordered.sort_by_key(|s| std::cmp::Reverse(s.token.len()));

    ordered
        .into_iter()
        .fold(template.to_string(), |acc, s| acc.replace(s.token, &s.value))
}

/// Status and body of a completed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the response body as text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Turns a non-2xx response into [`TransportError::Status`].
    ///
    /// # Errors
    ///
    /// Returns the status error for any non-2xx status.
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Performs templated HTTP requests.
pub trait HttpTransport: Send + Sync {
    /// Renders `request` with `substitutions` and performs it.
    ///
    /// Any status is returned as a response; only failures to complete the
    /// exchange are errors.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request cannot be built or sent.
    fn request(
        &self,
        request: &HttpRequest,
        substitutions: &[Substitution],
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

// ============================================================================
// MQTT descriptors
// ============================================================================

/// An MQTT topic with its delivery options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttTopic {
    topic: String,
    qos: u8,
    retain: bool,
}

impl MqttTopic {
    /// Creates a topic with QoS 0 and no retain flag.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            qos: 0,
            retain: false,
        }
    }

    /// Sets the QoS level (0, 1 or 2; higher values are capped at 2).
    #[must_use]
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos.min(2);
        self
    }

    /// Sets the retain flag.
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Returns the topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the QoS level.
    #[must_use]
    pub const fn qos(&self) -> u8 {
        self.qos
    }

    /// Returns the retain flag.
    #[must_use]
    pub const fn retain(&self) -> bool {
        self.retain
    }
}

/// Publish and subscribe topics of one MQTT-driven channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttTopics {
    /// Topic values are published to.
    pub set: MqttTopic,
    /// Topic the device reports its state on.
    pub get: MqttTopic,
}

/// A message received on a subscribed get-topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The characteristic the topic is bound to.
    pub characteristic: Characteristic,
    /// The raw payload, in device-native units.
    pub payload: String,
}

/// Publishes values to MQTT topics.
pub trait MqttTransport: Send + Sync {
    /// Publishes `payload` to `topic`, resolving once the client accepted it.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the message cannot be queued.
    fn publish(
        &self,
        topic: &MqttTopic,
        payload: String,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Transport for devices without an MQTT broker.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBroker;

impl MqttTransport for NoBroker {
    async fn publish(&self, topic: &MqttTopic, _payload: String) -> Result<(), TransportError> {
        tracing::warn!(topic = %topic.topic(), "No MQTT broker configured");
        Err(TransportError::NotConnected)
    }
}

impl<T: MqttTransport> MqttTransport for Option<T> {
    async fn publish(&self, topic: &MqttTopic, payload: String) -> Result<(), TransportError> {
        match self {
            Some(transport) => transport.publish(topic, payload).await,
            None => NoBroker.publish(topic, payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_tokens_before_primary() {
        let subs = [
            Substitution::primary("42"),
            Substitution::new("%saturation", "80"),
            Substitution::new("%brightness", "100"),
        ];
        assert_eq!(
            substitute("/c?s=%s&sat=%saturation&b=%brightness&again=%s", &subs),
            "/c?s=42&sat=80&b=100&again=42"
        );
    }

    #[test]
    fn substitution_without_tokens_is_identity() {
        assert_eq!(substitute("/status", &[Substitution::primary("1")]), "/status");
    }

    #[test]
    fn request_renders_url_and_body() {
        let request = HttpRequest::get("http://h/%s").with_body("{\"v\":%s}");
        let subs = [Substitution::primary("7")];
        assert_eq!(request.render_url(&subs), "http://h/7");
        assert_eq!(request.render_body(&subs).as_deref(), Some("{\"v\":7}"));
    }

    #[test]
    fn own_credentials_win() {
        let global = Credentials {
            username: "global".to_string(),
            password: "g".to_string(),
        };
        let request = HttpRequest::get("http://h")
            .with_credentials("local", "l")
            .or_credentials(Some(&global));
        assert_eq!(request.credentials().map(|c| c.username.as_str()), Some("local"));

        let request = HttpRequest::get("http://h").or_credentials(Some(&global));
        assert_eq!(request.credentials(), Some(&global));
    }

    #[test]
    fn method_parse() {
        assert_eq!("post".parse::<HttpMethod>(), Ok(HttpMethod::Post));
        assert!("BREW".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn response_status() {
        assert!(HttpResponse::new(204, "").error_for_status().is_ok());
        let err = HttpResponse::new(500, "boom").error_for_status().unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
    }

    #[test]
    fn topic_qos_is_capped() {
        let topic = MqttTopic::new("bulb/set").with_qos(7).with_retain(true);
        assert_eq!(topic.qos(), 2);
        assert!(topic.retain());
    }

    #[tokio::test]
    async fn no_broker_is_not_connected() {
        let err = NoBroker
            .publish(&MqttTopic::new("x"), "1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));

        let absent: Option<NoBroker> = None;
        assert!(absent.publish(&MqttTopic::new("x"), "1".to_string()).await.is_err());
    }
}
