// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport built on `rumqttc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::protocol::{InboundMessage, MqttTopic, MqttTransport};
use crate::types::Characteristic;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Capacity of the inbound message channel.
const INBOUND_CAPACITY: usize = 32;

/// MQTT client publishing set-topics and forwarding get-topic messages.
///
/// Inbound publishes on a subscribed topic are delivered as
/// [`InboundMessage`]s on the receiver returned by
/// [`MqttClientBuilder::build`].
///
/// # Examples
///
/// ```ignore
/// use http_lightbulb::protocol::{MqttClientBuilder, MqttTopic};
/// use http_lightbulb::types::Characteristic;
///
/// let (client, inbound) = MqttClientBuilder::new()
///     .broker("mqtt://192.168.1.50:1883")
///     .subscribe(MqttTopic::new("bulb/power/state"), Characteristic::On)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MqttClient {
    client: AsyncClient,
}

impl MqttClient {
    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.client.disconnect().await.map_err(TransportError::Mqtt)
    }
}

impl MqttTransport for MqttClient {
    /// Hands the message to the connection task.
    ///
    /// Resolves once the message is queued; broker acknowledgements for
    /// QoS 1 and 2 are handled by the event loop and not awaited. Fails with
    /// [`TransportError::Mqtt`] when the connection task has stopped.
    async fn publish(&self, topic: &MqttTopic, payload: String) -> Result<(), TransportError> {
        tracing::debug!(topic = %topic.topic(), payload = %payload, "Publishing MQTT message");

        self.client
            .publish(topic.topic(), qos(topic.qos()), topic.retain(), payload)
            .await
            .map_err(TransportError::Mqtt)
    }
}

fn qos(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), TransportError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| TransportError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), 1883)
    };

    if host.is_empty() {
        return Err(TransportError::InvalidAddress("empty host".to_string()));
    }

    Ok((host, port))
}

/// Delay before the first reconnect attempt.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for the reconnect delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_BACKOFF)
}

/// Handles MQTT events in the background.
///
/// Connection errors are retried with a capped exponential backoff and the
/// get-topics are subscribed again on every `ConnAck`. The loop ends once
/// the inbound receiver is dropped.
async fn handle_mqtt_events(
    client: AsyncClient,
    mut event_loop: EventLoop,
    subscriptions: Vec<MqttTopic>,
    routes: Vec<(String, Characteristic)>,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    use rumqttc::{Event, Packet};

    let mut backoff = INITIAL_BACKOFF;

    while !inbound_tx.is_closed() {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
                backoff = INITIAL_BACKOFF;
                for topic in &subscriptions {
                    if let Err(e) = client.try_subscribe(topic.topic(), qos(topic.qos())) {
                        tracing::warn!(topic = %topic.topic(), error = %e, "MQTT subscribe failed");
                    }
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let Some(characteristic) = routes
                    .iter()
                    .find(|(topic, _)| *topic == publish.topic)
                    .map(|(_, c)| *c)
                else {
                    continue;
                };
                let Ok(payload) = String::from_utf8(publish.payload.to_vec()) else {
                    tracing::warn!(topic = %publish.topic, "Dropping non UTF-8 MQTT payload");
                    continue;
                };

                tracing::debug!(
                    topic = %publish.topic,
                    payload = %payload,
                    %characteristic,
                    "Received MQTT message"
                );
                let message = InboundMessage {
                    characteristic,
                    payload,
                };
                if inbound_tx.send(message).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?backoff, "MQTT connection error");
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
            }
        }
    }
    tracing::debug!("MQTT event loop stopped");
}

/// Builder for creating an MQTT client with custom configuration.
#[derive(Debug, Default)]
pub struct MqttClientBuilder {
    broker: Option<String>,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    keep_alive: Option<Duration>,
    subscriptions: Vec<(MqttTopic, Characteristic)>,
}

impl MqttClientBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the MQTT broker URL (`mqtt://host:port`, `tcp://host:port` or
    /// `host[:port]`).
    #[must_use]
    pub fn broker(mut self, broker: impl Into<String>) -> Self {
        self.broker = Some(broker.into());
        self
    }

    /// Sets authentication credentials for the MQTT broker.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a custom client ID.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = Some(duration);
        self
    }

    /// Subscribes `topic` and routes its messages to `characteristic`.
    #[must_use]
    pub fn subscribe(mut self, topic: MqttTopic, characteristic: Characteristic) -> Self {
        self.subscriptions.push((topic, characteristic));
        self
    }

    /// Builds and connects the MQTT client.
    ///
    /// Returns the client together with the receiver of inbound messages.
    /// The connection is kept (and re-established after errors) for as long
    /// as that receiver is alive.
    ///
    /// # Errors
    ///
    /// Returns error if the broker is missing or invalid.
    pub async fn build(self) -> Result<(MqttClient, mpsc::Receiver<InboundMessage>), TransportError> {
        let broker = self
            .broker
            .ok_or_else(|| TransportError::InvalidAddress("broker is required".to_string()))?;

        let (host, port) = parse_mqtt_url(&broker)?;

        // PID + counter to avoid conflicts
        let client_id = self.client_id.unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("http_lightbulb_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, host, port);
        mqtt_options.set_keep_alive(self.keep_alive.unwrap_or(Duration::from_secs(30)));
        mqtt_options.set_clean_session(true);

        if let (Some(username), Some(password)) = (self.username, self.password) {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        let routes = self
            .subscriptions
            .iter()
            .map(|(topic, c)| (topic.topic().to_string(), *c))
            .collect();
        let topics = self.subscriptions.into_iter().map(|(topic, _)| topic).collect();
        let events_client = client.clone();
        tokio::spawn(async move {
            handle_mqtt_events(events_client, event_loop, topics, routes, inbound_tx).await;
        });

        // Let the broker process CONNECT and SUBSCRIBE before first publish
        tokio::time::sleep(Duration::from_millis(500)).await;

        Ok((MqttClient { client }, inbound_rx))
    }
}
