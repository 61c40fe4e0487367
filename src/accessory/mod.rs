// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The light accessory.
//!
//! [`LightbulbAccessory`] owns the canonical [`LightState`], the current
//! [`ColorMode`] and one query gate per readable channel. Host reads and
//! writes go through the characteristic channel (see `get_*`/`set_*`);
//! polled, MQTT and webhook updates go through the reconciler
//! ([`poll`](LightbulbAccessory::poll),
//! [`handle_mqtt_message`](LightbulbAccessory::handle_mqtt_message),
//! [`handle_notification`](LightbulbAccessory::handle_notification)).
//!
//! # Examples
//!
//! ```no_run
//! use http_lightbulb::{LightbulbAccessory, LightbulbConfig};
//! use http_lightbulb::protocol::HttpClient;
//!
//! # async fn example() -> http_lightbulb::Result<()> {
//! let config = LightbulbConfig::from_json(r#"{
//!     "name": "Desk lamp",
//!     "onUrl": "http://lamp.local/on",
//!     "offUrl": "http://lamp.local/off",
//!     "statusUrl": "http://lamp.local/status"
//! }"#)?
//! .resolve()?;
//!
//! let lamp = LightbulbAccessory::new(config, HttpClient::new()?);
//! lamp.set_power(true).await?;
//! assert!(lamp.get_power().await?);
//! # Ok(())
//! # }
//! ```

mod channel;
mod reconcile;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub use channel::CharacteristicHandler;
pub use reconcile::NotificationEvent;

use crate::cache::QueryCache;
use crate::config::{ChannelConfig, NotificationConfig, PowerConfig, ResolvedConfig};
use crate::error::{Error, Result};
use crate::event::{LightEvent, LightEvents};
use crate::protocol::{HttpTransport, MqttTransport, NoBroker};
use crate::pull_timer::PullTimer;
use crate::state::LightState;
use crate::types::{BlackBodyConversion, Characteristic, ColorMode, HueSaturationConversion};

/// Static accessory information reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Serial number.
    pub serial_number: String,
    /// Firmware revision.
    pub firmware_revision: String,
}

/// One-shot suppression of the power write following a brightness write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Withhold {
    #[default]
    Idle,
    Armed,
}

impl Withhold {
    /// Returns `true` if the flag was armed, leaving it idle.
    fn take(&mut self) -> bool {
        std::mem::take(self) == Self::Armed
    }
}

/// Mutable per-accessory state. Never held across an await point.
#[derive(Debug)]
struct Inner {
    state: LightState,
    mode: ColorMode,
    caches: HashMap<Characteristic, QueryCache>,
    withhold: Withhold,
}

/// A light bridged to HTTP and MQTT endpoints.
///
/// `H` performs HTTP requests and `M` publishes MQTT messages. Devices
/// without MQTT use [`NoBroker`].
pub struct LightbulbAccessory<H, M = NoBroker> {
    name: String,
    power: PowerConfig,
    brightness: Option<ChannelConfig>,
    hue: Option<ChannelConfig>,
    saturation: Option<ChannelConfig>,
    color_temperature: Option<ChannelConfig>,
    notification: Option<NotificationConfig>,
    http: H,
    mqtt: M,
    conversion: Arc<dyn HueSaturationConversion>,
    pull_timer: Option<Arc<PullTimer>>,
    inner: Mutex<Inner>,
    events: LightEvents,
    tasks: Tasks,
}

impl<H, M> std::fmt::Debug for LightbulbAccessory<H, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightbulbAccessory")
            .field("name", &self.name)
            .field("characteristics", &self.characteristics())
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<H: HttpTransport> LightbulbAccessory<H, NoBroker> {
    /// Creates an accessory from a resolved configuration.
    ///
    /// MQTT-driven channels fail to publish until a broker is attached with
    /// [`with_mqtt`](Self::with_mqtt).
    #[must_use]
    pub fn new(config: ResolvedConfig, http: H) -> Self {
        let state = LightState::with_channels(
            config.brightness.is_some(),
            config.hue.is_some(),
            config.saturation.is_some(),
            config.color_temperature.as_ref().map(|c| c.range.min),
        );

        let mut caches = HashMap::new();
        caches.insert(Characteristic::On, QueryCache::new(config.power.cache));
        for channel in [
            &config.brightness,
            &config.hue,
            &config.saturation,
            &config.color_temperature,
        ]
        .into_iter()
        .flatten()
        {
            caches.insert(channel.characteristic(), QueryCache::new(channel.cache));
        }

        for (characteristic, error) in &config.rejected {
            tracing::warn!(
                name = %config.name,
                %characteristic,
                %error,
                "Channel disabled by configuration"
            );
        }

        Self {
            name: config.name,
            power: config.power,
            brightness: config.brightness,
            hue: config.hue,
            saturation: config.saturation,
            color_temperature: config.color_temperature,
            notification: config.notification,
            http,
            mqtt: NoBroker,
            conversion: Arc::new(BlackBodyConversion),
            pull_timer: config.pull_interval.map(|interval| Arc::new(PullTimer::new(interval))),
            inner: Mutex::new(Inner {
                state,
                mode: ColorMode::default(),
                caches,
                withhold: Withhold::default(),
            }),
            events: LightEvents::new(),
            tasks: Tasks::default(),
        }
    }

    /// Attaches an MQTT transport for MQTT-driven channels.
    #[must_use]
    pub fn with_mqtt<M: MqttTransport>(self, mqtt: M) -> LightbulbAccessory<H, M> {
        LightbulbAccessory {
            name: self.name,
            power: self.power,
            brightness: self.brightness,
            hue: self.hue,
            saturation: self.saturation,
            color_temperature: self.color_temperature,
            notification: self.notification,
            http: self.http,
            mqtt,
            conversion: self.conversion,
            pull_timer: self.pull_timer,
            inner: self.inner,
            events: self.events,
            tasks: self.tasks,
        }
    }
}

impl<H: HttpTransport, M: MqttTransport> LightbulbAccessory<H, M> {
    /// Replaces the color temperature to hue/saturation conversion.
    ///
    /// Defaults to [`BlackBodyConversion`].
    #[must_use]
    pub fn with_conversion(mut self, conversion: Arc<dyn HueSaturationConversion>) -> Self {
        self.conversion = conversion;
        self
    }

    /// Returns the accessory name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a snapshot of the canonical state.
    #[must_use]
    pub fn state(&self) -> LightState {
        self.inner.lock().state.clone()
    }

    /// Returns the current color mode.
    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        self.inner.lock().mode
    }

    /// Returns the event bus.
    #[must_use]
    pub fn events(&self) -> &LightEvents {
        &self.events
    }

    /// Subscribes to state and color mode updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LightEvent> {
        self.events.subscribe()
    }

    /// Returns the webhook registration, if configured.
    #[must_use]
    pub fn notification(&self) -> Option<&NotificationConfig> {
        self.notification.as_ref()
    }

    /// Returns the poll timer, if polling is enabled.
    #[must_use]
    pub fn pull_timer(&self) -> Option<&PullTimer> {
        self.pull_timer.as_deref()
    }

    /// Handles an identify request from the host.
    pub fn identify(&self) {
        tracing::info!(name = %self.name, "Identify requested");
    }

    /// Returns the static accessory information.
    #[must_use]
    pub fn information(&self) -> AccessoryInformation {
        AccessoryInformation {
            manufacturer: env!("CARGO_PKG_NAME").to_string(),
            model: "HTTP Lightbulb".to_string(),
            serial_number: "001".to_string(),
            firmware_revision: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// An accessory wired to the `reqwest` and `rumqttc` clients.
#[cfg(all(feature = "http", feature = "mqtt"))]
pub type ConnectedLightbulb =
    LightbulbAccessory<crate::protocol::HttpClient, Option<crate::protocol::MqttClient>>;

#[cfg(all(feature = "http", feature = "mqtt"))]
impl ConnectedLightbulb {
    /// Builds the HTTP client, connects to the broker if one is configured
    /// and starts the MQTT and poll tasks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if a client cannot be created or the
    /// broker options are invalid.
    pub async fn connect(config: ResolvedConfig) -> Result<Arc<Self>> {
        let http = crate::protocol::HttpClient::new()?;

        let (mqtt, inbound) = match &config.mqtt {
            Some(options) => {
                let builder = config
                    .mqtt_subscriptions()
                    .into_iter()
                    .fold(options.client_builder(), |b, (topic, c)| b.subscribe(topic, c));
                let (client, inbound) = builder.build().await?;
                (Some(client), Some(inbound))
            }
            None => (None, None),
        };

        let accessory = Arc::new(LightbulbAccessory::new(config, http).with_mqtt(mqtt));

        if let Some(inbound) = inbound {
            accessory.spawn_mqtt(inbound);
        }
        accessory.spawn_poller();

        tracing::info!(name = %accessory.name, "Accessory connected");
        Ok(accessory)
    }
}

impl<H, M> LightbulbAccessory<H, M> {
    /// Returns the characteristics registered on this accessory.
    #[must_use]
    pub fn characteristics(&self) -> Vec<Characteristic> {
        Characteristic::ALL
            .into_iter()
            .filter(|c| *c == Characteristic::On || self.channel_config(*c).is_some())
            .collect()
    }

    fn channel_config(&self, characteristic: Characteristic) -> Option<&ChannelConfig> {
        match characteristic {
            Characteristic::On => None,
            Characteristic::Brightness => self.brightness.as_ref(),
            Characteristic::Hue => self.hue.as_ref(),
            Characteristic::Saturation => self.saturation.as_ref(),
            Characteristic::ColorTemperature => self.color_temperature.as_ref(),
        }
    }

    fn channel(&self, characteristic: Characteristic) -> Result<&ChannelConfig> {
        self.channel_config(characteristic)
            .ok_or(Error::ChannelNotConfigured(characteristic))
    }

    /// Stops the poller and MQTT tasks.
    ///
    /// Dropping the accessory has the same effect. Get and set calls keep
    /// working afterwards.
    pub fn shutdown(&self) {
        let stopped = self.tasks.abort_all();
        if stopped > 0 {
            tracing::debug!(name = %self.name, stopped, "Background tasks stopped");
        }
    }

    fn reset_pull_timer(&self) {
        if let Some(timer) = &self.pull_timer {
            timer.reset();
        }
    }
}

/// Background tasks spawned for an accessory, aborted on drop.
///
/// The tasks only hold a weak reference to the accessory.
#[derive(Debug, Default)]
struct Tasks(Mutex<Vec<JoinHandle<()>>>);

impl Tasks {
    fn push(&self, handle: JoinHandle<()>) {
        let mut handles = self.0.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn abort_all(&self) -> usize {
        let handles: Vec<_> = self.0.lock().drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        handles.len()
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::config::LightbulbConfig;
    use crate::error::TransportError;
    use crate::protocol::{HttpRequest, HttpResponse, MqttTopic, Substitution};

    /// Records rendered requests and answers from a queue of responses.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct FakeHttp {
        pub(crate) sent: Arc<Mutex<Vec<String>>>,
        responses: Arc<Mutex<Vec<HttpResponse>>>,
    }

    impl FakeHttp {
        pub(crate) fn respond(&self, status: u16, body: &str) {
            self.responses.lock().push(HttpResponse::new(status, body));
        }

        pub(crate) fn sent(&self) -> Vec<String> {
            self.sent.lock().clone()
        }
    }

    impl HttpTransport for FakeHttp {
        async fn request(
            &self,
            request: &HttpRequest,
            substitutions: &[Substitution],
        ) -> std::result::Result<HttpResponse, TransportError> {
            let mut line = format!("{} {}", request.method(), request.render_url(substitutions));
            if let Some(body) = request.render_body(substitutions) {
                line.push(' ');
                line.push_str(&body);
            }
            self.sent.lock().push(line);
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                Ok(HttpResponse::new(200, ""))
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    /// Records published payloads.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct FakeMqtt {
        pub(crate) published: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl MqttTransport for FakeMqtt {
        async fn publish(
            &self,
            topic: &MqttTopic,
            payload: String,
        ) -> std::result::Result<(), TransportError> {
            self.published
                .lock()
                .push((topic.topic().to_string(), payload));
            Ok(())
        }
    }

    pub(crate) fn config(extra: serde_json::Value) -> ResolvedConfig {
        let mut value = serde_json::json!({
            "name": "Test lamp",
            "onUrl": "http://lamp/on",
            "offUrl": "http://lamp/off",
            "statusUrl": "http://lamp/status"
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value::<LightbulbConfig>(value)
            .unwrap()
            .resolve()
            .unwrap()
    }

    pub(crate) fn color_lamp() -> (LightbulbAccessory<FakeHttp>, FakeHttp) {
        let http = FakeHttp::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({
                "brightness": { "setUrl": "http://lamp/b?v=%s", "statusUrl": "http://lamp/b" },
                "hue": { "setUrl": "http://lamp/c?h=%s&s=%saturation", "statusUrl": "http://lamp/h" },
                "saturation": { "setUrl": "http://lamp/c?h=%hue&s=%s", "statusUrl": "http://lamp/s" },
                "colorTemperature": {
                    "setUrl": "http://lamp/ct?k=%s",
                    "statusUrl": "http://lamp/ct",
                    "unit": "kelvin"
                }
            })),
            http.clone(),
        );
        (lamp, http)
    }

    #[test]
    fn initial_state_follows_channels() {
        let (lamp, _) = color_lamp();
        let state = lamp.state();
        assert!(!state.power());
        assert_eq!(state.brightness(), Some(0.0));
        assert_eq!(state.color_temperature(), Some(50.0));
        assert_eq!(lamp.color_mode(), ColorMode::Undefined);
        assert_eq!(lamp.characteristics(), Characteristic::ALL.to_vec());
    }

    #[test]
    fn power_only_accessory() {
        let lamp = LightbulbAccessory::new(config(serde_json::json!({})), FakeHttp::default());
        assert_eq!(lamp.characteristics(), vec![Characteristic::On]);
        assert!(lamp.pull_timer().is_none());
        assert!(matches!(
            lamp.channel(Characteristic::Hue),
            Err(Error::ChannelNotConfigured(Characteristic::Hue))
        ));
    }

    #[test]
    fn information_uses_crate_metadata() {
        let lamp = LightbulbAccessory::new(config(serde_json::json!({})), FakeHttp::default());
        let info = lamp.information();
        assert_eq!(info.serial_number, "001");
        assert_eq!(info.firmware_revision, env!("CARGO_PKG_VERSION"));
        lamp.identify();
    }

    #[test]
    fn withhold_is_one_shot() {
        let mut flag = Withhold::Armed;
        assert!(flag.take());
        assert!(!flag.take());
    }
}
