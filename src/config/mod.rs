// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory configuration.
//!
//! [`LightbulbConfig`] is the JSON document as written by users (camelCase
//! keys, URL properties as plain strings or objects). [`LightbulbConfig::resolve`]
//! validates it into a [`ResolvedConfig`] of typed channels.
//!
//! Power is mandatory: a power problem fails resolution. Optional channels
//! degrade independently; a broken one is dropped, logged and listed in
//! [`ResolvedConfig::rejected`].
//!
//! # Examples
//!
//! ```
//! use http_lightbulb::config::LightbulbConfig;
//!
//! let config = LightbulbConfig::from_json(r#"{
//!     "name": "Desk lamp",
//!     "onUrl": "http://lamp.local/on",
//!     "offUrl": "http://lamp.local/off",
//!     "statusUrl": "http://lamp.local/status",
//!     "brightness": {
//!         "setUrl": "http://lamp.local/brightness/%s",
//!         "statusUrl": "http://lamp.local/brightness",
//!         "unit": "rgb"
//!     }
//! }"#).unwrap();
//!
//! let resolved = config.resolve().unwrap();
//! assert!(resolved.brightness.is_some());
//! assert!(resolved.rejected.is_empty());
//! ```

mod channel;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use channel::{ChannelConfig, ChannelEndpoints, PowerConfig, PowerEndpoints, ValueRange};

use crate::cache::CacheTtl;
use crate::error::ConfigError;
use crate::pattern::StatusPattern;
use crate::protocol::{Credentials, HttpMethod, HttpRequest, MqttTopic, MqttTopics};
use crate::types::{
    BrightnessUnit, Characteristic, HueUnit, SaturationUnit, TemperatureUnit, Unit,
};

/// Default power status pattern: presence of a `1`.
const DEFAULT_POWER_PATTERN: &str = "1";

/// Default MQTT broker port.
const DEFAULT_MQTT_PORT: u16 = 1883;

// ============================================================================
// Raw configuration document
// ============================================================================

/// The accessory configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightbulbConfig {
    /// Accessory name.
    #[serde(default)]
    pub name: String,

    /// Legacy location of the power URLs.
    #[serde(default)]
    pub power: Option<LegacyPowerConfig>,
    /// Request turning the light on.
    #[serde(default)]
    pub on_url: Option<UrlProperty>,
    /// Request turning the light off.
    #[serde(default)]
    pub off_url: Option<UrlProperty>,
    /// Request reading the power state.
    #[serde(default)]
    pub status_url: Option<UrlProperty>,
    /// MQTT topic power is published to.
    #[serde(default)]
    pub set_power_topic: Option<TopicProperty>,
    /// MQTT topic the power state is reported on.
    #[serde(default)]
    pub get_power_topic: Option<TopicProperty>,
    /// Power presence pattern.
    #[serde(default)]
    pub status_pattern: Option<String>,

    /// Brightness channel.
    #[serde(default)]
    pub brightness: Option<ChannelProperty>,
    /// Hue channel.
    #[serde(default)]
    pub hue: Option<ChannelProperty>,
    /// Saturation channel.
    #[serde(default)]
    pub saturation: Option<ChannelProperty>,
    /// Color temperature channel.
    #[serde(default)]
    pub color_temperature: Option<ChannelProperty>,

    /// Power cache time in ms (`-1` infinite, `0` always query).
    #[serde(default)]
    pub status_cache: Option<i64>,
    /// Brightness cache time in ms.
    #[serde(default)]
    pub brightness_cache: Option<i64>,
    /// Hue cache time in ms.
    #[serde(default)]
    pub hue_cache: Option<i64>,
    /// Saturation cache time in ms.
    #[serde(default)]
    pub saturation_cache: Option<i64>,
    /// Color temperature cache time in ms.
    #[serde(default)]
    pub color_temperature_cache: Option<i64>,

    /// Credentials forwarded into every HTTP request lacking its own.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// Poll interval in ms.
    #[serde(default)]
    pub pull_interval: Option<u64>,
    /// Identifier for webhook notifications.
    #[serde(default, rename = "notificationID")]
    pub notification_id: Option<String>,
    /// Password for webhook notifications.
    #[serde(default)]
    pub notification_password: Option<String>,
    /// MQTT broker options.
    #[serde(default)]
    pub mqtt: Option<MqttConfig>,
}

/// Power URLs in their legacy `power` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPowerConfig {
    /// Request turning the light on.
    #[serde(default)]
    pub on_url: Option<UrlProperty>,
    /// Request turning the light off.
    #[serde(default)]
    pub off_url: Option<UrlProperty>,
    /// Request reading the power state.
    #[serde(default)]
    pub status_url: Option<UrlProperty>,
}

/// A URL given as a plain string or as a detailed request object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlProperty {
    /// `GET` on the URL.
    Url(String),
    /// Full request description.
    Request(UrlObject),
}

/// Detailed request description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlObject {
    /// Target URL (may contain substitution tokens).
    pub url: String,
    /// HTTP method, `GET` by default.
    #[serde(default)]
    pub method: Option<String>,
    /// Body template; non-string JSON is serialized.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    /// Extra headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request-specific credentials.
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// An MQTT topic given as a plain string or with delivery options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicProperty {
    /// Topic name with QoS 0.
    Topic(String),
    /// Topic with options.
    Detailed {
        /// Topic name.
        topic: String,
        /// QoS level.
        #[serde(default)]
        qos: u8,
        /// Retain flag (set-topics only).
        #[serde(default)]
        retain: bool,
    },
}

/// Configuration of one numeric channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProperty {
    /// Request writing a value.
    #[serde(default)]
    pub set_url: Option<UrlProperty>,
    /// Request reading the value.
    #[serde(default)]
    pub status_url: Option<UrlProperty>,
    /// MQTT topic values are published to.
    #[serde(default)]
    pub set_topic: Option<TopicProperty>,
    /// MQTT topic the value is reported on.
    #[serde(default)]
    pub get_topic: Option<TopicProperty>,
    /// Device-native unit name.
    #[serde(default)]
    pub unit: Option<String>,
    /// Extraction pattern.
    #[serde(default)]
    pub status_pattern: Option<String>,
    /// Capture group to extract.
    #[serde(default)]
    pub pattern_group_to_extract: Option<usize>,
    /// Suppress the power-on following a brightness write.
    #[serde(default)]
    pub withhold_power_update: bool,
    /// Lower color temperature bound, in the channel's unit.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Upper color temperature bound, in the channel's unit.
    #[serde(default)]
    pub max_value: Option<f64>,
}

/// Basic authentication credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
}

impl AuthConfig {
    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// MQTT broker options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttConfig {
    /// Broker host.
    pub host: String,
    /// Broker port.
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    /// Broker username.
    #[serde(default)]
    pub username: Option<String>,
    /// Broker password.
    #[serde(default)]
    pub password: Option<String>,
    /// Client identifier; generated when absent.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Keep-alive interval in seconds.
    #[serde(default)]
    pub keepalive: Option<u64>,
}

const fn default_mqtt_port() -> u16 {
    DEFAULT_MQTT_PORT
}

impl MqttConfig {
    /// Returns the broker URL.
    #[must_use]
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.host, self.port)
    }

    /// Returns a client builder preconfigured from these options.
    #[cfg(feature = "mqtt")]
    #[must_use]
    pub fn client_builder(&self) -> crate::protocol::MqttClientBuilder {
        let mut builder = crate::protocol::MqttClientBuilder::new().broker(self.broker_url());
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            builder = builder.credentials(username, password);
        }
        if let Some(id) = &self.client_id {
            builder = builder.client_id(id);
        }
        if let Some(secs) = self.keepalive {
            builder = builder.keep_alive(Duration::from_secs(secs));
        }
        builder
    }
}

/// Webhook notification registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Identifier the notification server routes on.
    pub id: String,
    /// Optional shared password.
    pub password: Option<String>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Validated accessory configuration.
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Accessory name.
    pub name: String,
    /// Power channel.
    pub power: PowerConfig,
    /// Brightness channel, if configured and valid.
    pub brightness: Option<ChannelConfig>,
    /// Hue channel, if configured and valid.
    pub hue: Option<ChannelConfig>,
    /// Saturation channel, if configured and valid.
    pub saturation: Option<ChannelConfig>,
    /// Color temperature channel, if configured and valid.
    pub color_temperature: Option<ChannelConfig>,
    /// Poll interval, if polling is enabled.
    pub pull_interval: Option<Duration>,
    /// Webhook registration, if configured.
    pub notification: Option<NotificationConfig>,
    /// Broker options, if configured.
    pub mqtt: Option<MqttConfig>,
    /// Channels that were configured but dropped, with the reason.
    pub rejected: Vec<(Characteristic, ConfigError)>,
}

impl ResolvedConfig {
    /// Returns the numeric channel for `characteristic`.
    #[must_use]
    pub fn channel(&self, characteristic: Characteristic) -> Option<&ChannelConfig> {
        match characteristic {
            Characteristic::On => None,
            Characteristic::Brightness => self.brightness.as_ref(),
            Characteristic::Hue => self.hue.as_ref(),
            Characteristic::Saturation => self.saturation.as_ref(),
            Characteristic::ColorTemperature => self.color_temperature.as_ref(),
        }
    }

    /// Returns the characteristics this accessory exposes.
    #[must_use]
    pub fn characteristics(&self) -> Vec<Characteristic> {
        Characteristic::ALL
            .into_iter()
            .filter(|c| *c == Characteristic::On || self.channel(*c).is_some())
            .collect()
    }

    /// Returns every get-topic to subscribe, with its characteristic.
    #[must_use]
    pub fn mqtt_subscriptions(&self) -> Vec<(MqttTopic, Characteristic)> {
        let power = self
            .power
            .mqtt_topics()
            .map(|t| (t.get.clone(), Characteristic::On));
        let channels = Characteristic::ALL.into_iter().filter_map(|c| {
            self.channel(c)
                .and_then(ChannelConfig::mqtt_topics)
                .map(|t| (t.get.clone(), c))
        });
        power.into_iter().chain(channels).collect()
    }
}

impl LightbulbConfig {
    /// Parses a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the document into typed channels.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if power is missing or misconfigured. Broken
    /// optional channels do not fail resolution.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let auth = self.auth.as_ref().and_then(|a| {
            let credentials = a.credentials();
            if credentials.is_none() {
                tracing::warn!("'auth.username' and/or 'auth.password' was not set");
            }
            credentials
        });
        let has_mqtt = self.mqtt.is_some();
        let ctx = ResolveContext {
            auth: auth.as_ref(),
            has_mqtt,
        };

        let power = self.resolve_power(&ctx)?;

        let mut rejected = Vec::new();
        let mut resolve = |characteristic: Characteristic,
                           property: Option<&ChannelProperty>,
                           cache: Option<i64>| {
            let property = property?;
            match resolve_channel(characteristic, property, cache, &ctx) {
                Ok(channel) => Some(channel),
                Err(e) => {
                    tracing::warn!(%characteristic, error = %e, "Dropping misconfigured channel");
                    rejected.push((characteristic, e));
                    None
                }
            }
        };

        let brightness = resolve(
            Characteristic::Brightness,
            self.brightness.as_ref(),
            self.brightness_cache,
        );
        let hue = resolve(Characteristic::Hue, self.hue.as_ref(), self.hue_cache);
        let saturation = resolve(
            Characteristic::Saturation,
            self.saturation.as_ref(),
            self.saturation_cache,
        );
        let color_temperature = resolve(
            Characteristic::ColorTemperature,
            self.color_temperature.as_ref(),
            self.color_temperature_cache,
        );

        let notification = self
            .notification_id
            .filter(|id| !id.is_empty())
            .map(|id| NotificationConfig {
                id,
                password: self.notification_password.filter(|p| !p.is_empty()),
            });

        Ok(ResolvedConfig {
            name: self.name,
            power,
            brightness,
            hue,
            saturation,
            color_temperature,
            pull_interval: self
                .pull_interval
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            notification,
            mqtt: self.mqtt,
            rejected,
        })
    }

    fn resolve_power(&self, ctx: &ResolveContext<'_>) -> Result<PowerConfig, ConfigError> {
        let legacy = self.power.as_ref();
        let pick = |top: &Option<UrlProperty>, legacy: Option<&Option<UrlProperty>>| {
            top.clone().or_else(|| legacy.and_then(Clone::clone))
        };

        let endpoints = if let (Some(set), Some(get)) = (&self.set_power_topic, &self.get_power_topic)
        {
            if !ctx.has_mqtt {
                return Err(ConfigError::MissingMqtt);
            }
            PowerEndpoints::Mqtt(MqttTopics {
                set: parse_topic("setPowerTopic", set)?,
                get: parse_topic("getPowerTopic", get)?,
            })
        } else {
            let on = pick(&self.on_url, legacy.map(|l| &l.on_url));
            let off = pick(&self.off_url, legacy.map(|l| &l.off_url));
            let status = pick(&self.status_url, legacy.map(|l| &l.status_url));
            match (on, off, status) {
                (Some(on), Some(off), Some(status)) => PowerEndpoints::Http {
                    on: parse_url("onUrl", &on, ctx.auth)?,
                    off: parse_url("offUrl", &off, ctx.auth)?,
                    status: parse_url("statusUrl", &status, ctx.auth)?,
                },
                _ => return Err(ConfigError::MissingPower),
            }
        };

        let pattern = StatusPattern::new(
            "statusPattern",
            self.status_pattern.as_deref().unwrap_or(DEFAULT_POWER_PATTERN),
            None,
        )?;
        let cache = CacheTtl::from_millis("statusCache", self.status_cache.unwrap_or(0))?;

        Ok(PowerConfig {
            endpoints,
            pattern,
            cache,
        })
    }
}

struct ResolveContext<'a> {
    auth: Option<&'a Credentials>,
    has_mqtt: bool,
}

const fn channel_name(characteristic: Characteristic) -> &'static str {
    match characteristic {
        Characteristic::On => "power",
        Characteristic::Brightness => "brightness",
        Characteristic::Hue => "hue",
        Characteristic::Saturation => "saturation",
        Characteristic::ColorTemperature => "colorTemperature",
    }
}

const fn cache_field(characteristic: Characteristic) -> &'static str {
    match characteristic {
        Characteristic::On => "statusCache",
        Characteristic::Brightness => "brightnessCache",
        Characteristic::Hue => "hueCache",
        Characteristic::Saturation => "saturationCache",
        Characteristic::ColorTemperature => "colorTemperatureCache",
    }
}

fn parse_unit(characteristic: Characteristic, unit: Option<&str>) -> Result<Unit, ConfigError> {
    let channel = channel_name(characteristic);
    let invalid = |unit: &str| ConfigError::InvalidUnit {
        channel,
        unit: unit.to_string(),
    };
    Ok(match (characteristic, unit) {
        (Characteristic::Brightness, None) => Unit::Brightness(BrightnessUnit::default()),
        (Characteristic::Brightness, Some(u)) => {
            Unit::Brightness(u.parse().map_err(|_| invalid(u))?)
        }
        (Characteristic::Hue, None) => Unit::Hue(HueUnit::default()),
        (Characteristic::Hue, Some(u)) => Unit::Hue(u.parse().map_err(|_| invalid(u))?),
        (Characteristic::Saturation, None) => Unit::Saturation(SaturationUnit::default()),
        (Characteristic::Saturation, Some(u)) => {
            Unit::Saturation(u.parse().map_err(|_| invalid(u))?)
        }
        (Characteristic::ColorTemperature, None) => {
            Unit::ColorTemperature(TemperatureUnit::default())
        }
        (Characteristic::ColorTemperature, Some(u)) => {
            Unit::ColorTemperature(u.parse().map_err(|_| invalid(u))?)
        }
        (Characteristic::On, u) => return Err(invalid(u.unwrap_or_default())),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn color_temperature_range(
    unit: Unit,
    property: &ChannelProperty,
) -> Result<ValueRange, ConfigError> {
    let to_mired = |v: f64| match unit {
        Unit::ColorTemperature(TemperatureUnit::Kelvin) => (1_000_000.0 / v).floor(),
        _ => v,
    };
    let min = property.min_value.map_or(ValueRange::MIRED.min, to_mired);
    let max = property.max_value.map_or(ValueRange::MIRED.max, to_mired);
    let (min, max) = if min > max { (max, min) } else { (min, max) };

    if !min.is_finite() || !max.is_finite() || min <= 0.0 || min >= max {
        return Err(ConfigError::InvalidBounds {
            min: min as i64,
            max: max as i64,
        });
    }
    Ok(ValueRange::new(min, max))
}

fn resolve_channel(
    characteristic: Characteristic,
    property: &ChannelProperty,
    cache: Option<i64>,
    ctx: &ResolveContext<'_>,
) -> Result<ChannelConfig, ConfigError> {
    let channel = channel_name(characteristic);

    let endpoints = match (
        &property.set_topic,
        &property.get_topic,
        &property.set_url,
        &property.status_url,
    ) {
        (Some(set), Some(get), _, _) => {
            if !ctx.has_mqtt {
                return Err(ConfigError::MissingMqtt);
            }
            ChannelEndpoints::Mqtt(MqttTopics {
                set: parse_topic(channel, set)?,
                get: parse_topic(channel, get)?,
            })
        }
        (_, _, Some(set), Some(status)) => ChannelEndpoints::Http {
            set: parse_url(channel, set, ctx.auth)?,
            status: parse_url(channel, status, ctx.auth)?,
        },
        (_, _, None, _) => {
            return Err(ConfigError::MissingEndpoint {
                channel,
                field: "setUrl",
            });
        }
        (_, _, Some(_), None) => {
            return Err(ConfigError::MissingEndpoint {
                channel,
                field: "statusUrl",
            });
        }
    };

    let unit = parse_unit(characteristic, property.unit.as_deref())?;
    let pattern = StatusPattern::new(
        channel,
        property
            .status_pattern
            .as_deref()
            .unwrap_or(unit.default_status_pattern()),
        property.pattern_group_to_extract,
    )?;
    let range = match characteristic {
        Characteristic::ColorTemperature => color_temperature_range(unit, property)?,
        other => ValueRange::for_characteristic(other),
    };
    let cache = CacheTtl::from_millis(cache_field(characteristic), cache.unwrap_or(0))?;

    Ok(ChannelConfig {
        unit,
        pattern,
        endpoints,
        range,
        cache,
        withhold_power_update: characteristic == Characteristic::Brightness
            && property.withhold_power_update,
    })
}

fn parse_url(
    field: &'static str,
    property: &UrlProperty,
    auth: Option<&Credentials>,
) -> Result<HttpRequest, ConfigError> {
    let request = match property {
        UrlProperty::Url(url) => HttpRequest::get(url),
        UrlProperty::Request(object) => {
            let method = match &object.method {
                Some(m) => m.parse::<HttpMethod>().map_err(ConfigError::InvalidMethod)?,
                None => HttpMethod::Get,
            };
            let mut request = HttpRequest::get(&object.url).with_method(method);
            match &object.body {
                None | Some(serde_json::Value::Null) => {}
                Some(serde_json::Value::String(body)) => request = request.with_body(body),
                Some(other) => request = request.with_body(other.to_string()),
            }
            for (name, value) in &object.headers {
                request = request.with_header(name, value);
            }
            if let Some(credentials) = object.auth.as_ref().and_then(AuthConfig::credentials) {
                request = request.with_credentials(credentials.username, credentials.password);
            }
            request
        }
    };

    if request.url().trim().is_empty() {
        return Err(ConfigError::MissingEndpoint { channel: field, field: "url" });
    }

    Ok(request.or_credentials(auth))
}

fn parse_topic(field: &'static str, property: &TopicProperty) -> Result<MqttTopic, ConfigError> {
    let (topic, qos, retain) = match property {
        TopicProperty::Topic(topic) => (topic.as_str(), 0, false),
        TopicProperty::Detailed { topic, qos, retain } => (topic.as_str(), *qos, *retain),
    };
    if topic.is_empty() {
        return Err(ConfigError::InvalidTopic {
            channel: field,
            message: "topic is empty".to_string(),
        });
    }
    if qos > 2 {
        return Err(ConfigError::InvalidTopic {
            channel: field,
            message: format!("qos {qos} is not 0, 1 or 2"),
        });
    }
    Ok(MqttTopic::new(topic).with_qos(qos).with_retain(retain))
}
