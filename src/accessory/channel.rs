// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing get and set paths.

use crate::config::{ChannelConfig, ChannelEndpoints, PowerEndpoints};
use crate::error::{Error, Result, TransportError};
use crate::event::UpdateSource;
use crate::protocol::{
    HttpRequest, HttpResponse, HttpTransport, MqttTopic, MqttTransport, Substitution,
};
use crate::state::StateChange;
use crate::types::{Characteristic, CharacteristicValue, ColorMode};

use super::{LightbulbAccessory, Withhold};

/// The numeric characteristics whose values are offered as tokens.
const VALUE_CHARACTERISTICS: [Characteristic; 4] = [
    Characteristic::Brightness,
    Characteristic::Hue,
    Characteristic::Saturation,
    Characteristic::ColorTemperature,
];

impl<H: HttpTransport, M: MqttTransport> LightbulbAccessory<H, M> {
    // ========== Power ==========

    /// Reads the power state.
    ///
    /// Returns the stored state for MQTT-driven power or while the query
    /// gate is closed. Any call defers the next poll.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the status request fails or answers
    /// with a non-2xx status.
    pub async fn get_power(&self) -> Result<bool> {
        self.read_power(UpdateSource::Read).await
    }

    /// Turns the light on or off.
    ///
    /// A power-on right after a brightness write with `withholdPowerUpdate`
    /// is acknowledged without contacting the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the request or publish fails.
    pub async fn set_power(&self, on: bool) -> Result<()> {
        let withheld = {
            let mut inner = self.inner.lock();
            let armed = inner.withhold.take();
            armed && on && inner.state.power()
        };
        if withheld {
            tracing::debug!("Withholding power update following brightness write");
            return Ok(());
        }

        self.reset_pull_timer();

        let result = match &self.power.endpoints {
            PowerEndpoints::Http {
                on: on_request,
                off,
                ..
            } => {
                let request = if on { on_request } else { off };
                self.send(request, &[]).await.map(drop)
            }
            PowerEndpoints::Mqtt(topics) => self.publish(&topics.set, on.to_string()).await,
        };
        if let Err(e) = result {
            tracing::error!(on, error = %e, "Failed to set power");
            return Err(e.into());
        }

        tracing::debug!(on, "Successfully set power");
        self.store(StateChange::Power(on), UpdateSource::Write);
        Ok(())
    }

    pub(super) async fn read_power(&self, source: UpdateSource) -> Result<bool> {
        self.reset_pull_timer();

        let status = match &self.power.endpoints {
            PowerEndpoints::Http { status, .. } if self.should_query(Characteristic::On) => status,
            _ => {
                let on = self.inner.lock().state.power();
                tracing::debug!(
                    on,
                    infinite = self.is_infinite(Characteristic::On),
                    "Returning cached power state"
                );
                return Ok(on);
            }
        };

        let response = self.send(status, &[]).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to read power state");
        })?;
        let on = self.power.pattern.is_match(response.body());
        tracing::info!(on, "Power state read");

        self.mark_queried(Characteristic::On);
        self.store(StateChange::Power(on), source);
        Ok(on)
    }

    // ========== Numeric channels ==========

    /// Reads a numeric characteristic in canonical units.
    ///
    /// Color temperature outside temperature mode answers with its lower
    /// bound. Hue and saturation in temperature mode answer with their
    /// stored values. MQTT-driven channels and closed query gates answer
    /// from storage too; everything else performs a status read.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelNotConfigured`] for a characteristic without channel
    /// - [`Error::Transport`] if the status request fails
    /// - [`Error::Pattern`] if the body does not match the status pattern
    /// - [`Error::Range`] if the converted value is out of range
    pub async fn get_value(&self, characteristic: Characteristic) -> Result<f64> {
        self.read_value(characteristic, UpdateSource::Read).await
    }

    /// Writes a numeric characteristic given in canonical units.
    ///
    /// The value is converted to the device's unit and sent with the current
    /// values of the other channels as substitution tokens. A successful
    /// hue or saturation write selects color mode; a color temperature
    /// write selects temperature mode and refreshes the derived hue and
    /// saturation.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelNotConfigured`] for a characteristic without channel
    /// - [`Error::Range`] if `value` is out of range
    /// - [`Error::Transport`] if the request or publish fails
    pub async fn set_value(&self, characteristic: Characteristic, value: f64) -> Result<()> {
        let channel = self.channel(characteristic)?;
        let value = channel.range.check(characteristic, value)?;
        let native = channel.unit.to_native(value);

        if channel.withhold_power_update {
            let mut inner = self.inner.lock();
            if inner.state.power() {
                inner.withhold = Withhold::Armed;
            }
        }

        let result = match &channel.endpoints {
            ChannelEndpoints::Http { set, .. } => {
                let substitutions = self.substitutions(characteristic, native);
                self.send(set, &substitutions).await.map(drop)
            }
            ChannelEndpoints::Mqtt(topics) => self.publish(&topics.set, native.to_string()).await,
        };
        if let Err(e) = result {
            tracing::error!(%characteristic, value, error = %e, "Failed to set value");
            return Err(e.into());
        }

        tracing::debug!(%characteristic, value, native, "Successfully set value");

        let Some(change) = StateChange::from_value(characteristic, value.into()) else {
            return Ok(());
        };
        self.record_mode(characteristic);
        self.store(change, UpdateSource::Write);
        if characteristic == Characteristic::ColorTemperature {
            self.derive_from_temperature(value, UpdateSource::Write);
        }
        Ok(())
    }

    pub(super) async fn read_value(
        &self,
        characteristic: Characteristic,
        source: UpdateSource,
    ) -> Result<f64> {
        let channel = self.channel(characteristic)?;

        let status = match self.stored_answer(characteristic, channel) {
            Some(value) => return Ok(value),
            None => match &channel.endpoints {
                ChannelEndpoints::Http { status, .. } => status,
                ChannelEndpoints::Mqtt(_) => return Ok(self.stored(characteristic)),
            },
        };

        let value = self
            .fetch_value(characteristic, channel, status)
            .await
            .inspect_err(|e| {
                tracing::error!(%characteristic, error = %e, "Failed to read value");
            })?;
        tracing::info!(%characteristic, value, "Value read");

        self.mark_queried(characteristic);
        if let Some(change) = StateChange::from_value(characteristic, value.into()) {
            self.store(change, source);
        }
        Ok(value)
    }

    /// Returns the value to answer without contacting the device, if any.
    fn stored_answer(
        &self,
        characteristic: Characteristic,
        channel: &ChannelConfig,
    ) -> Option<f64> {
        let inner = self.inner.lock();
        let stored = inner.state.number(characteristic).unwrap_or_default();

        match characteristic {
            Characteristic::ColorTemperature if inner.mode != ColorMode::Temperature => {
                tracing::debug!(
                    min = channel.range.min,
                    mode = %inner.mode,
                    "Returning lower color temperature bound"
                );
                return Some(channel.range.min);
            }
            Characteristic::Hue | Characteristic::Saturation
                if inner.mode == ColorMode::Temperature =>
            {
                tracing::debug!(
                    %characteristic,
                    value = stored,
                    "Returning stored value in temperature mode"
                );
                return Some(stored);
            }
            _ => {}
        }

        let gate = inner.caches.get(&characteristic);
        if channel.is_push_only() || gate.is_some_and(|c| !c.should_query()) {
            tracing::debug!(
                %characteristic,
                value = stored,
                infinite = gate.is_some_and(crate::cache::QueryCache::is_infinite),
                "Returning cached value"
            );
            return Some(stored);
        }
        None
    }

    async fn fetch_value(
        &self,
        characteristic: Characteristic,
        channel: &ChannelConfig,
        status: &HttpRequest,
    ) -> Result<f64> {
        let response = self.send(status, &[]).await?;
        let raw = channel
            .pattern
            .extract_number(response.body(), channel.unit.parses_integer())?;
        let value = channel.unit.to_canonical(raw);
        Ok(channel.range.check(characteristic, value)?)
    }

    /// Builds the `%s`, own-token and sibling-token substitutions of a write.
    fn substitutions(&self, characteristic: Characteristic, native: f64) -> Vec<Substitution> {
        let state = self.inner.lock().state.clone();

        let mut substitutions = vec![Substitution::primary(native.to_string())];
        for other in VALUE_CHARACTERISTICS {
            let (Some(token), Some(channel)) = (other.token(), self.channel_config(other)) else {
                continue;
            };
            let value = if other == characteristic {
                native
            } else {
                channel
                    .unit
                    .to_native(state.number(other).unwrap_or_default())
            };
            substitutions.push(Substitution::new(token, value.to_string()));
        }
        substitutions
    }

    // ========== Transport helpers ==========

    async fn send(
        &self,
        request: &HttpRequest,
        substitutions: &[Substitution],
    ) -> std::result::Result<HttpResponse, TransportError> {
        self.http
            .request(request, substitutions)
            .await?
            .error_for_status()
    }

    async fn publish(
        &self,
        topic: &MqttTopic,
        payload: String,
    ) -> std::result::Result<(), TransportError> {
        self.mqtt.publish(topic, payload).await
    }

    fn should_query(&self, characteristic: Characteristic) -> bool {
        self.inner
            .lock()
            .caches
            .get(&characteristic)
            .is_none_or(crate::cache::QueryCache::should_query)
    }

    fn is_infinite(&self, characteristic: Characteristic) -> bool {
        self.inner
            .lock()
            .caches
            .get(&characteristic)
            .is_some_and(crate::cache::QueryCache::is_infinite)
    }

    fn mark_queried(&self, characteristic: Characteristic) {
        if let Some(cache) = self.inner.lock().caches.get_mut(&characteristic) {
            cache.queried();
        }
    }

    fn stored(&self, characteristic: Characteristic) -> f64 {
        self.inner
            .lock()
            .state
            .number(characteristic)
            .unwrap_or_default()
    }

    // ========== Capability interface ==========

    /// Returns the get/set interface of `characteristic`, if registered.
    #[must_use]
    pub fn handler(
        &self,
        characteristic: Characteristic,
    ) -> Option<CharacteristicHandler<'_, H, M>> {
        self.characteristics()
            .contains(&characteristic)
            .then_some(CharacteristicHandler {
                accessory: self,
                characteristic,
            })
    }
}

/// Get/set interface of one characteristic, as registered with a host.
///
/// Values are exchanged as [`CharacteristicValue`]: booleans for power,
/// canonical numbers for everything else.
#[derive(Debug)]
pub struct CharacteristicHandler<'a, H, M> {
    accessory: &'a LightbulbAccessory<H, M>,
    characteristic: Characteristic,
}

impl<H: HttpTransport, M: MqttTransport> CharacteristicHandler<'_, H, M> {
    /// Returns the characteristic this handler serves.
    #[must_use]
    pub const fn characteristic(&self) -> Characteristic {
        self.characteristic
    }

    /// Reads the current value.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying read.
    pub async fn get(&self) -> Result<CharacteristicValue> {
        match self.characteristic {
            Characteristic::On => self.accessory.get_power().await.map(CharacteristicValue::Bool),
            c => self
                .accessory
                .get_value(c)
                .await
                .map(CharacteristicValue::Number),
        }
    }

    /// Writes a new value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for a boolean given to a numeric
    /// characteristic, or the error of the underlying write.
    pub async fn set(&self, value: CharacteristicValue) -> Result<()> {
        match self.characteristic {
            Characteristic::On => self.accessory.set_power(value.as_bool()).await,
            c => {
                let number = value.as_number().ok_or_else(|| Error::InvalidValue {
                    characteristic: c,
                    message: format!("expected a number, got {value}"),
                })?;
                self.accessory.set_value(c, number).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::tests::{FakeHttp, FakeMqtt, color_lamp, config};
    use super::*;
    use crate::error::{PatternError, RangeError};
    use crate::event::LightEvent;

    #[tokio::test]
    async fn power_get_uses_presence_pattern() {
        let (lamp, http) = color_lamp();
        http.respond(200, "state=1");
        assert!(lamp.get_power().await.unwrap());
        http.respond(200, "state=0");
        assert!(!lamp.get_power().await.unwrap());
        assert_eq!(http.sent(), vec!["GET http://lamp/status", "GET http://lamp/status"]);
    }

    #[tokio::test]
    async fn power_set_picks_url() {
        let (lamp, http) = color_lamp();
        lamp.set_power(true).await.unwrap();
        lamp.set_power(false).await.unwrap();
        assert_eq!(http.sent(), vec!["GET http://lamp/on", "GET http://lamp/off"]);
        assert!(!lamp.state().power());
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() {
        let (lamp, http) = color_lamp();
        http.respond(503, "busy");
        let err = lamp.set_power(true).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::Status { status: 503, .. })
        ));
        assert!(!lamp.state().power());
    }

    #[tokio::test]
    async fn brightness_read_converts_rgb() {
        let http = FakeHttp::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({
                "brightness": {
                    "setUrl": "http://lamp/b/%s",
                    "statusUrl": "http://lamp/b",
                    "unit": "rgb",
                    "statusPattern": "raw=([0-9]+)"
                }
            })),
            http.clone(),
        );
        http.respond(200, "raw=180");
        let value = lamp.get_value(Characteristic::Brightness).await.unwrap();
        assert!((value - 71.0).abs() < f64::EPSILON);
        assert_eq!(lamp.state().brightness(), Some(71.0));
    }

    #[tokio::test]
    async fn read_failures_are_distinct() {
        let (lamp, http) = color_lamp();

        http.respond(200, "no digits here");
        assert!(matches!(
            lamp.get_value(Characteristic::Brightness).await,
            Err(Error::Pattern(PatternError::NoMatch { .. }))
        ));

        http.respond(200, "level 250");
        assert!(matches!(
            lamp.get_value(Characteristic::Brightness).await,
            Err(Error::Range(RangeError { value, .. })) if (value - 250.0).abs() < f64::EPSILON
        ));

        http.respond(404, "");
        assert!(matches!(
            lamp.get_value(Characteristic::Brightness).await,
            Err(Error::Transport(TransportError::Status { status: 404, .. }))
        ));
        assert_eq!(lamp.state().brightness(), Some(0.0));
    }

    #[tokio::test]
    async fn color_temperature_outside_temperature_mode_returns_min() {
        let (lamp, http) = color_lamp();
        let value = lamp.get_value(Characteristic::ColorTemperature).await.unwrap();
        assert!((value - 50.0).abs() < f64::EPSILON);
        assert!(http.sent().is_empty());
    }

    #[tokio::test]
    async fn kelvin_write_and_derived_hue() {
        let (lamp, http) = color_lamp();
        let mut events = lamp.subscribe();

        lamp.set_value(Characteristic::ColorTemperature, 250.0)
            .await
            .unwrap();

        assert_eq!(http.sent(), vec!["GET http://lamp/ct?k=4000"]);
        assert_eq!(lamp.color_mode(), ColorMode::Temperature);
        let state = lamp.state();
        assert_eq!(state.color_temperature(), Some(250.0));
        assert_eq!(state.hue(), Some(27.0));
        assert_eq!(state.saturation(), Some(35.0));

        assert!(matches!(
            events.try_recv().unwrap(),
            LightEvent::ColorModeChanged { mode: ColorMode::Temperature }
        ));

        // Hue is not authoritative in temperature mode
        let hue = lamp.get_value(Characteristic::Hue).await.unwrap();
        assert!((hue - 27.0).abs() < f64::EPSILON);
        assert_eq!(http.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_write_keeps_mode() {
        let (lamp, http) = color_lamp();
        http.respond(500, "");
        assert!(lamp.set_value(Characteristic::Hue, 120.0).await.is_err());
        assert_eq!(lamp.color_mode(), ColorMode::Undefined);
        assert_eq!(lamp.state().hue(), Some(0.0));
    }

    #[tokio::test]
    async fn hue_write_substitutes_siblings() {
        let (lamp, http) = color_lamp();
        lamp.set_value(Characteristic::Saturation, 80.0).await.unwrap();
        lamp.set_value(Characteristic::Hue, 120.0).await.unwrap();

        assert_eq!(
            http.sent(),
            vec!["GET http://lamp/c?h=0&s=80", "GET http://lamp/c?h=120&s=80"]
        );
        assert_eq!(lamp.color_mode(), ColorMode::Color);
        // no temperature derived from hue/saturation writes
        assert_eq!(lamp.state().color_temperature(), Some(50.0));
    }

    #[tokio::test]
    async fn out_of_range_write_is_rejected_locally() {
        let (lamp, http) = color_lamp();
        assert!(matches!(
            lamp.set_value(Characteristic::Hue, 361.0).await,
            Err(Error::Range(_))
        ));
        assert!(http.sent().is_empty());
    }

    #[tokio::test]
    async fn withheld_power_on_after_brightness() {
        let http = FakeHttp::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({
                "brightness": {
                    "setUrl": "http://lamp/b/%s",
                    "statusUrl": "http://lamp/b",
                    "withholdPowerUpdate": true
                }
            })),
            http.clone(),
        );
        lamp.set_power(true).await.unwrap();
        lamp.set_value(Characteristic::Brightness, 50.0).await.unwrap();
        lamp.set_power(true).await.unwrap();
        // consumed: the next power-on goes out again
        lamp.set_power(true).await.unwrap();

        assert_eq!(
            http.sent(),
            vec!["GET http://lamp/on", "GET http://lamp/b/50", "GET http://lamp/on"]
        );
    }

    #[tokio::test]
    async fn power_off_consumes_withhold_without_suppression() {
        let http = FakeHttp::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({
                "brightness": {
                    "setUrl": "http://lamp/b/%s",
                    "statusUrl": "http://lamp/b",
                    "withholdPowerUpdate": true
                }
            })),
            http.clone(),
        );
        lamp.set_power(true).await.unwrap();
        lamp.set_value(Characteristic::Brightness, 30.0).await.unwrap();
        lamp.set_power(false).await.unwrap();
        lamp.set_power(true).await.unwrap();
        assert_eq!(http.sent().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_gate_limits_reads() {
        let http = FakeHttp::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({ "statusCache": 5000 })),
            http.clone(),
        );
        http.respond(200, "1");
        assert!(lamp.get_power().await.unwrap());
        assert!(lamp.get_power().await.unwrap());
        assert_eq!(http.sent().len(), 1);

        tokio::time::advance(Duration::from_millis(5000)).await;
        http.respond(200, "0");
        assert!(!lamp.get_power().await.unwrap());
        assert_eq!(http.sent().len(), 2);
    }

    #[tokio::test]
    async fn infinite_cache_never_reads() {
        let http = FakeHttp::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({ "statusCache": -1 })),
            http.clone(),
        );
        assert!(!lamp.get_power().await.unwrap());
        assert!(http.sent().is_empty());
    }

    #[tokio::test]
    async fn mqtt_channels_publish_native_values() {
        let mqtt = FakeMqtt::default();
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({
                "mqtt": { "host": "broker" },
                "hue": { "setTopic": "lamp/hue/set", "getTopic": "lamp/hue", "unit": "zigbee" }
            })),
            FakeHttp::default(),
        )
        .with_mqtt(mqtt.clone());

        lamp.set_value(Characteristic::Hue, 180.0).await.unwrap();
        assert_eq!(
            mqtt.published.lock().clone(),
            vec![("lamp/hue/set".to_string(), "32768".to_string())]
        );

        // push-only: reads never leave the process
        let hue = lamp.get_value(Characteristic::Hue).await.unwrap();
        assert!((hue - 180.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn mqtt_channel_without_broker_fails() {
        let lamp = LightbulbAccessory::new(
            config(serde_json::json!({
                "mqtt": { "host": "broker" },
                "brightness": { "setTopic": "lamp/b/set", "getTopic": "lamp/b" }
            })),
            FakeHttp::default(),
        );
        assert!(matches!(
            lamp.set_value(Characteristic::Brightness, 10.0).await,
            Err(Error::Transport(TransportError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn handler_dispatches_by_kind() {
        let (lamp, http) = color_lamp();
        let handler = lamp.handler(Characteristic::Brightness).unwrap();
        handler.set(CharacteristicValue::Number(40.0)).await.unwrap();
        assert!(matches!(
            handler.set(CharacteristicValue::Bool(true)).await,
            Err(Error::InvalidValue { .. })
        ));
        assert_eq!(http.sent(), vec!["GET http://lamp/b?v=40"]);

        let power = lamp.handler(Characteristic::On).unwrap();
        http.respond(200, "1");
        assert_eq!(power.get().await.unwrap(), CharacteristicValue::Bool(true));
    }

    #[test]
    fn handler_absent_for_unregistered() {
        let lamp = LightbulbAccessory::new(config(serde_json::json!({})), FakeHttp::default());
        assert!(lamp.handler(Characteristic::Hue).is_none());
        assert!(lamp.handler(Characteristic::On).is_some());
    }

    // Hue/saturation writes leave the stored color temperature alone.
    #[tokio::test]
    async fn hue_set_does_not_derive_temperature() {
        let (lamp, http) = color_lamp();
        lamp.set_value(Characteristic::ColorTemperature, 250.0).await.unwrap();
        lamp.set_value(Characteristic::Hue, 120.0).await.unwrap();

        assert_eq!(lamp.color_mode(), ColorMode::Color);
        assert_eq!(lamp.state().color_temperature(), Some(250.0));
        assert_eq!(http.sent().len(), 2);
    }
}
