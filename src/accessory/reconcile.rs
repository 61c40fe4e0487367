// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Folding of polled and pushed updates into the canonical state.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::event::{LightEvent, UpdateSource};
use crate::protocol::{HttpTransport, InboundMessage, MqttTransport};
use crate::state::StateChange;
use crate::types::{Characteristic, CharacteristicValue};

use super::LightbulbAccessory;

/// A webhook notification as delivered by a notification server.
///
/// # Examples
///
/// ```
/// use http_lightbulb::accessory::NotificationEvent;
///
/// let event: NotificationEvent =
///     serde_json::from_str(r#"{"characteristic": "Hue", "value": 32768}"#).unwrap();
/// assert_eq!(event.characteristic, "Hue");
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NotificationEvent {
    /// Characteristic name (`"On"`, `"Brightness"`, ...).
    pub characteristic: String,
    /// New value in the device's native unit.
    pub value: serde_json::Value,
}

impl<H: HttpTransport, M: MqttTransport> LightbulbAccessory<H, M> {
    /// Runs one poll cycle.
    ///
    /// Power and brightness are always refreshed, hue and saturation only in
    /// color mode, color temperature only in temperature mode. Each read
    /// still honors its query gate. A failing channel is logged and skipped.
    pub async fn poll(&self) {
        tracing::debug!(name = %self.name, "Polling device state");

        if let Err(e) = self.read_power(UpdateSource::Poll).await {
            tracing::warn!(error = %e, "Poll of power failed");
        }

        for characteristic in [
            Characteristic::Brightness,
            Characteristic::Hue,
            Characteristic::Saturation,
            Characteristic::ColorTemperature,
        ] {
            if self.channel_config(characteristic).is_none()
                || !self.color_mode().refreshes(characteristic)
            {
                continue;
            }
            if let Err(e) = self.read_value(characteristic, UpdateSource::Poll).await {
                tracing::warn!(%characteristic, error = %e, "Poll failed");
            }
        }
    }

    /// Spawns the poll loop, if a pull interval is configured.
    ///
    /// Returns `false` when polling is disabled. The task ends once the
    /// accessory is dropped or [`shutdown`](Self::shutdown) is called.
    pub fn spawn_poller(self: &Arc<Self>) -> bool
    where
        H: 'static,
        M: 'static,
    {
        let Some(timer) = self.pull_timer.clone() else {
            return false;
        };
        tracing::debug!(interval = ?timer.interval(), "Starting poller");

        let accessory = Arc::downgrade(self);
        self.tasks.push(tokio::spawn(async move {
            loop {
                timer.tick().await;
                let Some(accessory) = accessory.upgrade() else {
                    break;
                };
                accessory.poll().await;
            }
            tracing::debug!("Accessory dropped, poller stopped");
        }));
        true
    }

    /// Spawns a task applying inbound MQTT messages.
    ///
    /// The task ends when the sender side closes, the accessory is dropped
    /// or [`shutdown`](Self::shutdown) is called.
    pub fn spawn_mqtt(self: &Arc<Self>, mut inbound: mpsc::Receiver<InboundMessage>)
    where
        H: 'static,
        M: 'static,
    {
        let accessory = Arc::downgrade(self);
        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let Some(accessory) = accessory.upgrade() else {
                    break;
                };
                accessory.handle_mqtt_message(&message);
            }
            tracing::debug!("MQTT inbound task stopped");
        }));
    }

    /// Applies a message received on a get-topic.
    ///
    /// The payload is a plain value (`true`, `off`, `42`, ...) in the
    /// channel's native unit. Other payloads are run through the channel's
    /// status pattern. Returns the applied change, or `None` if the message
    /// was dropped.
    pub fn handle_mqtt_message(&self, message: &InboundMessage) -> Option<StateChange> {
        let characteristic = message.characteristic;
        let value = match CharacteristicValue::parse_payload(&message.payload) {
            Some(value) => value,
            None if characteristic == Characteristic::On => {
                CharacteristicValue::Bool(self.power.pattern.is_match(&message.payload))
            }
            None => {
                let channel = self.channel_config(characteristic)?;
                match channel
                    .pattern
                    .extract_number(&message.payload, channel.unit.parses_integer())
                {
                    Ok(raw) => CharacteristicValue::Number(raw),
                    Err(e) => {
                        tracing::warn!(
                            %characteristic,
                            payload = %message.payload,
                            error = %e,
                            "Dropping MQTT message"
                        );
                        return None;
                    }
                }
            }
        };
        self.apply_push(characteristic, value, UpdateSource::Mqtt)
    }

    /// Applies a webhook notification.
    ///
    /// Notifications naming a characteristic that is not registered on this
    /// accessory are logged and ignored.
    pub fn handle_notification(&self, event: &NotificationEvent) -> Option<StateChange> {
        let characteristic = match event.characteristic.parse::<Characteristic>() {
            Ok(c) if self.characteristics().contains(&c) => c,
            _ => {
                tracing::warn!(
                    characteristic = %event.characteristic,
                    "Notification for a characteristic not registered on this accessory"
                );
                return None;
            }
        };
        let Some(value) = CharacteristicValue::from_json(&event.value) else {
            tracing::warn!(
                %characteristic,
                value = %event.value,
                "Dropping notification with unusable value"
            );
            return None;
        };
        self.apply_push(characteristic, value, UpdateSource::Notification)
    }

    /// Converts a pushed native value and folds it into the state.
    fn apply_push(
        &self,
        characteristic: Characteristic,
        value: CharacteristicValue,
        source: UpdateSource,
    ) -> Option<StateChange> {
        let change = if characteristic == Characteristic::On {
            StateChange::Power(value.as_bool())
        } else {
            let channel = self.channel_config(characteristic)?;
            let Some(raw) = value.as_number() else {
                tracing::warn!(%characteristic, %value, ?source, "Dropping non-numeric update");
                return None;
            };
            let canonical = channel.unit.to_canonical(raw);
            if let Err(e) = channel.range.check(characteristic, canonical) {
                tracing::warn!(?source, error = %e, "Dropping out of range update");
                return None;
            }
            StateChange::from_value(characteristic, canonical.into())?
        };

        tracing::info!(%characteristic, value = ?change.value(), ?source, "Applying pushed update");

        self.record_mode(characteristic);
        self.reset_pull_timer();
        self.store(change.clone(), source);
        if let StateChange::ColorTemperature(mired) = change {
            self.derive_from_temperature(mired, source);
        }
        Some(change)
    }
}

impl<H, M> LightbulbAccessory<H, M> {
    /// Stores a canonical change and broadcasts it.
    pub(super) fn store(&self, change: StateChange, source: UpdateSource) {
        let new_state = {
            let mut inner = self.inner.lock();
            inner.state.apply(&change);
            inner.state.clone()
        };
        self.events.publish(LightEvent::StateChanged {
            change,
            source,
            new_state,
        });
    }

    /// Moves the color mode after a successful write to `characteristic`.
    pub(super) fn record_mode(&self, characteristic: Characteristic) {
        let changed = {
            let mut inner = self.inner.lock();
            inner.mode.record_write(characteristic).then_some(inner.mode)
        };
        if let Some(mode) = changed {
            tracing::info!(%mode, "Color mode changed");
            self.events.publish(LightEvent::ColorModeChanged { mode });
        }
    }

    /// Refreshes hue and saturation from a color temperature in mired.
    pub(super) fn derive_from_temperature(&self, mired: f64, source: UpdateSource) {
        if self.hue.is_none() && self.saturation.is_none() {
            return;
        }

        let derived = self.conversion.hue_saturation(mired);
        tracing::debug!(
            mired,
            hue = derived.hue,
            saturation = derived.saturation,
            "Derived color from temperature"
        );

        let mut changes = Vec::with_capacity(2);
        if self.hue.is_some() {
            changes.push(StateChange::Hue(derived.hue));
        }
        if self.saturation.is_some() {
            changes.push(StateChange::Saturation(derived.saturation));
        }
        self.store(StateChange::Batch(changes), source);
    }
}
