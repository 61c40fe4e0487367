// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolved, immutable channel configuration.

use crate::cache::CacheTtl;
use crate::error::RangeError;
use crate::pattern::StatusPattern;
use crate::protocol::{HttpRequest, MqttTopics};
use crate::types::{Characteristic, Unit};

/// Legal canonical range of a numeric characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
}

impl ValueRange {
    /// Brightness and saturation: 0-100 %.
    pub const PERCENT: Self = Self::new(0.0, 100.0);

    /// Hue: 0-360 degrees.
    pub const DEGREES: Self = Self::new(0.0, 360.0);

    /// Default color temperature bounds in mired.
    pub const MIRED: Self = Self::new(50.0, 400.0);

    /// Creates a range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns the default range for a numeric characteristic.
    #[must_use]
    pub const fn for_characteristic(characteristic: Characteristic) -> Self {
        match characteristic {
            Characteristic::Hue => Self::DEGREES,
            Characteristic::ColorTemperature => Self::MIRED,
            Characteristic::On | Characteristic::Brightness | Characteristic::Saturation => {
                Self::PERCENT
            }
        }
    }

    /// Returns `true` if `value` lies within the bounds.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Validates a canonical value.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] if `value` is outside the bounds.
    pub fn check(&self, characteristic: Characteristic, value: f64) -> Result<f64, RangeError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(RangeError {
                characteristic,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Endpoints of a numeric channel.
#[derive(Debug, Clone)]
pub enum ChannelEndpoints {
    /// Polled over HTTP.
    Http {
        /// Request writing a new value.
        set: HttpRequest,
        /// Request reading the current value.
        status: HttpRequest,
    },
    /// Driven by MQTT; reads are served from pushed state.
    Mqtt(MqttTopics),
}

/// Endpoints of the power channel.
#[derive(Debug, Clone)]
pub enum PowerEndpoints {
    /// Polled over HTTP.
    Http {
        /// Request turning the light on.
        on: HttpRequest,
        /// Request turning the light off.
        off: HttpRequest,
        /// Request reading the power state.
        status: HttpRequest,
    },
    /// Driven by MQTT; reads are served from pushed state.
    Mqtt(MqttTopics),
}

/// Resolved configuration of the power channel.
#[derive(Debug, Clone)]
pub struct PowerConfig {
    /// Where power is read and written.
    pub endpoints: PowerEndpoints,
    /// Presence test applied to status bodies.
    pub pattern: StatusPattern,
    /// Query gate TTL.
    pub cache: CacheTtl,
}

impl PowerConfig {
    /// Returns `true` if power is driven by MQTT.
    #[must_use]
    pub fn is_push_only(&self) -> bool {
        matches!(self.endpoints, PowerEndpoints::Mqtt(_))
    }

    /// Returns the MQTT topics, if power is MQTT-driven.
    #[must_use]
    pub fn mqtt_topics(&self) -> Option<&MqttTopics> {
        match &self.endpoints {
            PowerEndpoints::Mqtt(topics) => Some(topics),
            PowerEndpoints::Http { .. } => None,
        }
    }
}

/// Resolved configuration of a numeric channel (brightness, hue, saturation
/// or color temperature).
///
/// The [`Unit`] variant determines which characteristic this is.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Device-native unit.
    pub unit: Unit,
    /// Extraction pattern for status bodies.
    pub pattern: StatusPattern,
    /// Where the value is read and written.
    pub endpoints: ChannelEndpoints,
    /// Legal canonical range.
    pub range: ValueRange,
    /// Query gate TTL.
    pub cache: CacheTtl,
    /// Suppress the power-on that follows a brightness write.
    ///
    /// Only meaningful for brightness.
    pub withhold_power_update: bool,
}

impl ChannelConfig {
    /// Returns the characteristic this channel serves.
    #[must_use]
    pub const fn characteristic(&self) -> Characteristic {
        self.unit.characteristic()
    }

    /// Returns `true` if the channel is driven by MQTT.
    #[must_use]
    pub fn is_push_only(&self) -> bool {
        matches!(self.endpoints, ChannelEndpoints::Mqtt(_))
    }

    /// Returns the MQTT topics, if the channel is MQTT-driven.
    #[must_use]
    pub fn mqtt_topics(&self) -> Option<&MqttTopics> {
        match &self.endpoints {
            ChannelEndpoints::Mqtt(topics) => Some(topics),
            ChannelEndpoints::Http { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        let range = ValueRange::PERCENT;
        assert!(range.check(Characteristic::Brightness, 100.0).is_ok());
        let err = range.check(Characteristic::Brightness, 101.0).unwrap_err();
        assert!((err.value - 101.0).abs() < f64::EPSILON);
        assert!(!range.contains(-1.0));
    }

    #[test]
    fn default_ranges() {
        assert_eq!(ValueRange::for_characteristic(Characteristic::Hue), ValueRange::DEGREES);
        assert_eq!(
            ValueRange::for_characteristic(Characteristic::ColorTemperature),
            ValueRange::new(50.0, 400.0)
        );
    }
}
