// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Characteristic names and values.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One controllable characteristic of the light.
///
/// The string forms (`"On"`, `"Brightness"`, ...) are the names used by MQTT
/// routing and webhook notifications.
///
/// # Examples
///
/// ```
/// use http_lightbulb::types::Characteristic;
///
/// let c: Characteristic = "ColorTemperature".parse().unwrap();
/// assert_eq!(c, Characteristic::ColorTemperature);
/// assert!("Volume".parse::<Characteristic>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Characteristic {
    /// Power state.
    On,
    /// Brightness in percent.
    Brightness,
    /// Hue in degrees.
    Hue,
    /// Saturation in percent.
    Saturation,
    /// Color temperature in mired.
    ColorTemperature,
}

impl Characteristic {
    /// All characteristics, in polling order.
    pub const ALL: [Self; 5] = [
        Self::On,
        Self::Brightness,
        Self::Hue,
        Self::Saturation,
        Self::ColorTemperature,
    ];

    /// Returns the characteristic name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Brightness => "Brightness",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::ColorTemperature => "ColorTemperature",
        }
    }

    /// Returns the URL/body substitution token carrying this value, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&'static str> {
        match self {
            Self::On => None,
            Self::Brightness => Some("%brightness"),
            Self::Hue => Some("%hue"),
            Self::Saturation => Some("%saturation"),
            Self::ColorTemperature => Some("%colorTemperature"),
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Characteristic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCharacteristic(s.to_string()))
    }
}

/// A characteristic value as exchanged with the host.
///
/// Power is boolean; every other characteristic is numeric.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    /// A power state.
    Bool(bool),
    /// A numeric value in canonical or native units.
    Number(f64),
}

impl CharacteristicValue {
    /// Interprets the value as a power state.
    ///
    /// Numbers are `true` when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(_) => None,
            Self::Number(n) => Some(*n),
        }
    }

    /// Parses a raw push payload (MQTT message body or notification text).
    ///
    /// Accepts `true`/`false`, `on`/`off` and numbers.
    #[must_use]
    pub fn parse_payload(payload: &str) -> Option<Self> {
        let payload = payload.trim();
        match payload.to_ascii_lowercase().as_str() {
            "true" | "on" => return Some(Self::Bool(true)),
            "false" | "off" => return Some(Self::Bool(false)),
            _ => {}
        }
        payload.parse::<f64>().ok().map(Self::Number)
    }

    /// Converts a JSON notification value.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Self::parse_payload(s),
            _ => None,
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characteristic_round_trips_names() {
        for c in Characteristic::ALL {
            assert_eq!(c.as_str().parse::<Characteristic>().unwrap(), c);
        }
    }

    #[test]
    fn unknown_characteristic_is_rejected() {
        let err = "Volume".parse::<Characteristic>().unwrap_err();
        assert!(matches!(err, Error::UnknownCharacteristic(name) if name == "Volume"));
    }

    #[test]
    fn tokens_only_for_numeric_characteristics() {
        assert_eq!(Characteristic::On.token(), None);
        assert_eq!(
            Characteristic::ColorTemperature.token(),
            Some("%colorTemperature")
        );
    }

    #[test]
    fn parse_payload_variants() {
        assert_eq!(
            CharacteristicValue::parse_payload("ON"),
            Some(CharacteristicValue::Bool(true))
        );
        assert_eq!(
            CharacteristicValue::parse_payload(" 42 "),
            Some(CharacteristicValue::Number(42.0))
        );
        assert_eq!(CharacteristicValue::parse_payload("warm"), None);
    }

    #[test]
    fn from_json_values() {
        let v = serde_json::json!(32768);
        assert_eq!(
            CharacteristicValue::from_json(&v),
            Some(CharacteristicValue::Number(32768.0))
        );
        assert_eq!(
            CharacteristicValue::from_json(&serde_json::json!(true)),
            Some(CharacteristicValue::Bool(true))
        );
        assert_eq!(CharacteristicValue::from_json(&serde_json::json!([1])), None);
    }

    #[test]
    fn number_display_has_no_trailing_zero() {
        assert_eq!(CharacteristicValue::Number(50.0).to_string(), "50");
    }
}
