// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! State changes are the unit of update for a [`LightState`](super::LightState).
//! Every canonical value stored by a get, set or push is expressed as a
//! change, applied to the state and then broadcast so the host can mirror it.
//!
//! # Examples
//!
//! ```
//! use http_lightbulb::state::{LightState, StateChange};
//!
//! let mut state = LightState::with_channels(true, false, false, None);
//!
//! // Apply returns true if state actually changed
//! assert!(state.apply(&StateChange::Brightness(40.0)));
//! assert!(!state.apply(&StateChange::Brightness(40.0)));
//! ```

use crate::types::{Characteristic, CharacteristicValue};

/// A change of one canonical characteristic value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StateChange {
    /// Power turned on or off.
    Power(bool),

    /// Brightness in percent.
    Brightness(f64),

    /// Hue in degrees.
    Hue(f64),

    /// Saturation in percent.
    Saturation(f64),

    /// Color temperature in mired.
    ColorTemperature(f64),

    /// Multiple changes at once.
    ///
    /// Used when a color temperature update also refreshes the derived hue
    /// and saturation.
    Batch(Vec<StateChange>),
}

impl StateChange {
    /// Builds a change from a characteristic and its canonical value.
    ///
    /// Returns `None` when the value kind does not fit the characteristic
    /// (a boolean for brightness, for instance).
    #[must_use]
    pub fn from_value(characteristic: Characteristic, value: CharacteristicValue) -> Option<Self> {
        match characteristic {
            Characteristic::On => Some(Self::Power(value.as_bool())),
            Characteristic::Brightness => value.as_number().map(Self::Brightness),
            Characteristic::Hue => value.as_number().map(Self::Hue),
            Characteristic::Saturation => value.as_number().map(Self::Saturation),
            Characteristic::ColorTemperature => value.as_number().map(Self::ColorTemperature),
        }
    }

    /// Returns the characteristic this change targets, or `None` for a batch.
    #[must_use]
    pub const fn characteristic(&self) -> Option<Characteristic> {
        match self {
            Self::Power(_) => Some(Characteristic::On),
            Self::Brightness(_) => Some(Characteristic::Brightness),
            Self::Hue(_) => Some(Characteristic::Hue),
            Self::Saturation(_) => Some(Characteristic::Saturation),
            Self::ColorTemperature(_) => Some(Characteristic::ColorTemperature),
            Self::Batch(_) => None,
        }
    }

    /// Returns the carried value, or `None` for a batch.
    #[must_use]
    pub fn value(&self) -> Option<CharacteristicValue> {
        match self {
            Self::Power(on) => Some(CharacteristicValue::Bool(*on)),
            Self::Brightness(v) | Self::Hue(v) | Self::Saturation(v) | Self::ColorTemperature(v) => {
                Some(CharacteristicValue::Number(*v))
            }
            Self::Batch(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_matches_kind() {
        assert_eq!(
            StateChange::from_value(Characteristic::On, CharacteristicValue::Bool(true)),
            Some(StateChange::Power(true))
        );
        assert_eq!(
            StateChange::from_value(Characteristic::Hue, CharacteristicValue::Number(180.0)),
            Some(StateChange::Hue(180.0))
        );
        assert_eq!(
            StateChange::from_value(Characteristic::Brightness, CharacteristicValue::Bool(true)),
            None
        );
    }

    #[test]
    fn characteristic_and_value() {
        let change = StateChange::ColorTemperature(250.0);
        assert_eq!(change.characteristic(), Some(Characteristic::ColorTemperature));
        assert_eq!(change.value(), Some(CharacteristicValue::Number(250.0)));
    }
}
