// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical light state tracking.

use crate::types::{Characteristic, CharacteristicValue};

use super::StateChange;

/// Canonical state of one light.
///
/// Power is always tracked. Every other attribute is present only when the
/// device configuration defines the corresponding channel; changes aimed at
/// an absent attribute are ignored.
///
/// # Examples
///
/// ```
/// use http_lightbulb::state::{LightState, StateChange};
///
/// let mut state = LightState::with_channels(true, true, true, Some(140.0));
/// assert_eq!(state.color_temperature(), Some(140.0));
///
/// state.apply(&StateChange::Power(true));
/// assert!(state.power());
/// assert_eq!(state.hue(), Some(0.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LightState {
    power: bool,
    /// Brightness in percent (0-100).
    brightness: Option<f64>,
    /// Hue in degrees (0-360).
    hue: Option<f64>,
    /// Saturation in percent (0-100).
    saturation: Option<f64>,
    /// Color temperature in mired.
    color_temperature: Option<f64>,
}

impl LightState {
    /// Creates a power-only state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the initial state for a device with the given channels.
    ///
    /// Present numeric attributes start at zero; color temperature starts
    /// at the supplied value (usually the lower bound).
    #[must_use]
    pub fn with_channels(
        brightness: bool,
        hue: bool,
        saturation: bool,
        color_temperature: Option<f64>,
    ) -> Self {
        Self {
            power: false,
            brightness: brightness.then_some(0.0),
            hue: hue.then_some(0.0),
            saturation: saturation.then_some(0.0),
            color_temperature,
        }
    }

    // ========== Accessors ==========

    /// Returns `true` if the light is on.
    #[must_use]
    pub const fn power(&self) -> bool {
        self.power
    }

    /// Gets the brightness.
    #[must_use]
    pub const fn brightness(&self) -> Option<f64> {
        self.brightness
    }

    /// Gets the hue.
    #[must_use]
    pub const fn hue(&self) -> Option<f64> {
        self.hue
    }

    /// Gets the saturation.
    #[must_use]
    pub const fn saturation(&self) -> Option<f64> {
        self.saturation
    }

    /// Gets the color temperature.
    #[must_use]
    pub const fn color_temperature(&self) -> Option<f64> {
        self.color_temperature
    }

    /// Returns the stored value of `characteristic`, if tracked.
    #[must_use]
    pub fn get(&self, characteristic: Characteristic) -> Option<CharacteristicValue> {
        match characteristic {
            Characteristic::On => Some(CharacteristicValue::Bool(self.power)),
            Characteristic::Brightness => self.brightness.map(CharacteristicValue::Number),
            Characteristic::Hue => self.hue.map(CharacteristicValue::Number),
            Characteristic::Saturation => self.saturation.map(CharacteristicValue::Number),
            Characteristic::ColorTemperature => {
                self.color_temperature.map(CharacteristicValue::Number)
            }
        }
    }

    /// Returns the stored numeric value of `characteristic`, if tracked.
    #[must_use]
    pub fn number(&self, characteristic: Characteristic) -> Option<f64> {
        self.get(characteristic).and_then(|v| v.as_number())
    }

    // ========== State Changes ==========

    /// Applies a state change and returns whether the state actually changed.
    ///
    /// Changes to untracked attributes leave the state untouched and return
    /// `false`.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        fn replace(slot: &mut Option<f64>, value: f64) -> bool {
            match slot {
                Some(current) if (*current - value).abs() > f64::EPSILON => {
                    *current = value;
                    true
                }
                _ => false,
            }
        }

        match change {
            StateChange::Power(on) => {
                let changed = self.power != *on;
                self.power = *on;
                changed
            }
            StateChange::Brightness(v) => replace(&mut self.brightness, *v),
            StateChange::Hue(v) => replace(&mut self.hue, *v),
            StateChange::Saturation(v) => replace(&mut self.saturation, *v),
            StateChange::ColorTemperature(v) => replace(&mut self.color_temperature, *v),
            StateChange::Batch(changes) => {
                let mut any_changed = false;
                for change in changes {
                    any_changed |= self.apply(change);
                }
                any_changed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_only_state() {
        let state = LightState::new();
        assert!(!state.power());
        assert!(state.brightness().is_none());
        assert_eq!(state.get(Characteristic::On), Some(CharacteristicValue::Bool(false)));
    }

    #[test]
    fn initial_values() {
        let state = LightState::with_channels(true, false, true, Some(50.0));
        assert_eq!(state.brightness(), Some(0.0));
        assert_eq!(state.hue(), None);
        assert_eq!(state.saturation(), Some(0.0));
        assert_eq!(state.number(Characteristic::ColorTemperature), Some(50.0));
    }

    #[test]
    fn apply_power_change() {
        let mut state = LightState::new();
        assert!(state.apply(&StateChange::Power(true)));
        assert!(state.power());

        // Applying same state returns false
        assert!(!state.apply(&StateChange::Power(true)));
    }

    #[test]
    fn apply_ignores_untracked() {
        let mut state = LightState::with_channels(true, false, false, None);
        assert!(!state.apply(&StateChange::Hue(120.0)));
        assert_eq!(state.hue(), None);
    }

    #[test]
    fn apply_batch_changes() {
        let mut state = LightState::with_channels(true, true, true, Some(140.0));
        let changes = StateChange::Batch(vec![
            StateChange::ColorTemperature(250.0),
            StateChange::Hue(27.0),
            StateChange::Saturation(35.0),
        ]);
        assert!(state.apply(&changes));
        assert_eq!(state.color_temperature(), Some(250.0));
        assert_eq!(state.hue(), Some(27.0));
        assert_eq!(state.saturation(), Some(35.0));
        assert!(!state.apply(&changes));
    }
}
