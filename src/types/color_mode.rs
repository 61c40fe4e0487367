// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Which color representation is currently authoritative.

use std::fmt;

use crate::types::Characteristic;

/// The authoritative color representation of the light.
///
/// Starts [`Undefined`](ColorMode::Undefined) and only moves on successful
/// writes: hue or saturation switch to [`Color`](ColorMode::Color), color
/// temperature switches to [`Temperature`](ColorMode::Temperature). Reads
/// never transition and nothing returns the machine to `Undefined`.
///
/// # Examples
///
/// ```
/// use http_lightbulb::types::{Characteristic, ColorMode};
///
/// let mut mode = ColorMode::default();
/// mode.record_write(Characteristic::Hue);
/// assert_eq!(mode, ColorMode::Color);
///
/// mode.record_write(Characteristic::Brightness);
/// assert_eq!(mode, ColorMode::Color);
///
/// mode.record_write(Characteristic::ColorTemperature);
/// assert_eq!(mode, ColorMode::Temperature);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum ColorMode {
    /// Startup state: nothing color-related has been written yet.
    #[default]
    Undefined,
    /// Hue and saturation are authoritative.
    Color,
    /// Color temperature is authoritative.
    Temperature,
}

impl ColorMode {
    /// Returns the mode a successful write to `characteristic` leads to.
    #[must_use]
    pub const fn after_write(self, characteristic: Characteristic) -> Self {
        match characteristic {
            Characteristic::Hue | Characteristic::Saturation => Self::Color,
            Characteristic::ColorTemperature => Self::Temperature,
            Characteristic::On | Characteristic::Brightness => self,
        }
    }

    /// Applies a successful write. Returns `true` if the mode changed.
    pub fn record_write(&mut self, characteristic: Characteristic) -> bool {
        let next = self.after_write(characteristic);
        let changed = next != *self;
        *self = next;
        changed
    }

    /// Returns `true` if polling and fresh reads of `characteristic` are
    /// allowed in this mode.
    ///
    /// Hue and saturation are only refreshed in `Color` mode, color
    /// temperature only in `Temperature` mode.
    #[must_use]
    pub const fn refreshes(self, characteristic: Characteristic) -> bool {
        match characteristic {
            Characteristic::Hue | Characteristic::Saturation => matches!(self, Self::Color),
            Characteristic::ColorTemperature => matches!(self, Self::Temperature),
            Characteristic::On | Characteristic::Brightness => true,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("UNDEFINED"),
            Self::Color => f.write_str("COLOR"),
            Self::Temperature => f.write_str("TEMPERATURE"),
        }
    }
}
