// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device-native units and their conversion to canonical units.
//!
//! Canonical units are percent for brightness and saturation, degrees for
//! hue and mired for color temperature. Each unit converts in both
//! directions with plain arithmetic and rounding; range checks happen at the
//! channel boundary, not here.

use std::fmt;
use std::str::FromStr;

use crate::types::Characteristic;

/// Upper end of the 8-bit scale used by `rgb` units.
const RGB_MAX: f64 = 254.0;

/// Upper end of the Zigbee hue scale.
const ZIGBEE_HUE_MAX: f64 = 65535.0;

/// Numerator of the mired/Kelvin reciprocal.
const MIRED_KELVIN: f64 = 1_000_000.0;

fn percent_from_rgb(raw: f64) -> f64 {
    (raw / RGB_MAX * 100.0).round()
}

fn rgb_from_percent(percent: f64) -> f64 {
    (percent * RGB_MAX / 100.0).round()
}

/// Native unit of the brightness channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BrightnessUnit {
    /// 0-100, identity.
    #[default]
    Percent,
    /// 0-254.
    Rgb,
}

impl BrightnessUnit {
    /// Converts a raw device value to percent.
    #[must_use]
    pub fn to_canonical(self, raw: f64) -> f64 {
        match self {
            Self::Percent => raw,
            Self::Rgb => percent_from_rgb(raw),
        }
    }

    /// Converts a percentage to the device value.
    #[must_use]
    pub fn to_native(self, percent: f64) -> f64 {
        match self {
            Self::Percent => percent,
            Self::Rgb => rgb_from_percent(percent),
        }
    }
}

/// Native unit of the hue channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HueUnit {
    /// 0-360 degrees, identity.
    #[default]
    Hsv,
    /// 0-65535.
    Zigbee,
}

impl HueUnit {
    /// Converts a raw device value to degrees.
    #[must_use]
    pub fn to_canonical(self, raw: f64) -> f64 {
        match self {
            Self::Hsv => raw,
            Self::Zigbee => (raw * 360.0 / ZIGBEE_HUE_MAX).round(),
        }
    }

    /// Converts degrees to the device value.
    #[must_use]
    pub fn to_native(self, degrees: f64) -> f64 {
        match self {
            Self::Hsv => degrees,
            Self::Zigbee => (degrees / 360.0 * ZIGBEE_HUE_MAX).round(),
        }
    }
}

/// Native unit of the saturation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaturationUnit {
    /// 0-100, identity.
    #[default]
    Percent,
    /// 0-254.
    Rgb,
}

impl SaturationUnit {
    /// Converts a raw device value to percent.
    #[must_use]
    pub fn to_canonical(self, raw: f64) -> f64 {
        match self {
            Self::Percent => raw,
            Self::Rgb => percent_from_rgb(raw),
        }
    }

    /// Converts a percentage to the device value.
    #[must_use]
    pub fn to_native(self, percent: f64) -> f64 {
        match self {
            Self::Percent => percent,
            Self::Rgb => rgb_from_percent(percent),
        }
    }
}

/// Native unit of the color temperature channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemperatureUnit {
    /// Micro reciprocal degree, identity.
    #[default]
    Mired,
    /// Kelvin.
    Kelvin,
}

impl TemperatureUnit {
    /// Converts a raw device value to mired.
    ///
    /// The Kelvin transform is its own inverse but lossy: a round trip
    /// through integer rounding does not always return the input.
    #[must_use]
    pub fn to_canonical(self, raw: f64) -> f64 {
        match self {
            Self::Mired => raw,
            Self::Kelvin => (MIRED_KELVIN / raw).round(),
        }
    }

    /// Converts mired to the device value.
    #[must_use]
    pub fn to_native(self, mired: f64) -> f64 {
        match self {
            Self::Mired => mired,
            Self::Kelvin => (MIRED_KELVIN / mired).round(),
        }
    }
}

macro_rules! impl_unit_names {
    ($ty:ty, $label:literal, $($variant:ident => $name:literal),+ $(,)?) => {
        impl $ty {
            /// Returns the configuration name of the unit.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(format!("{other} is an unsupported {} unit", $label)),
                }
            }
        }
    };
}

impl_unit_names!(BrightnessUnit, "brightness", Percent => "percent", Rgb => "rgb");
impl_unit_names!(HueUnit, "hue", Hsv => "hsv", Zigbee => "zigbee");
impl_unit_names!(SaturationUnit, "saturation", Percent => "percent", Rgb => "rgb");
impl_unit_names!(TemperatureUnit, "temperature", Mired => "mired", Kelvin => "kelvin");

/// The unit of a numeric channel, tagged by characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Brightness channel unit.
    Brightness(BrightnessUnit),
    /// Hue channel unit.
    Hue(HueUnit),
    /// Saturation channel unit.
    Saturation(SaturationUnit),
    /// Color temperature channel unit.
    ColorTemperature(TemperatureUnit),
}

impl Unit {
    /// Returns the characteristic this unit belongs to.
    #[must_use]
    pub const fn characteristic(&self) -> Characteristic {
        match self {
            Self::Brightness(_) => Characteristic::Brightness,
            Self::Hue(_) => Characteristic::Hue,
            Self::Saturation(_) => Characteristic::Saturation,
            Self::ColorTemperature(_) => Characteristic::ColorTemperature,
        }
    }

    /// Converts a raw device value to canonical units.
    #[must_use]
    pub fn to_canonical(&self, raw: f64) -> f64 {
        match self {
            Self::Brightness(u) => u.to_canonical(raw),
            Self::Hue(u) => u.to_canonical(raw),
            Self::Saturation(u) => u.to_canonical(raw),
            Self::ColorTemperature(u) => u.to_canonical(raw),
        }
    }

    /// Converts a canonical value to device units.
    #[must_use]
    pub fn to_native(&self, canonical: f64) -> f64 {
        match self {
            Self::Brightness(u) => u.to_native(canonical),
            Self::Hue(u) => u.to_native(canonical),
            Self::Saturation(u) => u.to_native(canonical),
            Self::ColorTemperature(u) => u.to_native(canonical),
        }
    }

    /// Returns the default status pattern for this unit.
    #[must_use]
    pub const fn default_status_pattern(&self) -> &'static str {
        match self {
            Self::Hue(HueUnit::Zigbee) => "([0-9]{1,5})",
            Self::ColorTemperature(TemperatureUnit::Mired) => "([0-9]{2,3})",
            Self::ColorTemperature(TemperatureUnit::Kelvin) => "([0-9]{4,5})",
            Self::Brightness(_) | Self::Hue(HueUnit::Hsv) | Self::Saturation(_) => {
                "([0-9]{1,3})"
            }
        }
    }

    /// Returns `true` when extracted text is parsed as an integer.
    ///
    /// Hue and saturation accept fractional values.
    #[must_use]
    pub const fn parses_integer(&self) -> bool {
        matches!(self, Self::Brightness(_) | Self::ColorTemperature(_))
    }
}
