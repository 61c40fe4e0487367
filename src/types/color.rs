// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color temperature to hue/saturation derivation.
//!
//! When a color temperature lands on a light that also exposes hue and
//! saturation, those two are refreshed from the temperature so both
//! representations agree. The derivation is pluggable through
//! [`HueSaturationConversion`]; [`BlackBodyConversion`] is the built-in
//! approximation used when the host has nothing better.

use std::fmt;

/// An RGB triple with channels in `0.0..=255.0`.
///
/// Channels are kept fractional; the black-body approximation rarely lands
/// on whole numbers and rounding early skews the derived hue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red channel.
    pub red: f64,
    /// Green channel.
    pub green: f64,
    /// Blue channel.
    pub blue: f64,
}

impl Rgb {
    /// Creates a new RGB triple.
    #[must_use]
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Approximates the color of a black body at the given temperature.
    ///
    /// Takes the temperature in mired, converts it to Kelvin and evaluates
    /// the usual piecewise fit on `kelvin / 100`. Each channel is clamped
    /// to `0..=255`.
    ///
    /// # Examples
    ///
    /// ```
    /// use http_lightbulb::types::Rgb;
    ///
    /// // 2000 K is a deep orange
    /// let rgb = Rgb::from_color_temperature(500.0);
    /// assert!((rgb.red - 255.0).abs() < f64::EPSILON);
    /// assert!(rgb.green > rgb.blue);
    /// ```
    #[must_use]
    pub fn from_color_temperature(mired: f64) -> Self {
        let temperature = 1_000_000.0 / mired / 100.0;

        let red = if temperature <= 66.0 {
            255.0
        } else {
            clamp_channel(329.698_727_446 * (temperature - 60.0).powf(-0.133_204_759_2))
        };

        let green = if temperature <= 66.0 {
            clamp_channel(99.470_802_586_1 * temperature.ln() - 161.119_568_166_1)
        } else {
            clamp_channel(288.122_169_528_3 * (temperature - 60.0).powf(-0.075_514_849_2))
        };

        let blue = if temperature >= 66.0 {
            255.0
        } else if temperature <= 19.0 {
            0.0
        } else {
            clamp_channel(138.517_731_223_1 * (temperature - 10.0).ln() - 305.044_792_730_7)
        };

        Self::new(red, green, blue)
    }

    /// Converts to HSV by max/min channel decomposition.
    ///
    /// Hue, saturation and value are rounded to whole numbers.
    #[must_use]
    #[allow(clippy::many_single_char_names)]
    pub fn to_hsv(&self) -> Hsv {
        let r = self.red / 255.0;
        let g = self.green / 255.0;
        let b = self.blue / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let saturation = if max == 0.0 { 0.0 } else { delta / max };

        let hue = if delta <= f64::EPSILON {
            0.0
        } else if (max - r).abs() <= f64::EPSILON {
            60.0 * ((g - b) / delta)
        } else if (max - g).abs() <= f64::EPSILON {
            60.0 * (2.0 + (b - r) / delta)
        } else {
            60.0 * (4.0 + (r - g) / delta)
        };
        let hue = if hue < 0.0 { hue + 360.0 } else { hue };

        Hsv {
            hue: hue.round(),
            saturation: (saturation * 100.0).round(),
            value: (max * 100.0).round(),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({:.0}, {:.0}, {:.0})", self.red, self.green, self.blue)
    }
}

fn clamp_channel(value: f64) -> f64 {
    value.clamp(0.0, 255.0)
}

/// A color in HSV form: hue in degrees, saturation and value in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue in degrees (0-360).
    pub hue: f64,
    /// Saturation in percent (0-100).
    pub saturation: f64,
    /// Value in percent (0-100).
    pub value: f64,
}

/// Hue and saturation derived from a color temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueSaturation {
    /// Hue in degrees.
    pub hue: f64,
    /// Saturation in percent.
    pub saturation: f64,
}

/// Maps a color temperature in mired to hue and saturation.
///
/// Hosts with a native adaptive-lighting conversion can plug it in through
/// [`LightbulbAccessory::with_conversion`](crate::LightbulbAccessory::with_conversion).
pub trait HueSaturationConversion: Send + Sync {
    /// Derives hue and saturation for the given temperature.
    fn hue_saturation(&self, mired: f64) -> HueSaturation;
}

/// Black-body fallback: mired to RGB to HSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackBodyConversion;

impl HueSaturationConversion for BlackBodyConversion {
    fn hue_saturation(&self, mired: f64) -> HueSaturation {
        let hsv = Rgb::from_color_temperature(mired).to_hsv();
        HueSaturation {
            hue: hsv.hue,
            saturation: hsv.saturation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(mired: f64) -> (f64, f64) {
        let hs = BlackBodyConversion.hue_saturation(mired);
        (hs.hue, hs.saturation)
    }

    #[test]
    fn warm_temperature_is_orange() {
        let rgb = Rgb::from_color_temperature(500.0);
        assert!((rgb.red - 255.0).abs() < f64::EPSILON);
        assert!((rgb.green - 136.868).abs() < 0.01);
        assert!((rgb.blue - 13.904).abs() < 0.01);
        assert_eq!(derive(500.0), (31.0, 95.0));
    }

    #[test]
    fn neutral_temperature() {
        let rgb = Rgb::from_color_temperature(250.0);
        assert!((rgb.green - 205.816).abs() < 0.01);
        assert!((rgb.blue - 166.081).abs() < 0.01);
        assert_eq!(derive(250.0), (27.0, 35.0));
        assert_eq!(derive(370.0), (28.0, 66.0));
    }

    #[test]
    fn cold_temperature_is_bluish() {
        let rgb = Rgb::from_color_temperature(140.0);
        assert!((rgb.blue - 255.0).abs() < f64::EPSILON);
        assert!((rgb.red - 238.335).abs() < 0.01);
        assert_eq!(derive(140.0), (235.0, 7.0));
        assert_eq!(derive(50.0), (220.0, 33.0));
    }

    #[test]
    fn very_warm_temperature_clamps_blue() {
        let rgb = Rgb::from_color_temperature(1000.0);
        assert!(rgb.blue.abs() < f64::EPSILON);
        assert_eq!(derive(1000.0), (16.0, 100.0));
    }

    #[test]
    fn grey_has_no_hue() {
        let hsv = Rgb::new(128.0, 128.0, 128.0).to_hsv();
        assert!(hsv.hue.abs() < f64::EPSILON);
        assert!(hsv.saturation.abs() < f64::EPSILON);
        assert!((hsv.value - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn magenta_hue_wraps_positive() {
        let hsv = Rgb::new(255.0, 0.0, 128.0).to_hsv();
        assert!((hsv.hue - 330.0).abs() < 1.0);
    }

    #[test]
    fn black_has_zero_saturation() {
        let hsv = Rgb::new(0.0, 0.0, 0.0).to_hsv();
        assert!(hsv.saturation.abs() < f64::EPSILON);
    }
}
