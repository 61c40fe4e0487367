// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for the light model.
//!
//! # Types
//!
//! - [`Characteristic`] - The five controllable characteristics
//! - [`CharacteristicValue`] - A boolean or numeric value exchanged with the host
//! - [`ColorMode`] - Whether hue/saturation or color temperature is authoritative
//! - [`BrightnessUnit`], [`HueUnit`], [`SaturationUnit`], [`TemperatureUnit`] -
//!   Device-native units and their canonical conversions
//! - [`Rgb`], [`Hsv`] - Color triples used by the temperature fallback

mod characteristic;
mod color;
mod color_mode;
mod units;

pub use characteristic::{Characteristic, CharacteristicValue};
pub use color::{BlackBodyConversion, Hsv, HueSaturation, HueSaturationConversion, Rgb};
pub use color_mode::ColorMode;
pub use units::{BrightnessUnit, HueUnit, SaturationUnit, TemperatureUnit, Unit};
