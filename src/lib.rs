// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `http_lightbulb` - bridge HTTP/MQTT-controlled lights to a canonical
//! light model.
//!
//! Many lights expose no unified protocol: every characteristic has its own
//! URL or MQTT topic to write to, and its own status endpoint whose body has
//! to be scraped with a pattern. This library presents such a device as one
//! consistent light with power, brightness, hue, saturation and color
//! temperature in canonical units (percent, degrees, mired).
//!
//! # Supported Features
//!
//! - **Unit conversion**: RGB 0-254 scale, Zigbee hue, Kelvin
//! - **Color mode**: hue/saturation vs. color temperature, with derived
//!   hue/saturation after temperature changes
//! - **Query gating**: per-channel cache TTLs (always, timed, infinite)
//! - **Pattern extraction**: configurable regex and capture group per channel
//! - **Push updates**: MQTT get-topics and webhook notifications
//! - **Polling**: resettable pull interval
//!
//! # Quick Start
//!
//! ```no_run
//! use http_lightbulb::{Characteristic, ConnectedLightbulb, LightbulbConfig};
//!
//! #[tokio::main]
//! async fn main() -> http_lightbulb::Result<()> {
//!     let config = LightbulbConfig::from_json(r#"{
//!         "name": "Living room",
//!         "onUrl": "http://192.168.1.80/on",
//!         "offUrl": "http://192.168.1.80/off",
//!         "statusUrl": "http://192.168.1.80/status",
//!         "pullInterval": 30000,
//!         "brightness": {
//!             "setUrl": "http://192.168.1.80/brightness?value=%s",
//!             "statusUrl": "http://192.168.1.80/brightness",
//!             "unit": "rgb"
//!         }
//!     }"#)?
//!     .resolve()?;
//!
//!     let lamp = ConnectedLightbulb::connect(config).await?;
//!     lamp.set_power(true).await?;
//!     lamp.set_value(Characteristic::Brightness, 60.0).await?;
//!
//!     let mut events = lamp.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Custom transports
//!
//! The accessory only depends on the [`protocol::HttpTransport`] and
//! [`protocol::MqttTransport`] traits. Disable the default features to bring
//! your own clients.

pub mod accessory;
pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod pattern;
pub mod protocol;
mod pull_timer;
pub mod state;
pub mod types;

#[cfg(all(feature = "http", feature = "mqtt"))]
pub use accessory::ConnectedLightbulb;
pub use accessory::{
    AccessoryInformation, CharacteristicHandler, LightbulbAccessory, NotificationEvent,
};
pub use cache::{CacheTtl, QueryCache};
pub use config::{LightbulbConfig, ResolvedConfig};
pub use error::{ConfigError, Error, PatternError, RangeError, Result, TransportError};
pub use event::{LightEvent, LightEvents, UpdateSource};
pub use pattern::StatusPattern;
pub use pull_timer::PullTimer;
pub use state::{LightState, StateChange};
pub use types::{
    BlackBodyConversion, Characteristic, CharacteristicValue, ColorMode, HueSaturation,
    HueSaturationConversion, Unit,
};
