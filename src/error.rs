// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the lightbulb bridge.
//!
//! The hierarchy mirrors the ways a characteristic operation can fail:
//! configuration problems found at construction, transport failures,
//! status bodies that don't match their extraction pattern, and values
//! outside a characteristic's legal range.

use thiserror::Error;

use crate::types::Characteristic;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The accessory or one of its channels is misconfigured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The request to the device failed or returned a non-2xx status.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A status body did not match the configured extraction pattern.
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// A canonical value is outside the characteristic's legal range.
    #[error("range error: {0}")]
    Range(#[from] RangeError),

    /// A push or notification named a characteristic this device doesn't have.
    #[error("unknown characteristic: {0}")]
    UnknownCharacteristic(String),

    /// The characteristic exists but no channel is configured for it.
    #[error("characteristic {0} is not configured on this device")]
    ChannelNotConfigured(Characteristic),

    /// A value could not be interpreted for the characteristic.
    #[error("invalid value for {characteristic}: {message}")]
    InvalidValue {
        /// The characteristic the value was meant for.
        characteristic: Characteristic,
        /// Description of the problem.
        message: String,
    },
}

/// Errors found while resolving the accessory configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither HTTP URLs nor MQTT topics were given for power.
    #[error("couldn't detect a proper configuration for power")]
    MissingPower,

    /// A channel was defined but one of its endpoints is missing.
    #[error("property '{channel}' was defined, however '{field}' is missing")]
    MissingEndpoint {
        /// The channel property name.
        channel: &'static str,
        /// The missing field.
        field: &'static str,
    },

    /// The unit string is not one the channel supports.
    #[error("'{unit}' is an unsupported {channel} unit")]
    InvalidUnit {
        /// The channel property name.
        channel: &'static str,
        /// The rejected unit string.
        unit: String,
    },

    /// The status pattern is not a valid regular expression.
    #[error("invalid status pattern for '{channel}': {source}")]
    InvalidPattern {
        /// The channel property name.
        channel: &'static str,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A cache time is neither -1, 0 nor a positive number of milliseconds.
    #[error("invalid cache time {value} for '{field}'")]
    InvalidCacheTtl {
        /// The property name.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// Color temperature bounds are empty or non-positive.
    #[error("invalid color temperature bounds [{min}, {max}]")]
    InvalidBounds {
        /// Lower bound in mired.
        min: i64,
        /// Upper bound in mired.
        max: i64,
    },

    /// The HTTP method of a URL property is not supported.
    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),

    /// The MQTT topic property is malformed.
    #[error("invalid MQTT topic for '{channel}': {message}")]
    InvalidTopic {
        /// The property name.
        channel: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// MQTT topics are configured but no `mqtt` options were given.
    #[error("MQTT topics were specified but no 'mqtt' options are configured")]
    MissingMqtt,

    /// The configuration document is not valid JSON for this accessory.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to talking to the device (HTTP/MQTT).
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// MQTT publish or subscribe failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The device answered with a non-2xx status code.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body.
        body: String,
    },

    /// The request could not be built from its descriptor.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid broker URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// No MQTT broker connection is available.
    #[error("no MQTT connection available")]
    NotConnected,
}

/// Errors related to extracting a value from a status body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern did not match the body.
    #[error("pattern /{pattern}/ did not match the body")]
    NoMatch {
        /// The pattern source.
        pattern: String,
    },

    /// The pattern matched but the designated group is absent.
    #[error("pattern /{pattern}/ has no group {group} to extract")]
    MissingGroup {
        /// The pattern source.
        pattern: String,
        /// The requested capture group.
        group: usize,
    },

    /// The extracted text is not a number.
    #[error("extracted text '{0}' is not a number")]
    InvalidNumber(String),
}

/// A canonical value outside its characteristic's legal range.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{characteristic} value {value} is out of range [{min}, {max}]")]
pub struct RangeError {
    /// The characteristic being read or written.
    pub characteristic: Characteristic,
    /// The offending canonical value.
    pub value: f64,
    /// Lower legal bound.
    pub min: f64,
    /// Upper legal bound.
    pub max: f64,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_display() {
        let err = RangeError {
            characteristic: Characteristic::Brightness,
            value: 150.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "Brightness value 150 is out of range [0, 100]"
        );
    }

    #[test]
    fn error_from_pattern_error() {
        let err: Error = PatternError::NoMatch {
            pattern: "([0-9]+)".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Pattern(PatternError::NoMatch { .. })));
    }

    #[test]
    fn status_error_display() {
        let err = TransportError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: busy");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidUnit {
            channel: "hue",
            unit: "degrees".to_string(),
        };
        assert_eq!(err.to_string(), "'degrees' is an unsupported hue unit");
    }
}
