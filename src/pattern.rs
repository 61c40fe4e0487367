// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value extraction from status bodies.
//!
//! Devices without a structured status API answer with free text; a
//! [`StatusPattern`] scrapes the value out of it with a regular expression
//! and a capture group.

use std::fmt;

use regex::Regex;

use crate::error::{ConfigError, PatternError};

/// A compiled status pattern plus the capture group to extract.
///
/// # Examples
///
/// ```
/// use http_lightbulb::pattern::StatusPattern;
///
/// let pattern = StatusPattern::new("brightness", "raw=([0-9]+)", None).unwrap();
/// assert_eq!(pattern.extract("raw=180").unwrap(), "180");
/// assert!(pattern.extract("nothing here").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct StatusPattern {
    regex: Regex,
    group: Option<usize>,
}

impl StatusPattern {
    /// Compiles a pattern for the named channel.
    ///
    /// With no explicit `group`, group 1 is extracted when the pattern has
    /// capture groups, otherwise the whole match.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the expression does not
    /// compile.
    pub fn new(
        channel: &'static str,
        pattern: &str,
        group: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern)
            .map_err(|source| ConfigError::InvalidPattern { channel, source })?;
        Ok(Self { regex, group })
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the capture group that will be extracted.
    #[must_use]
    pub fn group(&self) -> usize {
        self.group
            .unwrap_or_else(|| usize::from(self.regex.captures_len() > 1))
    }

    /// Returns `true` if the pattern matches anywhere in `body`.
    ///
    /// Used for power, where the pattern is a presence test.
    #[must_use]
    pub fn is_match(&self, body: &str) -> bool {
        self.regex.is_match(body)
    }

    /// Returns the text of the designated group.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::NoMatch`] if the pattern does not match and
    /// [`PatternError::MissingGroup`] if the group did not participate.
    pub fn extract<'a>(&self, body: &'a str) -> Result<&'a str, PatternError> {
        let captures = self.regex.captures(body).ok_or_else(|| PatternError::NoMatch {
            pattern: self.as_str().to_string(),
        })?;
        let group = self.group();
        captures
            .get(group)
            .map(|m| m.as_str())
            .ok_or_else(|| PatternError::MissingGroup {
                pattern: self.as_str().to_string(),
                group,
            })
    }

    /// Extracts and parses the designated group as a number.
    ///
    /// With `integer` set, fractional text is truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if extraction fails or the text is not a
    /// number.
    pub fn extract_number(&self, body: &str, integer: bool) -> Result<f64, PatternError> {
        let text = self.extract(body)?.trim();
        let value: f64 = text
            .parse()
            .map_err(|_| PatternError::InvalidNumber(text.to_string()))?;
        if !value.is_finite() {
            return Err(PatternError::InvalidNumber(text.to_string()));
        }
        Ok(if integer { value.trunc() } else { value })
    }
}

impl fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.regex.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_group_is_first_capture() {
        let pattern = StatusPattern::new("brightness", "raw=([0-9]{1,3})", None).unwrap();
        assert_eq!(pattern.group(), 1);
        assert!((pattern.extract_number("raw=180", true).unwrap() - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn whole_match_without_groups() {
        let pattern = StatusPattern::new("hue", "[0-9]+", None).unwrap();
        assert_eq!(pattern.group(), 0);
        assert_eq!(pattern.extract("hue is 200 deg").unwrap(), "200");
    }

    #[test]
    fn explicit_group() {
        let pattern =
            StatusPattern::new("saturation", r"h=([0-9]+);s=([0-9.]+)", Some(2)).unwrap();
        let value = pattern.extract_number("h=10;s=42.5", false).unwrap();
        assert!((value - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn no_match_is_an_error() {
        let pattern = StatusPattern::new("brightness", "([0-9]{1,3})", None).unwrap();
        assert_eq!(
            pattern.extract("off"),
            Err(PatternError::NoMatch {
                pattern: "([0-9]{1,3})".to_string()
            })
        );
    }

    #[test]
    fn missing_group_is_an_error() {
        let pattern = StatusPattern::new("hue", "([0-9]+)", Some(3)).unwrap();
        assert!(matches!(
            pattern.extract("120"),
            Err(PatternError::MissingGroup { group: 3, .. })
        ));
    }

    #[test]
    fn optional_group_that_did_not_participate() {
        let pattern = StatusPattern::new("hue", "x(y)?", Some(1)).unwrap();
        assert!(matches!(
            pattern.extract("x"),
            Err(PatternError::MissingGroup { group: 1, .. })
        ));
    }

    #[test]
    fn integer_channels_truncate() {
        let pattern = StatusPattern::new("colorTemperature", "([0-9.]+)", None).unwrap();
        assert!((pattern.extract_number("320.7", true).unwrap() - 320.0).abs() < f64::EPSILON);
        assert!((pattern.extract_number("320.7", false).unwrap() - 320.7).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_regex_is_config_error() {
        let err = StatusPattern::new("brightness", "([0-9]", None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { channel: "brightness", .. }));
    }

    #[test]
    fn power_presence_test() {
        let pattern = StatusPattern::new("power", "1", None).unwrap();
        assert!(pattern.is_match("POWER=1"));
        assert!(!pattern.is_match("POWER=0"));
    }
}
