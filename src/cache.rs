// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-characteristic query gating.
//!
//! Each readable channel owns one [`QueryCache`] deciding whether a read
//! goes to the device or is answered from stored state.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::ConfigError;

/// How long a successful read stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheTtl {
    /// Every read queries the device.
    #[default]
    AlwaysQuery,
    /// Reads within the duration of the last successful query are served
    /// from stored state.
    For(Duration),
    /// Never query; always serve stored state.
    Infinite,
}

impl CacheTtl {
    /// Parses a configured cache time in milliseconds.
    ///
    /// `-1` means infinite, `0` always queries, positive values are
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCacheTtl`] for values below `-1`.
    pub fn from_millis(field: &'static str, value: i64) -> Result<Self, ConfigError> {
        match value {
            -1 => Ok(Self::Infinite),
            0 => Ok(Self::AlwaysQuery),
            v if v > 0 => Ok(Self::For(Duration::from_millis(v.unsigned_abs()))),
            v => Err(ConfigError::InvalidCacheTtl { field, value: v }),
        }
    }
}

/// Query gate for one characteristic.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use http_lightbulb::cache::{CacheTtl, QueryCache};
///
/// let mut cache = QueryCache::new(CacheTtl::For(Duration::from_secs(5)));
/// assert!(cache.should_query());
/// cache.queried();
/// assert!(!cache.should_query());
/// ```
#[derive(Debug, Clone)]
pub struct QueryCache {
    ttl: CacheTtl,
    last_queried: Option<Instant>,
}

impl QueryCache {
    /// Creates a gate that has never seen a successful query.
    #[must_use]
    pub const fn new(ttl: CacheTtl) -> Self {
        Self {
            ttl,
            last_queried: None,
        }
    }

    /// Returns `true` if the next read must go to the device.
    #[must_use]
    pub fn should_query(&self) -> bool {
        match self.ttl {
            CacheTtl::AlwaysQuery => true,
            CacheTtl::Infinite => false,
            CacheTtl::For(ttl) => self
                .last_queried
                .is_none_or(|last| last.elapsed() >= ttl),
        }
    }

    /// Records a successful remote read.
    pub fn queried(&mut self) {
        self.last_queried = Some(Instant::now());
    }

    /// Returns `true` if this gate never re-queries.
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        matches!(self.ttl, CacheTtl::Infinite)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheTtl::AlwaysQuery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_from_millis() {
        assert_eq!(CacheTtl::from_millis("statusCache", -1).unwrap(), CacheTtl::Infinite);
        assert_eq!(CacheTtl::from_millis("statusCache", 0).unwrap(), CacheTtl::AlwaysQuery);
        assert_eq!(
            CacheTtl::from_millis("hueCache", 5000).unwrap(),
            CacheTtl::For(Duration::from_secs(5))
        );
        assert!(matches!(
            CacheTtl::from_millis("hueCache", -5),
            Err(ConfigError::InvalidCacheTtl { field: "hueCache", value: -5 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_gate_reopens_after_ttl() {
        let mut cache = QueryCache::new(CacheTtl::For(Duration::from_millis(5000)));
        assert!(cache.should_query());

        cache.queried();
        assert!(!cache.should_query());

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert!(!cache.should_query());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.should_query());
    }

    #[test]
    fn zero_ttl_always_queries() {
        let mut cache = QueryCache::default();
        cache.queried();
        assert!(cache.should_query());
        assert!(!cache.is_infinite());
    }

    #[test]
    fn infinite_never_queries() {
        let cache = QueryCache::new(CacheTtl::Infinite);
        assert!(!cache.should_query());
        assert!(cache.is_infinite());
    }
}
