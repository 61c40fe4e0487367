// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resettable poll interval.

use std::time::Duration;

use tokio::sync::Notify;

/// A fixed poll interval that any fresh contact with the device can defer.
///
/// [`tick`](PullTimer::tick) completes once a full interval has passed
/// without a [`reset`](PullTimer::reset). Resets are idempotent: any number
/// of them between two ticks restart the interval exactly once more.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use http_lightbulb::PullTimer;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let timer = PullTimer::new(Duration::from_secs(30));
/// timer.tick().await;
/// # }
/// ```
#[derive(Debug)]
pub struct PullTimer {
    interval: Duration,
    reset: Notify,
}

impl PullTimer {
    /// Creates a timer firing every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            reset: Notify::new(),
        }
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Defers the next tick by a full interval.
    ///
    /// Safe to call from any task and any number of times.
    pub fn reset(&self) {
        self.reset.notify_one();
    }

    /// Waits until a full interval elapses without a reset.
    pub async fn tick(&self) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => return,
                () = self.reset.notified() => {
                    tracing::trace!(interval = ?self.interval, "pull timer reset");
                }
            }
        }
    }
}
