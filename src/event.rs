// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event bus for broadcasting light state updates to the host.
//!
//! Every canonical value the accessory stores is also published here so a
//! host can mirror it into its own characteristic storage.

use tokio::sync::broadcast;

use crate::state::{LightState, StateChange};
use crate::types::ColorMode;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Where an update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UpdateSource {
    /// A fresh read requested by the host.
    Read,
    /// A successful write requested by the host.
    Write,
    /// The periodic poll.
    Poll,
    /// An inbound MQTT message.
    Mqtt,
    /// An inbound webhook notification.
    Notification,
}

/// Events emitted by a light accessory.
#[derive(Debug, Clone, serde::Serialize)]
pub enum LightEvent {
    /// A canonical value changed.
    StateChanged {
        /// The change that was applied.
        change: StateChange,
        /// What triggered the change.
        source: UpdateSource,
        /// The complete state after the change.
        new_state: LightState,
    },

    /// The authoritative color representation changed.
    ColorModeChanged {
        /// The new mode.
        mode: ColorMode,
    },
}

impl LightEvent {
    /// Returns the state change carried by this event, if any.
    #[must_use]
    pub fn change(&self) -> Option<&StateChange> {
        match self {
            Self::StateChanged { change, .. } => Some(change),
            Self::ColorModeChanged { .. } => None,
        }
    }
}

/// Broadcasts [`LightEvent`]s to any number of subscribers.
///
/// The bus has a fixed capacity (default 256). A subscriber that falls
/// behind loses the oldest events and receives `RecvError::Lagged`.
///
/// # Examples
///
/// ```
/// use http_lightbulb::event::{LightEvent, LightEvents};
/// use http_lightbulb::types::ColorMode;
///
/// let bus = LightEvents::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(LightEvent::ColorModeChanged { mode: ColorMode::Color });
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct LightEvents {
    sender: broadcast::Sender<LightEvent>,
}

impl LightEvents {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new event bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to light events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LightEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all subscribers.
    ///
    /// If there are no subscribers, the event is discarded.
    pub fn publish(&self, event: LightEvent) {
        if self.subscriber_count() == 0 {
            tracing::trace!(?event, "No subscribers, dropping light event");
            return;
        }
        // A receiver may drop between the count and the send
        let _ = self.sender.send(event);
    }
}

impl Default for LightEvents {
    fn default() -> Self {
        Self::new()
    }
}
