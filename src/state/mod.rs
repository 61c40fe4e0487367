// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state management types.
//!
//! The [`LightState`] struct holds the canonical value of every configured
//! characteristic, while [`StateChange`] represents individual changes that
//! can be applied and broadcast.
//!
//! # Examples
//!
//! ```
//! use http_lightbulb::state::{LightState, StateChange};
//!
//! let mut state = LightState::new();
//! state.apply(&StateChange::Power(true));
//!
//! assert!(state.power());
//! ```

mod light_state;
mod state_change;

pub use light_state::LightState;
pub use state_change::StateChange;
