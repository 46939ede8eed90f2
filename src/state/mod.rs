// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! [`DeviceState`] is the aggregate the State Owner holds: four LEDs, four
//! AIR timers, the NOW/NEXT texts, the [`WarningQueue`], display settings and
//! a revision counter. [`StateChange`] describes a single resolved mutation;
//! [`DeviceState::apply`] returns whether it actually changed anything.
//!
//! # Examples
//!
//! ```
//! use onair_core::state::{transition, DeviceState, StateChange, Transition};
//! use onair_core::types::{AirIndex, TimerEvent};
//!
//! let mut state = DeviceState::new();
//! let air3 = AirIndex::new(3).unwrap();
//!
//! if let Transition::Apply { running, elapsed, kind } =
//!     transition(state.timer(air3), TimerEvent::On)
//! {
//!     state.apply(&StateChange::Timer { index: air3, running, elapsed, kind });
//! }
//! assert!(state.timer(air3).is_running());
//! ```

mod device_state;
mod state_change;
mod status;
mod timer;
mod warnings;

pub use device_state::{
    ClockSettings, DEFAULT_HTTP_PORT, DEFAULT_MULTICAST, DEFAULT_UDP_PORT, DeviceState,
    GeneralSettings, LedState, NetworkSettings,
};
pub use state_change::StateChange;
pub use status::{
    AirStatus, DISTRIBUTION, LedStatus, StatusReport, TextStatus, VERSION, WarningStatus,
};
pub use timer::{AirTimer, TimerChangeKind, Transition, capabilities_for, set_elapsed, transition};
pub use warnings::{WarningEntry, WarningQueue};
