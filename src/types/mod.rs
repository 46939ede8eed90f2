// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for the command grammar.
//!
//! Each type is valid by construction, so anything holding one of these
//! values has already passed validation.
//!
//! # Types
//!
//! - [`LedIndex`] / [`AirIndex`] - slot 1-4
//! - [`SwitchAction`] - ON/OFF/TOGGLE for LEDs
//! - [`TimerEvent`] - ON/OFF/TOGGLE/RESET for AIR timers
//! - [`TimerCapabilities`] - events a given timer accepts
//! - [`Color`] - RGB color normalized to `#RRGGBB`
//! - [`WarningPriority`] - warning level -1..=2

mod action;
mod color;
mod index;
mod priority;

pub use action::{SwitchAction, TimerCapabilities, TimerEvent};
pub use color::Color;
pub use index::{AirIndex, LedIndex};
pub use priority::WarningPriority;
