// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! A [`StateChange`] is the fully resolved form of a mutation: toggles have
//! already been turned into the target value and timer events into the
//! resulting running/elapsed pair. Applying the same change twice is
//! therefore idempotent, and subscribers can act on a change without
//! consulting the previous state.
//!
//! # Examples
//!
//! ```
//! use onair_core::state::{DeviceState, StateChange};
//! use onair_core::types::LedIndex;
//!
//! let mut state = DeviceState::new();
//! let change = StateChange::Led { index: LedIndex::new(1).unwrap(), on: true };
//!
//! assert!(state.apply(&change));
//! assert!(!state.apply(&change));
//! ```

use crate::command::TextField;
use crate::settings::{ConfigKey, ConfigValue};
use crate::types::{AirIndex, LedIndex, WarningPriority};

use super::TimerChangeKind;

/// A resolved mutation of [`DeviceState`](super::DeviceState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// An LED was switched.
    Led {
        /// The LED.
        index: LedIndex,
        /// New on/off state.
        on: bool,
    },

    /// A timer changed state through a command.
    Timer {
        /// The timer.
        index: AirIndex,
        /// Running flag afterwards.
        running: bool,
        /// Elapsed seconds afterwards.
        elapsed: u64,
        /// What happened.
        kind: TimerChangeKind,
    },

    /// One tick advanced the listed running timers.
    Tick(Vec<(AirIndex, u64)>),

    /// NOW or NEXT text replaced.
    Text {
        /// The field.
        field: TextField,
        /// New text.
        text: String,
    },

    /// A warning level was set (`Some`) or cleared (`None`).
    Warning {
        /// The level.
        priority: WarningPriority,
        /// New text, or `None` to clear.
        text: Option<String>,
    },

    /// A configuration commit.
    Settings(Vec<(ConfigKey, ConfigValue)>),
}

impl StateChange {
    /// Returns the event-log name of this change.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Led { .. } => "led_changed",
            Self::Timer { kind, .. } => match kind {
                TimerChangeKind::Started => "air_started",
                TimerChangeKind::Stopped => "air_stopped",
                TimerChangeKind::Reset => "air_reset",
                TimerChangeKind::Set => "timer_set",
            },
            Self::Tick(_) => "timer_tick",
            Self::Text { .. } => "text_changed",
            Self::Warning { text: Some(_), .. } => "warning_added",
            Self::Warning { text: None, .. } => "warning_removed",
            Self::Settings(_) => "settings_changed",
        }
    }

    /// Returns `true` for periodic tick changes.
    #[must_use]
    pub const fn is_tick(&self) -> bool {
        matches!(self, Self::Tick(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        let air = AirIndex::new(3).unwrap();
        let timer = |kind| StateChange::Timer {
            index: air,
            running: false,
            elapsed: 0,
            kind,
        };
        assert_eq!(timer(TimerChangeKind::Started).event_name(), "air_started");
        assert_eq!(timer(TimerChangeKind::Reset).event_name(), "air_reset");
        assert_eq!(timer(TimerChangeKind::Set).event_name(), "timer_set");
        assert_eq!(
            StateChange::Warning {
                priority: WarningPriority::High,
                text: None
            }
            .event_name(),
            "warning_removed"
        );
        assert!(StateChange::Tick(vec![(air, 1)]).is_tick());
    }
}
