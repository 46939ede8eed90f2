// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Switch actions for LEDs and events for AIR timers.
//!
//! Tokens are matched exactly and case-sensitively: `ON` is accepted, `on`
//! and `On` are not.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Action applied to an LED.
///
/// # Examples
///
/// ```
/// use onair_core::types::SwitchAction;
///
/// assert_eq!("TOGGLE".parse::<SwitchAction>().unwrap(), SwitchAction::Toggle);
/// assert!("on".parse::<SwitchAction>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchAction {
    /// Switch on.
    On,
    /// Switch off.
    Off,
    /// Invert the current state.
    Toggle,
}

impl SwitchAction {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Toggle => "TOGGLE",
        }
    }

    /// Computes the resulting on/off state from the current one.
    #[must_use]
    pub const fn resolve(self, current: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Toggle => !current,
        }
    }
}

impl fmt::Display for SwitchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            "TOGGLE" => Ok(Self::Toggle),
            _ => Err(ValidationError::InvalidToken {
                field: "LED action".to_string(),
                value: s.to_string(),
                expected: "ON, OFF, TOGGLE",
            }),
        }
    }
}

/// Event applied to an AIR timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    /// Start counting.
    On,
    /// Stop counting, keeping the elapsed time.
    Off,
    /// Start if stopped, stop if running.
    Toggle,
    /// Stop and zero the elapsed time.
    Reset,
}

impl TimerEvent {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Toggle => "TOGGLE",
            Self::Reset => "RESET",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::On => 0b0001,
            Self::Off => 0b0010,
            Self::Toggle => 0b0100,
            Self::Reset => 0b1000,
        }
    }
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerEvent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            "TOGGLE" => Ok(Self::Toggle),
            "RESET" => Ok(Self::Reset),
            _ => Err(ValidationError::InvalidToken {
                field: "AIR action".to_string(),
                value: s.to_string(),
                expected: "ON, OFF, TOGGLE, RESET",
            }),
        }
    }
}

/// Set of events a timer accepts.
///
/// # Examples
///
/// ```
/// use onair_core::types::{TimerCapabilities, TimerEvent};
///
/// assert!(!TimerCapabilities::BASIC.supports(TimerEvent::Reset));
/// assert!(TimerCapabilities::RESETTABLE.supports(TimerEvent::Reset));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerCapabilities {
    bits: u8,
    absolute_set: bool,
}

impl TimerCapabilities {
    /// ON, OFF and TOGGLE.
    pub const BASIC: Self = Self {
        bits: 0b0111,
        absolute_set: false,
    };

    /// ON, OFF, TOGGLE and RESET.
    pub const RESETTABLE: Self = Self {
        bits: 0b1111,
        absolute_set: false,
    };

    /// ON, OFF, TOGGLE, RESET and an absolute seconds set.
    pub const RESETTABLE_SETTABLE: Self = Self {
        bits: 0b1111,
        absolute_set: true,
    };

    /// Returns `true` if the timer accepts `event`.
    #[must_use]
    pub const fn supports(self, event: TimerEvent) -> bool {
        self.bits & event.bit() != 0
    }

    /// Returns `true` if the elapsed time may be set directly.
    #[must_use]
    pub const fn supports_absolute_set(self) -> bool {
        self.absolute_set
    }
}
