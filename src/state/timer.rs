// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AIR timer state machine.
//!
//! Each timer is either stopped or running and carries the capability set of
//! its slot. [`transition`] is the single transition function for all four
//! timers; it consults the timer's own capabilities instead of branching on
//! the index.
//!
//! | Event | Stopped | Running |
//! |-------|---------|---------|
//! | ON | start | no-op |
//! | OFF | no-op | stop, keep elapsed |
//! | TOGGLE | start | stop |
//! | RESET | elapsed = 0 | elapsed = 0, stop |
//! | set n | elapsed = n | elapsed = n, keep running |

use crate::types::{AirIndex, Color, TimerCapabilities, TimerEvent};

/// Kind of timer change, used for event logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerChangeKind {
    /// The timer started counting.
    Started,
    /// The timer stopped counting.
    Stopped,
    /// The timer was reset to zero.
    Reset,
    /// The elapsed time was set directly.
    Set,
}

/// Result of feeding an event to a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The timer moves to a new state.
    Apply {
        /// Whether the timer runs afterwards.
        running: bool,
        /// Elapsed seconds afterwards.
        elapsed: u64,
        /// What happened.
        kind: TimerChangeKind,
    },
    /// The event is valid but does not change anything.
    NoOp,
    /// The timer's capability set does not include the event.
    Unsupported,
}

/// One of the four AIR timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirTimer {
    index: AirIndex,
    running: bool,
    elapsed: u64,
    capabilities: TimerCapabilities,
    pub(crate) label: String,
    pub(crate) enabled: bool,
    pub(crate) active_bg_color: Color,
    pub(crate) active_text_color: Color,
    pub(crate) icon_path: String,
}

impl AirTimer {
    /// Creates a stopped timer at zero with its slot's capabilities.
    #[must_use]
    pub fn new(index: AirIndex, label: impl Into<String>) -> Self {
        Self {
            index,
            running: false,
            elapsed: 0,
            capabilities: capabilities_for(index),
            label: label.into(),
            enabled: true,
            active_bg_color: Color::from_rgb_u32(0x00FF_0000),
            active_text_color: Color::from_rgb_u32(0x00FF_FFFF),
            icon_path: String::new(),
        }
    }

    /// Returns the timer slot.
    #[must_use]
    pub const fn index(&self) -> AirIndex {
        self.index
    }

    /// Returns `true` while counting.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Returns the elapsed seconds.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Returns the events this timer accepts.
    #[must_use]
    pub const fn capabilities(&self) -> TimerCapabilities {
        self.capabilities
    }

    /// Returns the display label (Mic, Phone, ...).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns whether the timer is shown on the display.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the background color while running.
    #[must_use]
    pub const fn active_bg_color(&self) -> Color {
        self.active_bg_color
    }

    /// Returns the text color while running.
    #[must_use]
    pub const fn active_text_color(&self) -> Color {
        self.active_text_color
    }

    /// Returns the icon path.
    #[must_use]
    pub fn icon_path(&self) -> &str {
        &self.icon_path
    }

    /// Returns the elapsed time after one tick, or `None` when stopped.
    #[must_use]
    pub const fn next_tick(&self) -> Option<u64> {
        if self.running {
            Some(self.elapsed.saturating_add(1))
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, running: bool, elapsed: u64) -> bool {
        let changed = self.running != running || self.elapsed != elapsed;
        self.running = running;
        self.elapsed = elapsed;
        changed
    }
}

/// Returns the capability set of a timer slot.
///
/// AIR1 and AIR2 accept ON/OFF/TOGGLE, AIR4 adds RESET, and AIR3 also accepts
/// an absolute time set.
#[must_use]
pub const fn capabilities_for(index: AirIndex) -> TimerCapabilities {
    match index.value() {
        3 => TimerCapabilities::RESETTABLE_SETTABLE,
        4 => TimerCapabilities::RESETTABLE,
        _ => TimerCapabilities::BASIC,
    }
}

/// Computes the transition for `event` on `timer`.
///
/// # Examples
///
/// ```
/// use onair_core::state::{transition, AirTimer, TimerChangeKind, Transition};
/// use onair_core::types::{AirIndex, TimerEvent};
///
/// let mic = AirTimer::new(AirIndex::new(1).unwrap(), "Mic");
/// assert_eq!(transition(&mic, TimerEvent::Reset), Transition::Unsupported);
/// assert_eq!(
///     transition(&mic, TimerEvent::On),
///     Transition::Apply { running: true, elapsed: 0, kind: TimerChangeKind::Started }
/// );
/// ```
#[must_use]
pub fn transition(timer: &AirTimer, event: TimerEvent) -> Transition {
    if !timer.capabilities.supports(event) {
        return Transition::Unsupported;
    }

    let start = Transition::Apply {
        running: true,
        elapsed: timer.elapsed,
        kind: TimerChangeKind::Started,
    };
    let stop = Transition::Apply {
        running: false,
        elapsed: timer.elapsed,
        kind: TimerChangeKind::Stopped,
    };

    match (event, timer.running) {
        (TimerEvent::On, false) | (TimerEvent::Toggle, false) => start,
        (TimerEvent::Off, true) | (TimerEvent::Toggle, true) => stop,
        (TimerEvent::On, true) | (TimerEvent::Off, false) => Transition::NoOp,
        (TimerEvent::Reset, running) => {
            if !running && timer.elapsed == 0 {
                Transition::NoOp
            } else {
                Transition::Apply {
                    running: false,
                    elapsed: 0,
                    kind: TimerChangeKind::Reset,
                }
            }
        }
    }
}

/// Computes the transition for an absolute time set on `timer`.
///
/// The running flag is left untouched.
#[must_use]
pub fn set_elapsed(timer: &AirTimer, seconds: u64) -> Transition {
    if !timer.capabilities.supports_absolute_set() {
        return Transition::Unsupported;
    }
    if timer.elapsed == seconds {
        return Transition::NoOp;
    }
    Transition::Apply {
        running: timer.running,
        elapsed: seconds,
        kind: TimerChangeKind::Set,
    }
}
