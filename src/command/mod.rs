// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command grammar.
//!
//! Every transport speaks the same line-oriented grammar. A line is a verb,
//! a colon, and an argument:
//!
//! | Line | Command |
//! |------|---------|
//! | `LED{1-4}:ON\|OFF\|TOGGLE` | [`Command::Led`] |
//! | `AIR{1-4}:ON\|OFF\|TOGGLE\|RESET` | [`Command::Air`] |
//! | `AIR3TIME:<seconds>` | [`Command::AirTime`] |
//! | `NOW:<text>` / `NEXT:<text>` | [`Command::Text`] |
//! | `WARN:<text>` / `WARN:<1\|2>:<text>` / `WARN:` | [`Command::Warn`] |
//! | `CONF:<Section>:<Key>=<Value>` | [`Command::Conf`] |
//! | `CONF:CONF:APPLY=TRUE` | [`Command::Apply`] |
//! | `CMD:REBOOT\|SHUTDOWN\|QUIT` | [`Command::System`] |
//!
//! Parsing runs the validator on every value, so a [`Command`] always carries
//! sanitized, in-range data.
//!
//! # Examples
//!
//! ```
//! use onair_core::command::{parse_line, Command, TextField};
//!
//! let cmd = parse_line("NOW:News at 10:00").unwrap();
//! assert_eq!(
//!     cmd,
//!     Command::Text { field: TextField::Now, text: "News at 10:00".to_string() }
//! );
//! assert_eq!(cmd.to_string(), "NOW:News at 10:00");
//!
//! assert!(parse_line("BOGUS").is_err());
//! ```

mod parse;

use std::fmt;

pub use parse::{decode_payload, parse_line, split_lines};

use crate::settings::ConfigKey;
use crate::types::{AirIndex, LedIndex, SwitchAction, TimerEvent, WarningPriority};

/// Upper bound of `AIR3TIME`, one day in seconds.
pub const AIR_TIME_MAX_SECONDS: u64 = 86_400;

/// A parsed, validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch an LED.
    Led {
        /// Target LED.
        index: LedIndex,
        /// Requested action.
        action: SwitchAction,
    },

    /// Send an event to an AIR timer.
    Air {
        /// Target timer.
        index: AirIndex,
        /// Requested event.
        event: TimerEvent,
    },

    /// Set the elapsed seconds of AIR3.
    AirTime {
        /// New elapsed time in seconds.
        seconds: u64,
    },

    /// Replace the NOW or NEXT text.
    Text {
        /// Which field.
        field: TextField,
        /// Sanitized text, possibly empty.
        text: String,
    },

    /// Set or clear a warning level. An empty text clears the level.
    Warn {
        /// Target level (0-2).
        priority: WarningPriority,
        /// Sanitized text.
        text: String,
    },

    /// Stage a configuration change.
    Conf {
        /// Resolved key.
        key: ConfigKey,
        /// Sanitized raw value; type-checked at APPLY time.
        value: String,
    },

    /// Commit every staged configuration change.
    Apply,

    /// Forward a request to the OS-operations collaborator.
    System(SystemRequest),
}

impl Command {
    /// Returns the verb of this command (`LED1`, `AIR3TIME`, `CONF`, ...).
    #[must_use]
    pub fn verb(&self) -> String {
        match self {
            Self::Led { index, .. } => index.to_string(),
            Self::Air { index, .. } => index.to_string(),
            Self::AirTime { .. } => "AIR3TIME".to_string(),
            Self::Text { field, .. } => field.verb().to_string(),
            Self::Warn { .. } => "WARN".to_string(),
            Self::Conf { .. } | Self::Apply => "CONF".to_string(),
            Self::System(_) => "CMD".to_string(),
        }
    }

    /// Returns `true` for commands that change device state directly.
    ///
    /// Staging a `CONF` edit or forwarding a `CMD` request does not.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Conf { .. } | Self::System(_))
    }
}

impl fmt::Display for Command {
    /// Formats the command back into its wire form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Led { index, action } => write!(f, "{index}:{action}"),
            Self::Air { index, event } => write!(f, "{index}:{event}"),
            Self::AirTime { seconds } => write!(f, "AIR3TIME:{seconds}"),
            Self::Text { field, text } => write!(f, "{}:{text}", field.verb()),
            Self::Warn { priority, text } if *priority == WarningPriority::Normal => {
                write!(f, "WARN:{text}")
            }
            Self::Warn { priority, text } => write!(f, "WARN:{priority}:{text}"),
            Self::Conf { key, value } => write!(f, "CONF:{}:{}={value}", key.section(), key.key()),
            Self::Apply => f.write_str("CONF:CONF:APPLY=TRUE"),
            Self::System(request) => write!(f, "CMD:{request}"),
        }
    }
}

/// The two single-line text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    /// What is on air now.
    Now,
    /// What comes next.
    Next,
}

impl TextField {
    /// Returns the command verb.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Now => "NOW",
            Self::Next => "NEXT",
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Process lifecycle request carried by `CMD:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemRequest {
    /// Reboot the host.
    Reboot,
    /// Power the host off.
    Shutdown,
    /// Quit the display application.
    Quit,
}

impl SystemRequest {
    /// Returns the wire token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reboot => "REBOOT",
            Self::Shutdown => "SHUTDOWN",
            Self::Quit => "QUIT",
        }
    }
}

impl fmt::Display for SystemRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_form() {
        let lines = [
            "LED1:ON",
            "AIR4:RESET",
            "AIR3TIME:90",
            "NEXT:Weather: sunny",
            "WARN:Storm",
            "WARN:2:Evacuate",
            "CONF:LED2:text=PHONE",
            "CONF:CONF:APPLY=TRUE",
            "CMD:QUIT",
        ];
        for line in lines {
            assert_eq!(parse_line(line).unwrap().to_string(), line);
        }
    }

    #[test]
    fn verbs() {
        assert_eq!(parse_line("AIR2:ON").unwrap().verb(), "AIR2");
        assert_eq!(parse_line("AIR3TIME:5").unwrap().verb(), "AIR3TIME");
        assert_eq!(parse_line("CONF:CONF:APPLY=TRUE").unwrap().verb(), "CONF");
    }

    #[test]
    fn mutation_classification() {
        assert!(parse_line("LED1:ON").unwrap().is_mutation());
        assert!(parse_line("CONF:CONF:APPLY=TRUE").unwrap().is_mutation());
        assert!(!parse_line("CONF:General:slogan=x").unwrap().is_mutation());
        assert!(!parse_line("CMD:REBOOT").unwrap().is_mutation());
    }
}
