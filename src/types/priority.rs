// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Warning priority levels.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Priority of a warning message.
///
/// Ordering follows the numeric level, so `High > Medium > Normal > TimeSync`.
/// [`WarningPriority::TimeSync`] is reserved for the time-sync collaborator and
/// can never be produced by [`FromStr`] or [`WarningPriority::operator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningPriority {
    /// Clock drift reported by the time-sync collaborator (-1).
    TimeSync,
    /// Default `WARN:<text>` level (0).
    Normal,
    /// Medium (1).
    Medium,
    /// High (2).
    High,
}

impl WarningPriority {
    /// All levels in ascending order.
    pub const ALL: [Self; 4] = [Self::TimeSync, Self::Normal, Self::Medium, Self::High];

    /// Returns the numeric level.
    #[must_use]
    pub const fn level(self) -> i8 {
        match self {
            Self::TimeSync => -1,
            Self::Normal => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Maps an operator-writable level (0-2) to a priority.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ReservedPriority` for -1 and
    /// `ValidationError::OutOfRange` for anything else outside 0-2.
    pub fn operator(level: i8) -> Result<Self, ValidationError> {
        match level {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            -1 => Err(ValidationError::ReservedPriority(level)),
            other => Err(ValidationError::OutOfRange {
                field: "warning priority".to_string(),
                min: 0,
                max: 2,
                actual: u64::from(other.unsigned_abs()),
            }),
        }
    }
}

impl fmt::Display for WarningPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Parses the explicit priority token of `WARN:<1|2>:<text>`.
impl FromStr for WarningPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::Medium),
            "2" => Ok(Self::High),
            _ => Err(ValidationError::InvalidToken {
                field: "warning priority".to_string(),
                value: s.to_string(),
                expected: "1, 2",
            }),
        }
    }
}

impl serde::Serialize for WarningPriority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.level())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_level() {
        assert!(WarningPriority::High > WarningPriority::Medium);
        assert!(WarningPriority::Normal > WarningPriority::TimeSync);
    }

    #[test]
    fn explicit_token_only_accepts_one_and_two() {
        assert_eq!("2".parse::<WarningPriority>().unwrap(), WarningPriority::High);
        assert!("0".parse::<WarningPriority>().is_err());
        assert!("-1".parse::<WarningPriority>().is_err());
        assert!("3".parse::<WarningPriority>().is_err());
    }

    #[test]
    fn operator_levels_exclude_time_sync() {
        assert_eq!(WarningPriority::operator(0).unwrap(), WarningPriority::Normal);
        assert!(matches!(
            WarningPriority::operator(-1),
            Err(ValidationError::ReservedPriority(-1))
        ));
        assert!(WarningPriority::operator(5).is_err());
    }
}
