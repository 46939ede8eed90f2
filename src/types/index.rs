// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Indices of the four LEDs and the four AIR timers.

use std::fmt;

use crate::error::ValidationError;

macro_rules! display_index {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u8);

        impl $name {
            /// Number of addressable slots.
            pub const COUNT: u8 = 4;

            /// Creates an index, rejecting anything outside 1-4.
            ///
            /// # Errors
            ///
            /// Returns `ValidationError::OutOfRange` if `index` is 0 or greater than 4.
            pub fn new(index: u8) -> Result<Self, ValidationError> {
                if index == 0 || index > Self::COUNT {
                    return Err(ValidationError::OutOfRange {
                        field: $label.to_string(),
                        min: 1,
                        max: u64::from(Self::COUNT),
                        actual: u64::from(index),
                    });
                }
                Ok(Self(index))
            }

            /// Returns all four indices in ascending order.
            #[must_use]
            pub const fn all() -> [Self; 4] {
                [Self(1), Self(2), Self(3), Self(4)]
            }

            /// Returns the 1-based value.
            #[must_use]
            pub const fn value(self) -> u8 {
                self.0
            }

            /// Returns the 0-based slot for array storage.
            #[must_use]
            pub const fn slot(self) -> usize {
                (self.0 - 1) as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $label, self.0)
            }
        }
    };
}

display_index!(
    /// Index of one of the four status LEDs (1-4).
    ///
    /// # Examples
    ///
    /// ```
    /// use onair_core::types::LedIndex;
    ///
    /// let led = LedIndex::new(2).unwrap();
    /// assert_eq!(led.to_string(), "LED2");
    /// assert!(LedIndex::new(5).is_err());
    /// ```
    LedIndex,
    "LED"
);

display_index!(
    /// Index of one of the four AIR timers (1-4).
    ///
    /// The timers are conventionally Mic (1), Phone (2), Radio (3) and
    /// Stream (4).
    AirIndex,
    "AIR"
);

impl AirIndex {
    /// The radio timer, the only one accepting an absolute time set.
    pub const RADIO: Self = Self(3);
    /// The stream timer.
    pub const STREAM: Self = Self(4);
}
