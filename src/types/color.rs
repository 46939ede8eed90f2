// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RGB color type used for LED, timer, station and clock colors.
//!
//! Colors arrive in two notations, `#RRGGBB` and `0xRRGGBB`. Both parse into
//! the same [`Color`], and every color is stored and reported in the canonical
//! upper-case `#RRGGBB` form.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// RGB color with 8-bit channels.
///
/// # Examples
///
/// ```
/// use onair_core::types::Color;
///
/// let a: Color = "#ff0000".parse().unwrap();
/// let b: Color = "0xFF0000".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "#FF0000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    red: u8,
    green: u8,
    blue: u8,
}

impl Color {
    /// Creates a color from its channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses `#RRGGBB` or `0xRRGGBB` (prefix case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidColor` for any other notation.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidColor(input.to_string());

        let hex = input
            .strip_prefix('#')
            .or_else(|| input.strip_prefix("0x"))
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(invalid)?;

        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Returns the red channel.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Returns the green channel.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Returns the blue channel.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }

    /// Returns the canonical `#RRGGBB` representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Parses a color literal known to be valid at compile time.
    pub(crate) const fn from_rgb_u32(rgb: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
