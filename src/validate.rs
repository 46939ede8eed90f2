// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input validation and sanitization.
//!
//! Everything that arrives over the network passes through these functions
//! before it can reach device state. Free text has tabs turned into spaces
//! and other control characters stripped, is length-capped and is rejected outright when it contains a
//! known injection marker. Structured values (booleans, numbers, ports,
//! multicast groups) must match their grammar exactly.
//!
//! # Examples
//!
//! ```
//! use onair_core::validate::{sanitize_text, TEXT_MAX_LEN};
//!
//! let clean = sanitize_text("NOW", "Morning\tShow", TEXT_MAX_LEN).unwrap();
//! assert_eq!(clean, "Morning Show");
//!
//! assert!(sanitize_text("NOW", "<script>alert(1)</script>", TEXT_MAX_LEN).is_err());
//! ```

use std::net::Ipv4Addr;

use crate::error::ValidationError;

/// Maximum length of `NOW`, `NEXT` and `WARN` text, in characters.
pub const TEXT_MAX_LEN: usize = 500;

/// Maximum length of a `CONF` value, in characters.
pub const CONF_MAX_LEN: usize = 1000;

/// Patterns that cause free text to be rejected, matched case-insensitively.
const DANGEROUS_PATTERNS: &[&str] = &[
    "<script",
    "</script",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "onerror=",
    "onload=",
    "<iframe",
    "<object",
    "<embed",
];

/// Sanitizes a free-text value.
///
/// Tabs become spaces and other control characters are removed first. The result is then rejected if it
/// is longer than `max_len` characters or contains a dangerous pattern.
///
/// # Errors
///
/// Returns `ValidationError::TooLong` or `ValidationError::DangerousContent`.
pub fn sanitize_text(field: &str, input: &str, max_len: usize) -> Result<String, ValidationError> {
    let cleaned: String = input
        .chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    let actual = cleaned.chars().count();
    if actual > max_len {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: max_len,
            actual,
        });
    }

    if let Some(pattern) = find_dangerous_pattern(&cleaned) {
        return Err(ValidationError::DangerousContent {
            field: field.to_string(),
            pattern: pattern.to_string(),
        });
    }

    Ok(cleaned)
}

/// Returns the first dangerous pattern contained in `text`, if any.
#[must_use]
pub fn find_dangerous_pattern(text: &str) -> Option<&'static str> {
    // Whitespace inside a marker ("java script:") must not slip through.
    let folded: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    DANGEROUS_PATTERNS
        .iter()
        .copied()
        .find(|pattern| folded.contains(pattern))
}

/// Parses a boolean token. Only `True` and `False` are accepted.
///
/// # Errors
///
/// Returns `ValidationError::InvalidToken` for any other spelling.
pub fn parse_bool(field: &str, value: &str) -> Result<bool, ValidationError> {
    match value {
        "True" => Ok(true),
        "False" => Ok(false),
        _ => Err(ValidationError::InvalidToken {
            field: field.to_string(),
            value: value.to_string(),
            expected: "True, False",
        }),
    }
}

/// Parses a non-negative integer within `min..=max`.
///
/// Only ASCII digits are accepted; signs and whitespace are rejected.
///
/// # Errors
///
/// Returns `ValidationError::NotANumber` or `ValidationError::OutOfRange`.
pub fn parse_bounded(field: &str, value: &str, min: u64, max: u64) -> Result<u64, ValidationError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotANumber {
            field: field.to_string(),
            value: value.to_string(),
        });
    }

    // All digits, so the only possible failure is overflow.
    let parsed = value.parse::<u64>().map_err(|_| ValidationError::OutOfRange {
        field: field.to_string(),
        min,
        max,
        actual: u64::MAX,
    })?;

    if parsed < min || parsed > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            actual: parsed,
        });
    }
    Ok(parsed)
}

/// Parses a network port in 1-65535.
///
/// # Errors
///
/// Returns `ValidationError::NotANumber` or `ValidationError::OutOfRange`.
pub fn parse_port(field: &str, value: &str) -> Result<u16, ValidationError> {
    let port = parse_bounded(field, value, 1, u64::from(u16::MAX))?;
    u16::try_from(port).map_err(|_| ValidationError::OutOfRange {
        field: field.to_string(),
        min: 1,
        max: u64::from(u16::MAX),
        actual: port,
    })
}

/// Parses an IPv4 multicast group address (224.0.0.0/4).
///
/// # Errors
///
/// Returns `ValidationError::InvalidMulticast` if the value is not an IPv4
/// address or not in the multicast range.
pub fn parse_multicast(value: &str) -> Result<Ipv4Addr, ValidationError> {
    value
        .parse::<Ipv4Addr>()
        .ok()
        .filter(Ipv4Addr::is_multicast)
        .ok_or_else(|| ValidationError::InvalidMulticast(value.to_string()))
}
