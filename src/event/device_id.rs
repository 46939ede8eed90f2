// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stable device identifier.

use std::fmt;

use uuid::Uuid;

/// Stable identifier of this display.
///
/// Generated once, stored with the settings and reused on every start so the
/// MQTT base topic and the autodiscovery `unique_id`s never change.
///
/// # Examples
///
/// ```
/// use onair_core::event::DeviceId;
/// use uuid::Uuid;
///
/// let id = DeviceId::from_uuid(Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5abcdef").unwrap());
/// assert_eq!(id.short_id(), "abcdef");
/// assert_eq!(id.base_topic(), "onairscreen_abcdef");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a stored identifier.
    ///
    /// Returns `None` if `value` is not a UUID.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the last six lower-case hex digits.
    #[must_use]
    pub fn short_id(&self) -> String {
        let simple = self.0.simple().to_string();
        simple[simple.len() - 6..].to_string()
    }

    /// Returns the MQTT base topic `onairscreen_<short id>`.
    #[must_use]
    pub fn base_topic(&self) -> String {
        format!("onairscreen_{}", self.short_id())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.short_id())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_unique_ids() {
        assert_ne!(DeviceId::new(), DeviceId::new());
    }

    #[test]
    fn short_id_is_six_lowercase_hex() {
        let id = DeviceId::new();
        let short = id.short_id();
        assert_eq!(short.len(), 6);
        assert!(short.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn parse_round_trip() {
        let id = DeviceId::new();
        assert_eq!(DeviceId::parse(&id.to_string()), Some(id));
        assert_eq!(DeviceId::parse("not-a-uuid"), None);
    }

    #[test]
    fn base_topic_uses_uppercase_input_lowercased() {
        let id = DeviceId::parse("A1A2A3A4-B1B2-C1C2-D1D2-D3D4D5ABCDEF").unwrap();
        assert_eq!(id.base_topic(), "onairscreen_abcdef");
    }
}
