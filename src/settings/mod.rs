// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration keys, staging and persistence.
//!
//! `CONF:<Section>:<Key>=<Value>` lines resolve to a [`ConfigKey`] and are
//! held in the [`StagingStore`] until `CONF:CONF:APPLY=TRUE`. The commit
//! validates every staged value with [`ConfigKey::validate`] and is applied
//! only if all of them pass. Committed values are then handed to a
//! [`SettingsStore`].
//!
//! # Examples
//!
//! ```
//! use onair_core::settings::{ConfigKey, ConfigValue, StagingStore};
//!
//! let mut staging = StagingStore::new();
//! staging.stage(ConfigKey::UdpPort, "notanumber".to_string());
//! assert!(staging.validate().is_err());
//!
//! staging.stage(ConfigKey::UdpPort, "3311".to_string());
//! let values = staging.validate().unwrap();
//! assert_eq!(values, vec![(ConfigKey::UdpPort, ConfigValue::Port(3311))]);
//! ```

use std::collections::BTreeMap;

mod schema;
mod staging;
mod store;

pub use schema::{ConfigKey, ConfigValue, TIMER_MIN_WIDTH_MAX, ValueKind};
pub use staging::StagingStore;
pub use store::{JsonFileSettings, MemorySettings, SettingsStore};

/// Stored settings: section name to key/value pairs.
pub type SettingsMap = BTreeMap<String, BTreeMap<String, String>>;

/// Section holding engine-internal entries that are not CONF keys.
pub const DEVICE_SECTION: &str = "Device";

/// Key of the stable device identifier within [`DEVICE_SECTION`].
pub const DEVICE_UUID_KEY: &str = "uuid";

/// Converts committed values into the persisted representation.
#[must_use]
pub fn to_settings_map(values: &[(ConfigKey, ConfigValue)]) -> SettingsMap {
    let mut map = SettingsMap::new();
    for (key, value) in values {
        map.entry(key.section())
            .or_default()
            .insert(key.key(), value.to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    #[test]
    fn settings_map_groups_by_section() {
        let map = to_settings_map(&[
            (ConfigKey::StationName, ConfigValue::Text("Foo".into())),
            (ConfigKey::StationColor, ConfigValue::Color(Color::new(1, 2, 3))),
            (ConfigKey::UdpPort, ConfigValue::Port(3311)),
        ]);
        assert_eq!(map["General"]["stationname"], "Foo");
        assert_eq!(map["General"]["stationcolor"], "#010203");
        assert_eq!(map["Network"]["udpport"], "3311");
    }
}
