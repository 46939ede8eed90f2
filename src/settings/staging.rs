// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending `CONF` edits awaiting `CONF:CONF:APPLY=TRUE`.

use std::collections::BTreeMap;

use crate::error::{CommitError, CommitFailure};

use super::{ConfigKey, ConfigValue};

/// Process-wide staging area for configuration edits.
///
/// Entries are keyed by `(section, key)` with last-writer-wins semantics.
/// The store is shared by every transport: edits staged over UDP and over
/// HTTP land in the same map, and one APPLY commits them all.
///
/// # Examples
///
/// ```
/// use onair_core::settings::{ConfigKey, StagingStore};
///
/// let mut staging = StagingStore::new();
/// staging.stage(ConfigKey::StationName, "Foo".to_string());
/// staging.stage(ConfigKey::StationName, "Bar".to_string());
/// assert_eq!(staging.len(), 1);
///
/// let values = staging.validate().unwrap();
/// assert_eq!(values[0].1.to_string(), "Bar");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StagingStore {
    entries: BTreeMap<ConfigKey, String>,
}

impl StagingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `value` for `key`, replacing any earlier staged value.
    pub fn stage(&mut self, key: ConfigKey, value: String) {
        self.entries.insert(key, value);
    }

    /// Returns the number of staged entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the staged raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &ConfigKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterates over staged entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Validates every staged entry without modifying the store.
    ///
    /// # Errors
    ///
    /// Returns `CommitError::Invalid` listing every entry that failed. In that
    /// case no value is returned at all, so callers cannot apply a partial set.
    pub fn validate(&self) -> Result<Vec<(ConfigKey, ConfigValue)>, CommitError> {
        let mut values = Vec::with_capacity(self.entries.len());
        let mut failures = Vec::new();

        for (key, raw) in &self.entries {
            match key.validate(raw) {
                Ok(value) => values.push((*key, value)),
                Err(e) => failures.push(CommitFailure {
                    section: key.section(),
                    key: key.key(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        if failures.is_empty() {
            Ok(values)
        } else {
            Err(CommitError::Invalid(failures))
        }
    }

    /// Removes every staged entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LedIndex;

    #[test]
    fn last_writer_wins() {
        let mut staging = StagingStore::new();
        staging.stage(ConfigKey::Slogan, "one".to_string());
        staging.stage(ConfigKey::Slogan, "two".to_string());
        assert_eq!(staging.get(&ConfigKey::Slogan), Some("two"));
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn validate_reports_every_failure_and_keeps_entries() {
        let mut staging = StagingStore::new();
        staging.stage(ConfigKey::StationName, "Foo".to_string());
        staging.stage(ConfigKey::UdpPort, "notanumber".to_string());
        staging.stage(
            ConfigKey::LedUsed(LedIndex::new(1).unwrap()),
            "yes".to_string(),
        );

        let err = staging.validate().unwrap_err();
        let keys: Vec<_> = err.failures().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"udpport"));
        assert!(keys.contains(&"used"));

        assert_eq!(staging.len(), 3);
    }

    #[test]
    fn validate_returns_typed_values_in_key_order() {
        let mut staging = StagingStore::new();
        staging.stage(ConfigKey::UdpPort, "4000".to_string());
        staging.stage(ConfigKey::StationName, "Foo".to_string());

        let values = staging.validate().unwrap();
        assert_eq!(values[0], (ConfigKey::StationName, ConfigValue::Text("Foo".into())));
        assert_eq!(values[1], (ConfigKey::UdpPort, ConfigValue::Port(4000)));
    }

    #[test]
    fn clear_empties_store() {
        let mut staging = StagingStore::new();
        staging.stage(ConfigKey::Slogan, "x".to_string());
        staging.clear();
        assert!(staging.is_empty());
        assert!(staging.validate().unwrap().is_empty());
    }
}
