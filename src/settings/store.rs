// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings persistence collaborator.
//!
//! The engine reads stored settings once at startup and hands committed
//! values back after every successful APPLY. It never owns long-term storage
//! itself; [`SettingsStore`] is the seam.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::SettingsMap;

/// Storage backend for persisted settings.
///
/// Implementations are called from blocking contexts only, never from the
/// State Owner's dispatch path.
pub trait SettingsStore: Send + Sync + 'static {
    /// Loads every stored entry.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the backing storage cannot be read.
    fn load(&self) -> io::Result<SettingsMap>;

    /// Merges `entries` into the stored settings.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the backing storage cannot be written.
    fn persist(&self, entries: &SettingsMap) -> io::Result<()>;
}

/// In-memory settings, for tests and embedding.
///
/// # Examples
///
/// ```
/// use onair_core::settings::{MemorySettings, SettingsStore};
///
/// let store = MemorySettings::new()
///     .with_entry("General", "stationname", "Radio Foo");
/// let loaded = store.load().unwrap();
/// assert_eq!(loaded["General"]["stationname"], "Radio Foo");
/// ```
#[derive(Debug, Default)]
pub struct MemorySettings {
    entries: Mutex<SettingsMap>,
}

impl MemorySettings {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with_entry(
        self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.entries
            .lock()
            .entry(section.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Returns a copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> SettingsMap {
        self.entries.lock().clone()
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> io::Result<SettingsMap> {
        Ok(self.snapshot())
    }

    fn persist(&self, entries: &SettingsMap) -> io::Result<()> {
        merge(&mut self.entries.lock(), entries);
        Ok(())
    }
}

/// Settings stored as a JSON document on disk.
///
/// The document maps section names to key/value objects:
/// `{"General": {"stationname": "Radio Eriwan"}, "LED1": {...}}`.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    /// Uses the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `onairscreen/settings.json` under the platform config directory.
    ///
    /// Returns `None` if the platform has no config directory.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|mut path| {
            path.push("onairscreen");
            path.push("settings.json");
            Self::new(path)
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> io::Result<SettingsMap> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No settings file found, using defaults");
            return Ok(SettingsMap::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let map = serde_json::from_str(&contents)?;
        tracing::info!(path = %self.path.display(), "Loaded settings");
        Ok(map)
    }

    fn persist(&self, entries: &SettingsMap) -> io::Result<()> {
        let mut current = self.load()?;
        merge(&mut current, entries);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write-then-rename keeps the previous file intact if we crash mid-write.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&current)?)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "Saved settings");
        Ok(())
    }
}

fn merge(target: &mut SettingsMap, entries: &SettingsMap) {
    for (section, values) in entries {
        let slot = target.entry(section.clone()).or_default();
        for (key, value) in values {
            slot.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(section: &str, key: &str, value: &str) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        map
    }

    #[test]
    fn memory_persist_merges() {
        let store = MemorySettings::new().with_entry("General", "slogan", "old");
        store.persist(&single("General", "stationname", "New")).unwrap();
        store.persist(&single("General", "slogan", "new")).unwrap();

        let map = store.load().unwrap();
        assert_eq!(map["General"]["stationname"], "New");
        assert_eq!(map["General"]["slogan"], "new");
    }

    #[test]
    fn default_location_is_under_config_dir() {
        if let Some(store) = JsonFileSettings::default_location() {
            assert!(store.path().ends_with("onairscreen/settings.json"));
        }
    }

    #[test]
    fn json_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("onair-settings-{}", uuid::Uuid::new_v4()));
        let store = JsonFileSettings::new(dir.join("settings.json"));

        assert!(store.load().unwrap().is_empty());

        store.persist(&single("LED1", "text", "ON AIR")).unwrap();
        store.persist(&single("Network", "udpport", "3311")).unwrap();

        let map = store.load().unwrap();
        assert_eq!(map["LED1"]["text"], "ON AIR");
        assert_eq!(map["Network"]["udpport"], "3311");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn json_file_rejects_corrupt_document() {
        let dir = std::env::temp_dir().join(format!("onair-settings-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        fs::write(&path, "not json").unwrap();

        assert!(JsonFileSettings::new(&path).load().is_err());

        let _ = fs::remove_dir_all(dir);
    }
}
