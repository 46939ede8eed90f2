// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Warning priority queue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::WarningPriority;

/// A warning at one priority level.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct WarningEntry {
    /// Priority level.
    pub priority: WarningPriority,
    /// Non-empty warning text.
    pub text: String,
    /// When the entry was last set.
    pub created_at: DateTime<Utc>,
}

/// At most one warning per priority level, ordered by priority.
///
/// The displayed warning is the highest of levels 0-2 that is set; the
/// time-sync level (-1) only shows when none of them is.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use onair_core::state::WarningQueue;
/// use onair_core::types::WarningPriority;
///
/// let mut queue = WarningQueue::new();
/// queue.set(WarningPriority::High, "Fire", Utc::now());
/// queue.set(WarningPriority::Normal, "Rain", Utc::now());
/// assert_eq!(queue.current().unwrap().text, "Fire");
///
/// queue.clear(WarningPriority::High);
/// assert_eq!(queue.current().unwrap().text, "Rain");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningQueue {
    entries: BTreeMap<WarningPriority, WarningEntry>,
}

impl WarningQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the warning at `priority`, replacing any previous one.
    ///
    /// An empty `text` clears the level. Returns `true` if the queue changed.
    pub fn set(&mut self, priority: WarningPriority, text: &str, now: DateTime<Utc>) -> bool {
        if text.is_empty() {
            return self.clear(priority);
        }
        if self.entries.get(&priority).is_some_and(|e| e.text == text) {
            return false;
        }
        self.entries.insert(
            priority,
            WarningEntry {
                priority,
                text: text.to_string(),
                created_at: now,
            },
        );
        true
    }

    /// Clears the warning at `priority`. Returns `true` if one was set.
    pub fn clear(&mut self, priority: WarningPriority) -> bool {
        self.entries.remove(&priority).is_some()
    }

    /// Returns the warning that should be displayed.
    #[must_use]
    pub fn current(&self) -> Option<&WarningEntry> {
        // TimeSync sorts lowest, so the last entry is the arbitration winner.
        self.entries.values().next_back()
    }

    /// Returns the warning at `priority`.
    #[must_use]
    pub fn get(&self, priority: WarningPriority) -> Option<&WarningEntry> {
        self.entries.get(&priority)
    }

    /// Iterates over all warnings, lowest priority first.
    pub fn iter(&self) -> impl Iterator<Item = &WarningEntry> {
        self.entries.values()
    }

    /// Returns `true` if no warning is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
