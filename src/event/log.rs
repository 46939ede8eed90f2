// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event log.
//!
//! One structured entry per committed mutation, emitted on the
//! `onair::events` tracing target so it can be filtered or routed
//! separately from diagnostics (`RUST_LOG=onair::events=info`).

use crate::command::SystemRequest;
use crate::state::StateChange;

use super::CommandSource;

/// Tracing target of the event log.
pub const TARGET: &str = "onair::events";

/// Records a committed state change.
pub fn record_change(revision: u64, source: CommandSource, change: &StateChange) {
    let event = change.event_name();
    match change {
        StateChange::Led { index, on } => {
            tracing::info!(target: TARGET, event, %source, revision, led = %index, on = *on);
        }
        StateChange::Timer {
            index,
            running,
            elapsed,
            ..
        } => {
            tracing::info!(
                target: TARGET,
                event,
                %source,
                revision,
                timer = %index,
                running = *running,
                elapsed = *elapsed
            );
        }
        // Ticks happen every second per running timer.
        StateChange::Tick(advanced) => {
            tracing::trace!(target: TARGET, event, revision, timers = advanced.len());
        }
        StateChange::Text { field, text } => {
            tracing::info!(target: TARGET, event, %source, revision, field = %field, text = %text);
        }
        StateChange::Warning { priority, text } => {
            tracing::info!(
                target: TARGET,
                event,
                %source,
                revision,
                priority = priority.level(),
                text = text.as_deref().unwrap_or_default()
            );
        }
        StateChange::Settings(values) => {
            let keys = values
                .iter()
                .map(|(key, _)| key.to_string())
                .collect::<Vec<_>>()
                .join(",");
            tracing::info!(target: TARGET, event, %source, revision, keys = %keys);
        }
    }
}

/// Records a forwarded system request.
pub fn record_system(source: CommandSource, request: SystemRequest) {
    tracing::info!(target: TARGET, event = "system_event", %source, request = %request);
}
