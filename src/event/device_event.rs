// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use std::fmt;
use std::sync::Arc;

use crate::command::SystemRequest;
use crate::state::{DeviceState, StateChange};

/// Transport a command arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    /// UDP datagram.
    Udp,
    /// HTTP request.
    Http,
    /// WebSocket text frame.
    WebSocket,
    /// MQTT message.
    Mqtt,
    /// Tick driver, time-sync collaborator or display.
    Internal,
}

impl CommandSource {
    /// Returns the log tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Http => "http",
            Self::WebSocket => "websocket",
            Self::Mqtt => "mqtt",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events published by the State Owner.
///
/// Every committed mutation produces exactly one
/// [`StateChanged`](Self::StateChanged) event, in commit order.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use onair_core::event::{CommandSource, DeviceEvent};
/// use onair_core::state::{DeviceState, StateChange};
/// use onair_core::types::LedIndex;
///
/// let event = DeviceEvent::StateChanged {
///     revision: 1,
///     source: CommandSource::Udp,
///     change: StateChange::Led { index: LedIndex::new(1).unwrap(), on: true },
///     snapshot: Arc::new(DeviceState::new()),
/// };
/// assert!(event.is_state_change());
/// ```
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// Device state changed.
    StateChanged {
        /// Revision after the change.
        revision: u64,
        /// Where the change came from.
        source: CommandSource,
        /// The change that was applied.
        change: StateChange,
        /// The complete state after the change.
        snapshot: Arc<DeviceState>,
    },

    /// A `CMD:` request was handed to the OS-operations collaborator.
    SystemRequested {
        /// The request.
        request: SystemRequest,
        /// Where it came from.
        source: CommandSource,
    },
}

impl DeviceEvent {
    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Returns the originating transport.
    #[must_use]
    pub fn source(&self) -> CommandSource {
        match self {
            Self::StateChanged { source, .. } | Self::SystemRequested { source, .. } => *source,
        }
    }
}
