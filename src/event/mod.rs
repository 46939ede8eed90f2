// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change notifications.
//!
//! The State Owner publishes a [`DeviceEvent`] on the [`EventBus`] for every
//! committed change and writes an entry to the event [`log`]. Push-socket
//! sessions and the MQTT publisher subscribe to the bus.
//!
//! # Examples
//!
//! ```
//! use onair_core::command::SystemRequest;
//! use onair_core::event::{CommandSource, DeviceEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DeviceEvent::SystemRequested {
//!     request: SystemRequest::Quit,
//!     source: CommandSource::Udp,
//! });
//! assert!(rx.try_recv().is_ok());
//! ```

mod device_event;
mod device_id;
mod event_bus;
pub mod log;

pub use device_event::{CommandSource, DeviceEvent};
pub use device_id::DeviceId;
pub use event_bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
