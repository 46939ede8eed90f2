// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Publish/subscribe transport with home-automation autodiscovery.
//!
//! Everything lives under the base topic `onairscreen_<id6>`:
//!
//! | Direction | Topic | Payload |
//! |---|---|---|
//! | in | `led{1-4}/set`, `air{1-4}/set` | `ON`, `OFF`, `TOGGLE` |
//! | in | `air{3,4}/reset` | anything |
//! | in | `text/{now,next,warn}/set` | text (`WARN` accepts `N:text`) |
//! | in | `command/<VERB>` | the command argument |
//! | out | `led{n}/state`, `air{n}/state` | `ON`/`OFF` |
//! | out | `air{n}/time` | elapsed seconds |
//! | out | `text/{now,next,warn}/state` | text |
//! | out | `warning/active` | `true`/`false` |
//!
//! Outgoing topics are retained.

mod bridge;
mod config;
mod discovery;
mod topics;

pub use bridge::MqttBridge;
pub use config::{
    DEFAULT_DEVICE_NAME, DEFAULT_DISCOVERY_PREFIX, MqttConfig, MqttConfigBuilder,
    ReconnectionPolicy,
};
pub use discovery::{Descriptor, DeviceInfo, EntityConfig, descriptors};
pub use topics::{Publication, Topics};
