// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network transports.
//!
//! Every transport runs as its own task and funnels command lines into the
//! [`Dispatcher`](crate::dispatcher::Dispatcher). None of them touches
//! device state directly.
//!
//! # Transports
//!
//! - [`UdpListener`]: newline-separated command datagrams, unicast and
//!   multicast, no reply
//! - [`HttpServer`]: `GET` command API, status document, web UI and the
//!   WebSocket push channel (feature `http`)
//! - [`MqttBridge`]: topic-mapped commands, retained state publications and
//!   autodiscovery (feature `mqtt`)

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mqtt")]
mod mqtt;
mod udp;

#[cfg(feature = "http")]
pub use http::{CommandReply, DEFAULT_REQUEST_TIMEOUT, HttpServer, command_from_query, router};
#[cfg(feature = "mqtt")]
pub use mqtt::{
    DEFAULT_DEVICE_NAME, DEFAULT_DISCOVERY_PREFIX, Descriptor, DeviceInfo, EntityConfig,
    MqttBridge, MqttConfig, MqttConfigBuilder, Publication, ReconnectionPolicy, Topics,
    descriptors,
};
pub use udp::{MAX_DATAGRAM_SIZE, UdpListener};
