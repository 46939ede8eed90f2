// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Datagram transport.
//!
//! Each datagram carries one or more newline-separated command lines. There
//! is no reply; rejected lines are only logged.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::command::decode_payload;
use crate::dispatcher::Dispatcher;
use crate::error::TransportError;
use crate::event::CommandSource;

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// A bound datagram listener, not yet running.
#[derive(Debug)]
pub struct UdpListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
    multicast: Option<Ipv4Addr>,
}

impl UdpListener {
    /// Binds the listener and joins `multicast` if it is a multicast group.
    ///
    /// A failed group join is logged and the listener stays unicast-only.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the address cannot be bound.
    pub async fn bind(
        addr: SocketAddr,
        multicast: Option<Ipv4Addr>,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::from_bind("UDP", addr, e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| TransportError::from_bind("UDP", addr, e))?;

        let joined = match multicast {
            Some(group) if group.is_multicast() && addr.is_ipv4() => {
                let interface = match addr.ip() {
                    IpAddr::V4(ip) => ip,
                    IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
                };
                match socket.join_multicast_v4(group, interface) {
                    Ok(()) => {
                        tracing::info!(group = %group, "Joined UDP multicast group");
                        Some(group)
                    }
                    Err(e) => {
                        tracing::warn!(group = %group, error = %e, "Failed to join multicast group, continuing unicast-only");
                        None
                    }
                }
            }
            Some(group) => {
                tracing::debug!(group = %group, "Not a multicast group, skipping join");
                None
            }
            None => None,
        };

        tracing::info!(addr = %local_addr, "UDP listener bound");
        Ok(Self {
            socket,
            local_addr,
            multicast: joined,
        })
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the joined multicast group, if any.
    #[must_use]
    pub const fn multicast_group(&self) -> Option<Ipv4Addr> {
        self.multicast
    }

    /// Starts receiving datagrams.
    pub fn spawn(self, dispatcher: Dispatcher) -> JoinHandle<()> {
        tokio::spawn(self.run(dispatcher))
    }

    async fn run(self, dispatcher: Dispatcher) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    // ICMP errors from earlier sends surface here on some platforms.
                    tracing::warn!(error = %e, "UDP receive failed");
                    continue;
                }
            };
            if len == 0 {
                continue;
            }

            let payload = match decode_payload(&buf[..len]) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(peer = %peer, bytes = len, error = %e, "Dropped UDP datagram");
                    continue;
                }
            };
            tracing::debug!(peer = %peer, bytes = len, "UDP datagram received");

            if dispatcher.enqueue(payload, CommandSource::Udp).await.is_err() {
                tracing::info!(addr = %self.local_addr, "State Owner gone, UDP listener stopping");
                break;
            }
        }
    }
}
