// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker connection and the publish/translate worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::command::decode_payload;
use crate::dispatcher::Dispatcher;
use crate::error::TransportError;
use crate::event::{CommandSource, DeviceEvent, DeviceId};

use super::config::{MqttConfig, ReconnectionPolicy};
use super::discovery::{Descriptor, descriptors};
use super::topics::{Publication, Topics};

static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

// Connect republishes 18 descriptors and 16 state topics.
const REQUEST_CAPACITY: usize = 64;

const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

enum Inbound {
    Connected,
    Message { topic: String, payload: Vec<u8> },
}

/// A running MQTT connection bound to one dispatcher.
///
/// Starting never fails on an unreachable broker: the connection is retried
/// in the background according to the [`ReconnectionPolicy`]. After every
/// (re)connect the bridge subscribes, republishes the autodiscovery
/// descriptors and then the full state.
///
/// # Examples
///
/// ```no_run
/// use onair_core::dispatcher::Dispatcher;
/// use onair_core::event::DeviceId;
/// use onair_core::protocol::{MqttBridge, MqttConfig};
/// use onair_core::state::DeviceState;
///
/// # async fn example() -> onair_core::Result<()> {
/// let handles = Dispatcher::builder(DeviceState::new()).spawn();
/// let config = MqttConfig::builder().host("192.168.1.50").build()?;
///
/// let bridge = MqttBridge::start(&config, &DeviceId::new(), handles.dispatcher);
/// println!("publishing under {}", bridge.base_topic());
/// bridge.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MqttBridge {
    client: AsyncClient,
    topics: Topics,
    connected: watch::Receiver<bool>,
    poller: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl MqttBridge {
    /// Connects to the broker in the background.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(config: &MqttConfig, id: &DeviceId, dispatcher: Dispatcher) -> Self {
        let topics = Topics::new(id.base_topic());
        let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let client_id = format!("{}_{}_{counter}", topics.base(), std::process::id());

        let mut options = MqttOptions::new(client_id, config.host(), config.port());
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);
        if let Some((username, password)) = config.credentials() {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (connected_tx, connected_rx) = watch::channel(false);
        // Unbounded so the poller never waits on the worker while the worker
        // waits on the request channel the poller drains.
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let poller = tokio::spawn(poll_events(
            event_loop,
            config.reconnection().clone(),
            connected_tx,
            inbound_tx,
        ));

        let worker = Worker {
            client: client.clone(),
            topics: topics.clone(),
            descriptors: descriptors(config.discovery_prefix(), config.device_name(), id),
            dispatcher,
            connected: connected_rx.clone(),
        };
        let worker = tokio::spawn(worker.run(inbound_rx));

        tracing::info!(
            host = %config.host(),
            port = config.port(),
            base_topic = %topics.base(),
            "MQTT bridge started"
        );

        Self {
            client,
            topics,
            connected: connected_rx,
            poller,
            worker,
        }
    }

    /// Returns the device base topic.
    #[must_use]
    pub fn base_topic(&self) -> &str {
        self.topics.base()
    }

    /// Returns `true` while the broker session is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Waits until the broker session is up.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut connected = self.connected.clone();
        matches!(
            tokio::time::timeout(timeout, connected.wait_for(|up| *up)).await,
            Ok(Ok(_))
        )
    }

    /// Disconnects from the broker and stops the bridge tasks.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Mqtt`] if the disconnect request cannot be
    /// queued.
    pub async fn disconnect(self) -> Result<(), TransportError> {
        tracing::info!(base_topic = %self.topics.base(), "Disconnecting MQTT bridge");
        self.worker.abort();
        let result = self.client.disconnect().await;

        let mut poller = self.poller;
        if tokio::time::timeout(DISCONNECT_GRACE, &mut poller).await.is_err() {
            poller.abort();
        }
        result.map_err(TransportError::from)
    }
}

async fn poll_events(
    mut event_loop: EventLoop,
    policy: ReconnectionPolicy,
    connected: watch::Sender<bool>,
    inbound: mpsc::UnboundedSender<Inbound>,
) {
    let mut attempt = 0u32;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::info!(code = ?connack.code, "Connected to MQTT broker");
                attempt = 0;
                connected.send_replace(true);
                if inbound.send(Inbound::Connected).is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(pkid = suback.pkid, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(topic = %publish.topic, bytes = publish.payload.len(), "MQTT message received");
                let message = Inbound::Message {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if inbound.send(message).is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the session");
                connected.send_replace(false);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.send_replace(false);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                connected.send_replace(false);
                if !policy.should_retry(attempt) {
                    tracing::error!(error = %e, attempts = attempt, "MQTT reconnection attempts exhausted");
                    break;
                }
                let delay = policy.delay_for_attempt(attempt);
                attempt = attempt.saturating_add(1);
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "MQTT connection unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

struct Worker {
    client: AsyncClient,
    topics: Topics,
    descriptors: Vec<Descriptor>,
    dispatcher: Dispatcher,
    connected: watch::Receiver<bool>,
}

impl Worker {
    async fn run(self, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
        let mut events = self.dispatcher.subscribe();
        loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(Inbound::Connected) => self.announce().await,
                    Some(Inbound::Message { topic, payload }) => {
                        self.handle_message(&topic, &payload).await;
                    }
                    None => break,
                },
                event = events.recv() => match event {
                    Ok(DeviceEvent::StateChanged { change, snapshot, .. }) => {
                        if self.is_connected() {
                            self.publish_all(self.topics.changed(&change, &snapshot)).await;
                        }
                    }
                    Ok(DeviceEvent::SystemRequested { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "MQTT publisher lagged, republishing full state");
                        if self.is_connected() {
                            let snapshot = self.dispatcher.snapshot();
                            self.publish_all(self.topics.full_state(&snapshot)).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        tracing::debug!(base_topic = %self.topics.base(), "MQTT worker stopped");
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Subscribes, then republishes discovery and the full state.
    async fn announce(&self) {
        for topic in self.topics.subscriptions() {
            if let Err(e) = self.client.subscribe(&topic, QoS::AtLeastOnce).await {
                tracing::warn!(topic = %topic, error = %e, "MQTT subscribe failed");
            }
        }

        for descriptor in &self.descriptors {
            match descriptor.payload() {
                Ok(payload) => self.publish(&descriptor.topic, payload).await,
                Err(e) => {
                    tracing::warn!(topic = %descriptor.topic, error = %e, "Failed to encode discovery descriptor");
                }
            }
        }

        let snapshot = self.dispatcher.snapshot();
        self.publish_all(self.topics.full_state(&snapshot)).await;
        tracing::info!(
            base_topic = %self.topics.base(),
            entities = self.descriptors.len(),
            revision = snapshot.revision(),
            "Published MQTT discovery and state"
        );
    }

    async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let payload = match decode_payload(payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Dropped MQTT message");
                return;
            }
        };
        let Some(line) = self.topics.translate(topic, payload) else {
            tracing::debug!(topic = %topic, "Ignoring MQTT message on unhandled topic");
            return;
        };

        match self.dispatcher.execute(&line, CommandSource::Mqtt).await {
            Ok(outcome) => tracing::debug!(line = %line, ?outcome, "MQTT command applied"),
            Err(e) => tracing::debug!(line = %line, error = %e, "MQTT command not applied"),
        }
    }

    async fn publish_all(&self, publications: Vec<Publication>) {
        for publication in publications {
            self.publish(&publication.topic, publication.payload).await;
        }
    }

    async fn publish(&self, topic: &str, payload: String) {
        if let Err(e) = self
            .client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await
        {
            tracing::warn!(topic = %topic, error = %e, "MQTT publish failed");
        }
    }
}
