// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT bridge using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mockforge_mqtt::start_mqtt_server;
use onair_core::dispatcher::Dispatcher;
use onair_core::engine::{Engine, EngineConfig, TransportStatus};
use onair_core::event::{CommandSource, DeviceId};
use onair_core::protocol::{MqttBridge, MqttConfig, ReconnectionPolicy};
use onair_core::state::DeviceState;
use onair_core::types::{AirIndex, LedIndex};
use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = mockforge_mqtt::broker::MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

/// A plain MQTT client recording every publication it receives.
struct Observer {
    client: AsyncClient,
    messages: mpsc::UnboundedReceiver<(String, String)>,
    seen: Vec<(String, String)>,
}

impl Observer {
    /// Connects and waits until every filter is acknowledged.
    async fn connect(port: u16, filters: &[String]) -> Self {
        static OBSERVER_COUNTER: AtomicU32 = AtomicU32::new(0);
        let id = OBSERVER_COUNTER.fetch_add(1, Ordering::SeqCst);
        let options = MqttOptions::new(format!("observer_{id}"), "127.0.0.1", port);
        let (client, mut event_loop) = AsyncClient::new(options, 32);
        let (tx, messages) = mpsc::unbounded_channel();

        for filter in filters {
            client.subscribe(filter, QoS::AtLeastOnce).await.unwrap();
        }
        let mut acked = 0;
        timeout(Duration::from_secs(5), async {
            while acked < filters.len() {
                match event_loop.poll().await.unwrap() {
                    Event::Incoming(Packet::SubAck(_)) => acked += 1,
                    Event::Incoming(Packet::Publish(p)) => {
                        let _ = tx.send((p.topic, String::from_utf8_lossy(&p.payload).into_owned()));
                    }
                    _ => {}
                }
            }
        })
        .await
        .expect("observer subscriptions not acknowledged");

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(p))) => {
                        let payload = String::from_utf8_lossy(&p.payload).into_owned();
                        if tx.send((p.topic, payload)).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });

        Self {
            client,
            messages,
            seen: Vec::new(),
        }
    }

    /// Receives until `done` holds for everything seen so far.
    async fn until(&mut self, done: impl Fn(&[(String, String)]) -> bool) {
        timeout(Duration::from_secs(5), async {
            while !done(&self.seen) {
                let message = self.messages.recv().await.unwrap();
                self.seen.push(message);
            }
        })
        .await
        .expect("expected MQTT publications did not arrive");
    }

    /// Payloads received on `topic`, in order.
    fn payloads(&self, topic: &str) -> Vec<&str> {
        self.seen
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

/// Forwards TCP connections to the broker and can cut them on demand.
struct Relay {
    port: u16,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Relay {
    async fn start(broker_port: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let sessions = Arc::new(Mutex::new(Vec::new()));
        let tracked = Arc::clone(&sessions);
        tokio::spawn(async move {
            while let Ok((mut inbound, _)) = listener.accept().await {
                let session = tokio::spawn(async move {
                    if let Ok(mut outbound) = TcpStream::connect(("127.0.0.1", broker_port)).await {
                        let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
                    }
                });
                tracked.lock().push(session);
            }
        });
        Self { port, sessions }
    }

    /// Drops every forwarded connection; new ones are still accepted.
    fn cut(&self) {
        for session in self.sessions.lock().drain(..) {
            session.abort();
        }
    }
}

fn broker_config(port: u16) -> MqttConfig {
    MqttConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .reconnection(ReconnectionPolicy::default().with_initial_delay(Duration::from_millis(100)))
        .build()
        .unwrap()
}

// ============================================================================
// Bridge Connection Tests
// ============================================================================

mod bridge_connection {
    use super::*;

    #[tokio::test]
    async fn connects_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();

        let bridge = MqttBridge::start(&broker_config(port), &DeviceId::new(), handles.dispatcher);

        assert!(bridge.wait_connected(Duration::from_secs(5)).await);
        assert!(bridge.is_connected());
        assert!(bridge.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn base_topic_follows_device_id() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
        let id = DeviceId::new();

        let bridge = MqttBridge::start(&broker_config(port), &id, handles.dispatcher);

        assert_eq!(bridge.base_topic(), format!("onairscreen_{}", id.short_id()));
        bridge.disconnect().await.ok();
    }

    #[tokio::test]
    async fn state_changes_while_connected_keep_flowing() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
        let dispatcher = handles.dispatcher;

        let bridge = MqttBridge::start(&broker_config(port), &DeviceId::new(), dispatcher.clone());
        assert!(bridge.wait_connected(Duration::from_secs(5)).await);

        // Publishing happens on the bridge worker and never blocks commands.
        for line in ["LED1:ON", "AIR1:ON", "NOW:News", "WARN:2:Fire", "AIR1:OFF"] {
            dispatcher.execute(line, CommandSource::Http).await.unwrap();
        }
        assert_eq!(dispatcher.snapshot().revision(), 5);
        assert!(bridge.is_connected());
        bridge.disconnect().await.ok();
    }

    #[tokio::test]
    async fn two_devices_share_a_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let first = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
        let second = Dispatcher::builder(DeviceState::new()).without_tick().spawn();

        let a = MqttBridge::start(&broker_config(port), &DeviceId::new(), first.dispatcher);
        let b = MqttBridge::start(&broker_config(port), &DeviceId::new(), second.dispatcher);

        assert!(a.wait_connected(Duration::from_secs(5)).await);
        assert!(b.wait_connected(Duration::from_secs(5)).await);
        assert_ne!(a.base_topic(), b.base_topic());
        a.disconnect().await.ok();
        b.disconnect().await.ok();
    }
}

// ============================================================================
// Message Routing Tests
// ============================================================================

mod message_routing {
    use super::*;

    #[tokio::test]
    async fn set_topic_drives_dispatcher() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
        let dispatcher = handles.dispatcher;
        let id = DeviceId::new();
        let base = id.base_topic();
        let mut observer = Observer::connect(port, &[format!("{base}/led1/state")]).await;

        let bridge = MqttBridge::start(&broker_config(port), &id, dispatcher.clone());
        // The first state publication follows the bridge's own subscriptions.
        observer.until(|seen| !seen.is_empty()).await;

        observer
            .client
            .publish(format!("{base}/led1/set"), QoS::AtLeastOnce, false, "on")
            .await
            .unwrap();

        let mut watch = dispatcher.watch();
        timeout(Duration::from_secs(5), watch.wait_for(|s| s.led(LedIndex::new(1).unwrap()).on))
            .await
            .expect("LED1 was not switched on")
            .unwrap();
        let topic = format!("{base}/led1/state");
        observer.until(|seen| seen.iter().any(|(t, p)| *t == topic && p == "ON")).await;
        assert_eq!(observer.payloads(&topic).first(), Some(&"OFF"));
        bridge.disconnect().await.ok();
    }

    #[tokio::test]
    async fn state_changes_are_published() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
        let dispatcher = handles.dispatcher;
        let id = DeviceId::new();
        let base = id.base_topic();
        let mut observer = Observer::connect(port, &[format!("{base}/#")]).await;

        let bridge = MqttBridge::start(&broker_config(port), &id, dispatcher.clone());
        let warning = format!("{base}/warning/active");
        observer.until(|seen| seen.iter().any(|(t, _)| *t == warning)).await;

        for line in ["LED2:ON", "AIR3TIME:90", "NOW:Morning Show", "WARN:2:Fire"] {
            dispatcher.execute(line, CommandSource::Internal).await.unwrap();
        }

        let expected = [
            (format!("{base}/led2/state"), "ON"),
            (format!("{base}/air3/time"), "90"),
            (format!("{base}/text/now/state"), "Morning Show"),
            (format!("{base}/text/warn/state"), "Fire"),
            (format!("{base}/warning/active"), "true"),
        ];
        observer
            .until(|seen| {
                expected
                    .iter()
                    .all(|(topic, payload)| seen.iter().any(|(t, p)| t == topic && p.as_str() == *payload))
            })
            .await;
        // Untouched fields keep their initial state.
        assert!(observer.payloads(&format!("{base}/led1/state")).iter().all(|p| *p == "OFF"));
        assert!(observer.payloads(&format!("{base}/air3/state")).iter().all(|p| *p == "OFF"));
        bridge.disconnect().await.ok();
    }

    #[tokio::test]
    async fn reconnect_republishes_discovery_and_state() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let relay = Relay::start(port).await;
        let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
        let dispatcher = handles.dispatcher;
        let id = DeviceId::new();
        let base = id.base_topic();
        let mut observer =
            Observer::connect(port, &["homeassistant/#".to_string(), format!("{base}/#")]).await;

        let bridge = MqttBridge::start(&broker_config(relay.port), &id, dispatcher.clone());
        let discovery = |seen: &[(String, String)]| -> BTreeMap<String, Vec<String>> {
            let mut by_topic: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (topic, payload) in seen {
                if topic.starts_with("homeassistant/") && topic.contains(&id.short_id()) {
                    by_topic.entry(topic.clone()).or_default().push(payload.clone());
                }
            }
            by_topic
        };
        let warning = format!("{base}/warning/active");
        observer
            .until(|seen| discovery(seen).len() == 18 && seen.iter().any(|(t, _)| *t == warning))
            .await;

        dispatcher.execute("AIR4:ON", CommandSource::Internal).await.unwrap();
        let air4 = format!("{base}/air4/state");
        observer.until(|seen| seen.iter().any(|(t, p)| *t == air4 && p == "ON")).await;

        let before = discovery(&observer.seen);
        let count = |seen: &[(String, String)], topic: &str| seen.iter().filter(|(t, _)| t == topic).count();
        let air4_before = count(&observer.seen, &air4);

        relay.cut();
        observer
            .until(|seen| {
                discovery(seen)
                    .iter()
                    .all(|(topic, payloads)| payloads.len() > before[topic].len())
            })
            .await;
        observer.until(|seen| count(seen, &air4) > air4_before).await;
        assert!(bridge.wait_connected(Duration::from_secs(5)).await);

        let republished = discovery(&observer.seen);
        assert_eq!(republished.len(), 18, "no new entities after reconnect");
        for payloads in republished.values() {
            let distinct: BTreeSet<&String> = payloads.iter().collect();
            assert_eq!(distinct.len(), 1, "descriptor payloads are stable");
        }
        assert_eq!(observer.payloads(&air4).last(), Some(&"ON"));
        assert_eq!(dispatcher.snapshot().revision(), 1);
        assert!(dispatcher.snapshot().timer(AirIndex::STREAM).is_running());
        bridge.disconnect().await.ok();
    }
}

// ============================================================================
// Engine Wiring Tests
// ============================================================================

mod engine_wiring {
    use super::*;

    fn loopback() -> onair_core::engine::EngineConfigBuilder {
        EngineConfig::builder()
            .bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .udp_port(0)
            .http_port(0)
    }

    #[tokio::test]
    async fn engine_starts_bridge_in_background() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let config = loopback().mqtt(broker_config(port)).build().unwrap();
        let engine = Engine::builder(config).start().await;

        assert!(
            engine
                .transports()
                .iter()
                .any(|t| matches!(t, TransportStatus::Connecting { .. }))
        );
        let bridge = engine.mqtt().unwrap();
        assert!(bridge.wait_connected(Duration::from_secs(5)).await);
        assert_eq!(bridge.base_topic(), engine.device_id().base_topic());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn unreachable_broker_does_not_stop_other_transports() {
        // Nothing listens on this port.
        let port = get_test_port();
        let config = loopback().mqtt(broker_config(port)).build().unwrap();
        let engine = Engine::builder(config).start().await;

        assert!(engine.udp_addr().is_some());
        assert!(!engine.mqtt().unwrap().is_connected());
        engine
            .dispatcher()
            .execute("LED4:ON", CommandSource::Internal)
            .await
            .unwrap();
        assert_eq!(engine.dispatcher().snapshot().revision(), 1);
        engine.shutdown().await;
    }
}
