// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine bootstrap.
//!
//! [`Engine`] wires the pieces together: it seeds [`DeviceState`] from the
//! settings collaborator, spawns the State Owner and then starts every
//! transport on its own. A transport that fails to start is logged and
//! reported in [`Engine::transports`]; the others keep running.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use onair_core::engine::{Engine, EngineConfig};
//! use onair_core::settings::MemorySettings;
//!
//! # async fn example() -> onair_core::Result<()> {
//! let config = EngineConfig::builder().udp_port(3310).http_port(8010).build()?;
//! let engine = Engine::builder(config)
//!     .settings(Arc::new(MemorySettings::new()))
//!     .start()
//!     .await;
//!
//! for status in engine.transports() {
//!     println!("{status}");
//! }
//! engine.dispatcher().execute("LED1:ON", onair_core::event::CommandSource::Internal).await?;
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::dispatcher::{
    DEFAULT_TICK_INTERVAL, Dispatcher, RenderQueue, SystemOperations, TimeSyncHandle,
};
use crate::error::TransportError;
use crate::event::{DEFAULT_CHANNEL_CAPACITY, DeviceId};
use crate::protocol::UdpListener;
use crate::settings::{DEVICE_SECTION, DEVICE_UUID_KEY, SettingsMap, SettingsStore};
use crate::state::DeviceState;

#[cfg(feature = "http")]
use crate::protocol::HttpServer;
#[cfg(feature = "mqtt")]
use crate::protocol::{MqttBridge, MqttConfig};

/// Default time an HTTP request waits for the state owner.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Engine settings that are not part of the device state.
///
/// Ports and the multicast group default to the values in the seeded
/// [`DeviceState`]; setting them here overrides the stored ones.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    bind_address: IpAddr,
    udp_port: Option<u16>,
    http_port: Option<u16>,
    multicast_address: Option<Ipv4Addr>,
    tick_interval: Duration,
    request_timeout: Duration,
    push_capacity: usize,
    #[cfg(feature = "mqtt")]
    mqtt: Option<MqttConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            udp_port: None,
            http_port: None,
            multicast_address: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            push_capacity: DEFAULT_CHANNEL_CAPACITY,
            #[cfg(feature = "mqtt")]
            mqtt: None,
        }
    }
}

impl EngineConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Returns the listen address for UDP and HTTP.
    #[must_use]
    pub const fn bind_address(&self) -> IpAddr {
        self.bind_address
    }

    /// Returns the tick interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Returns how long an HTTP request waits for the state owner.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the push channel capacity.
    #[must_use]
    pub const fn push_capacity(&self) -> usize {
        self.push_capacity
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the listen address (default `0.0.0.0`).
    #[must_use]
    pub const fn bind_address(mut self, addr: IpAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Sets the UDP port, overriding the stored one. `0` picks a free port.
    #[must_use]
    pub const fn udp_port(mut self, port: u16) -> Self {
        self.config.udp_port = Some(port);
        self
    }

    /// Sets the HTTP port, overriding the stored one. `0` picks a free port.
    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = Some(port);
        self
    }

    /// Sets the UDP multicast group, overriding the stored one.
    #[must_use]
    pub const fn multicast_address(mut self, group: Ipv4Addr) -> Self {
        self.config.multicast_address = Some(group);
        self
    }

    /// Sets the timer tick interval (default 1 second).
    #[must_use]
    pub const fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    /// Sets how long an HTTP request waits for the state owner (default 5
    /// seconds). Expiry answers 503.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets how many change events a push client may fall behind.
    #[must_use]
    pub const fn push_capacity(mut self, capacity: usize) -> Self {
        self.config.push_capacity = capacity;
        self
    }

    /// Enables the MQTT bridge.
    #[cfg(feature = "mqtt")]
    #[must_use]
    pub fn mqtt(mut self, config: MqttConfig) -> Self {
        self.config.mqtt = Some(config);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] for a zero tick
    /// interval, request timeout or push capacity.
    pub fn build(self) -> Result<EngineConfig, TransportError> {
        if self.config.tick_interval.is_zero() {
            return Err(TransportError::InvalidConfiguration(
                "tick interval must be positive".to_string(),
            ));
        }
        if self.config.request_timeout.is_zero() {
            return Err(TransportError::InvalidConfiguration(
                "request timeout must be positive".to_string(),
            ));
        }
        if self.config.push_capacity == 0 {
            return Err(TransportError::InvalidConfiguration(
                "push capacity must be positive".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Startup outcome of one transport.
#[derive(Debug)]
pub enum TransportStatus {
    /// The transport is serving on `addr`.
    Listening {
        /// Transport name.
        transport: &'static str,
        /// Bound address.
        addr: SocketAddr,
    },
    /// The MQTT bridge is connecting in the background.
    Connecting {
        /// `host:port` of the broker.
        broker: String,
    },
    /// The transport could not be started.
    Failed {
        /// Transport name.
        transport: &'static str,
        /// Why.
        error: TransportError,
    },
}

impl TransportStatus {
    /// Returns the transport name.
    #[must_use]
    pub const fn transport(&self) -> &'static str {
        match self {
            Self::Listening { transport, .. } | Self::Failed { transport, .. } => transport,
            Self::Connecting { .. } => "MQTT",
        }
    }

    /// Returns `true` unless the transport failed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { transport, addr } => write!(f, "{transport} listening on {addr}"),
            Self::Connecting { broker } => write!(f, "MQTT connecting to {broker}"),
            Self::Failed { transport, error } => write!(f, "{transport} failed: {error}"),
        }
    }
}

/// Builder for [`Engine`].
#[must_use]
pub struct EngineBuilder {
    config: EngineConfig,
    settings: Option<Arc<dyn SettingsStore>>,
    system: Option<Arc<dyn SystemOperations>>,
    render_queue: bool,
    device_id: Option<DeviceId>,
}

impl EngineBuilder {
    /// Seeds state from `store` and persists committed configuration to it.
    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    /// Sets the OS-operations collaborator.
    pub fn system_operations(mut self, ops: Arc<dyn SystemOperations>) -> Self {
        self.system = Some(ops);
        self
    }

    /// Creates a render queue, see [`Engine::take_render_queue`].
    pub fn render_queue(mut self) -> Self {
        self.render_queue = true;
        self
    }

    /// Uses `id` instead of the stored or a generated identifier.
    pub fn device_id(mut self, id: DeviceId) -> Self {
        self.device_id = Some(id);
        self
    }

    /// Starts the State Owner and every transport.
    ///
    /// Never fails: transport startup errors are reported through
    /// [`Engine::transports`].
    pub async fn start(self) -> Engine {
        let stored = match &self.settings {
            Some(store) => load_settings(Arc::clone(store)).await,
            None => SettingsMap::new(),
        };

        let mut state = DeviceState::new();
        let seeded = state.seed_from(&stored);
        if seeded > 0 {
            tracing::info!(entries = seeded, "Seeded state from stored settings");
        }

        let device_id = match self.device_id {
            Some(id) => id,
            None => resolve_device_id(&stored, self.settings.as_ref()).await,
        };

        let udp_addr = SocketAddr::new(
            self.config.bind_address,
            self.config.udp_port.unwrap_or(state.network().udp_port),
        );
        #[cfg(feature = "http")]
        let http_addr = SocketAddr::new(
            self.config.bind_address,
            self.config.http_port.unwrap_or(state.network().http_port),
        );
        let multicast = self
            .config
            .multicast_address
            .unwrap_or(state.network().multicast_address);

        let mut builder = Dispatcher::builder(state)
            .event_capacity(self.config.push_capacity)
            .tick_interval(self.config.tick_interval);
        if let Some(store) = self.settings {
            builder = builder.settings(store);
        }
        if let Some(ops) = self.system {
            builder = builder.system_operations(ops);
        }
        if self.render_queue {
            builder = builder.render_queue();
        }
        let handles = builder.spawn();
        let dispatcher = handles.dispatcher;
        let mut tasks = handles.tasks;

        let (shutdown, _) = watch::channel(false);
        let mut transports = Vec::new();

        match UdpListener::bind(udp_addr, Some(multicast)).await {
            Ok(listener) => {
                transports.push(TransportStatus::Listening {
                    transport: "UDP",
                    addr: listener.local_addr(),
                });
                tasks.push(listener.spawn(dispatcher.clone()));
            }
            Err(error) => {
                tracing::error!(addr = %udp_addr, error = %error, "UDP transport failed to start");
                transports.push(TransportStatus::Failed {
                    transport: "UDP",
                    error,
                });
            }
        }

        #[cfg(feature = "http")]
        let http_task = match HttpServer::bind(http_addr).await {
            Ok(server) => {
                transports.push(TransportStatus::Listening {
                    transport: "HTTP",
                    addr: server.local_addr(),
                });
                let mut stop = shutdown.subscribe();
                let signal = async move {
                    stop.wait_for(|stopping| *stopping).await.ok();
                };
                Some(
                    server
                        .request_timeout(self.config.request_timeout)
                        .spawn(dispatcher.clone(), signal),
                )
            }
            Err(error) => {
                tracing::error!(addr = %http_addr, error = %error, "HTTP transport failed to start");
                transports.push(TransportStatus::Failed {
                    transport: "HTTP",
                    error,
                });
                None
            }
        };

        #[cfg(feature = "mqtt")]
        let mqtt = self.config.mqtt.as_ref().map(|config| {
            transports.push(TransportStatus::Connecting {
                broker: format!("{}:{}", config.host(), config.port()),
            });
            MqttBridge::start(config, &device_id, dispatcher.clone())
        });

        let running = transports.iter().filter(|t| t.is_running()).count();
        tracing::info!(
            device = %device_id.base_topic(),
            transports = running,
            failed = transports.len() - running,
            "Engine started"
        );

        Engine {
            dispatcher,
            time_sync: Some(handles.time_sync),
            render_queue: handles.render_queue,
            device_id,
            transports,
            shutdown,
            tasks,
            #[cfg(feature = "http")]
            http_task,
            #[cfg(feature = "mqtt")]
            mqtt,
        }
    }
}

/// A running engine.
#[derive(Debug)]
pub struct Engine {
    dispatcher: Dispatcher,
    time_sync: Option<TimeSyncHandle>,
    render_queue: Option<RenderQueue>,
    device_id: DeviceId,
    transports: Vec<TransportStatus>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    #[cfg(feature = "http")]
    http_task: Option<JoinHandle<()>>,
    #[cfg(feature = "mqtt")]
    mqtt: Option<MqttBridge>,
}

impl Engine {
    /// Creates a builder.
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            settings: None,
            system: None,
            render_queue: false,
            device_id: None,
        }
    }

    /// Returns the dispatcher handle.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Hands out the time-sync handle. Returns `None` after the first call.
    pub fn take_time_sync(&mut self) -> Option<TimeSyncHandle> {
        self.time_sync.take()
    }

    /// Hands out the render queue, if one was requested.
    pub fn take_render_queue(&mut self) -> Option<RenderQueue> {
        self.render_queue.take()
    }

    /// Returns the device identifier.
    #[must_use]
    pub const fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// Returns the startup outcome of every transport.
    #[must_use]
    pub fn transports(&self) -> &[TransportStatus] {
        &self.transports
    }

    /// Returns the bound UDP address, if the listener started.
    #[must_use]
    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.listening("UDP")
    }

    /// Returns the bound HTTP address, if the server started.
    #[must_use]
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.listening("HTTP")
    }

    /// Returns the MQTT bridge, if configured.
    #[cfg(feature = "mqtt")]
    #[must_use]
    pub const fn mqtt(&self) -> Option<&MqttBridge> {
        self.mqtt.as_ref()
    }

    fn listening(&self, name: &str) -> Option<SocketAddr> {
        self.transports.iter().find_map(|status| match status {
            TransportStatus::Listening { transport, addr } if *transport == name => Some(*addr),
            _ => None,
        })
    }

    /// Stops the transports and the State Owner.
    pub async fn shutdown(self) {
        tracing::info!("Engine shutting down");
        self.shutdown.send_replace(true);

        #[cfg(feature = "mqtt")]
        if let Some(bridge) = self.mqtt
            && let Err(e) = bridge.disconnect().await
        {
            tracing::warn!(error = %e, "MQTT disconnect failed");
        }

        #[cfg(feature = "http")]
        if let Some(mut task) = self.http_task
            && tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err()
        {
            // Open push sessions keep graceful shutdown waiting.
            task.abort();
        }

        for task in &self.tasks {
            task.abort();
        }
        tracing::info!("Engine stopped");
    }
}

async fn load_settings(store: Arc<dyn SettingsStore>) -> SettingsMap {
    match tokio::task::spawn_blocking(move || store.load()).await {
        Ok(Ok(map)) => map,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to load settings, using defaults");
            SettingsMap::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Settings loader panicked, using defaults");
            SettingsMap::new()
        }
    }
}

/// Returns the stored identifier, or generates and persists a new one.
async fn resolve_device_id(
    stored: &SettingsMap,
    store: Option<&Arc<dyn SettingsStore>>,
) -> DeviceId {
    if let Some(id) = stored
        .get(DEVICE_SECTION)
        .and_then(|section| section.get(DEVICE_UUID_KEY))
        .and_then(|raw| DeviceId::parse(raw))
    {
        return id;
    }

    let id = DeviceId::new();
    tracing::info!(device = %id.base_topic(), "Generated new device identifier");

    if let Some(store) = store {
        let store = Arc::clone(store);
        let mut entry = SettingsMap::new();
        entry
            .entry(DEVICE_SECTION.to_string())
            .or_default()
            .insert(DEVICE_UUID_KEY.to_string(), id.as_uuid().to_string());
        match tokio::task::spawn_blocking(move || store.persist(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist device identifier"),
            Err(e) => tracing::warn!(error = %e, "Device identifier writer panicked"),
        }
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    fn loopback() -> EngineConfigBuilder {
        EngineConfig::builder()
            .bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .udp_port(0)
            .http_port(0)
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::builder().build().unwrap();
        assert_eq!(config.bind_address(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.push_capacity(), 256);
        assert!(config.udp_port.is_none());
    }

    #[test]
    fn config_rejects_zero_values() {
        assert!(EngineConfig::builder().push_capacity(0).build().is_err());
        assert!(
            EngineConfig::builder()
                .tick_interval(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(
            EngineConfig::builder()
                .request_timeout(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[tokio::test]
    async fn device_id_is_generated_once_and_persisted() {
        let store = Arc::new(MemorySettings::new());
        let engine = Engine::builder(loopback().build().unwrap())
            .settings(store.clone())
            .start()
            .await;
        let first = *engine.device_id();
        engine.shutdown().await;

        assert_eq!(
            store.snapshot()[DEVICE_SECTION][DEVICE_UUID_KEY],
            first.as_uuid().to_string()
        );

        let engine = Engine::builder(loopback().build().unwrap())
            .settings(store)
            .start()
            .await;
        assert_eq!(*engine.device_id(), first);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn stored_settings_seed_state() {
        let store = Arc::new(
            MemorySettings::new()
                .with_entry("General", "stationname", "Radio Foo")
                .with_entry("General", "stationcolor", "not-a-color"),
        );
        let engine = Engine::builder(loopback().build().unwrap())
            .settings(store)
            .start()
            .await;

        let snapshot = engine.dispatcher().snapshot();
        assert_eq!(snapshot.station().station_name, "Radio Foo");
        assert_eq!(
            snapshot.station().station_color,
            DeviceState::new().station().station_color
        );
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn time_sync_is_handed_out_once() {
        let mut engine = Engine::builder(loopback().build().unwrap()).start().await;
        assert!(engine.take_time_sync().is_some());
        assert!(engine.take_time_sync().is_none());
        assert!(engine.take_render_queue().is_none());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn transports_report_bound_addresses() {
        let engine = Engine::builder(loopback().build().unwrap()).start().await;
        assert!(engine.transports().iter().all(TransportStatus::is_running));
        assert!(engine.udp_addr().is_some_and(|addr| addr.port() != 0));
        #[cfg(feature = "http")]
        assert!(engine.http_addr().is_some_and(|addr| addr.port() != 0));
        engine.shutdown().await;
    }
}
