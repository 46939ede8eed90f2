// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `OnAir` Core - the command engine of a broadcast-studio on-air display.
//!
//! The engine owns one logical device state (four LEDs, four AIR timers,
//! NOW/NEXT texts and a prioritized warning queue) and lets four network
//! transports change it concurrently through a compact line protocol:
//!
//! ```text
//! LED1:ON
//! AIR3:TOGGLE
//! AIR3TIME:120
//! NOW:Morning Show
//! WARN:2:Studio fire alarm
//! CONF:General:stationname=Radio Foo
//! CONF:CONF:APPLY=TRUE
//! ```
//!
//! # Architecture
//!
//! - [`command`]: parses lines into [`Command`] records
//! - [`validate`]: bounds checks and text sanitizing
//! - [`settings`]: CONF keys, the staging store and the persistence seam
//! - [`state`]: [`DeviceState`], the timer state machine and the warning queue
//! - [`dispatcher`]: the State Owner actor, the only writer of state
//! - [`event`]: change notifications and the event log
//! - [`protocol`]: UDP, HTTP/WebSocket and MQTT transports
//! - [`engine`]: startup wiring
//!
//! # Transports
//!
//! | Transport | Default | Feature |
//! |---|---|---|
//! | UDP datagrams (unicast and multicast `239.194.0.1`) | port 3310 | always |
//! | HTTP API, web UI and WebSocket push (`/ws`) | port 8010 | `http` |
//! | MQTT with home-automation autodiscovery | broker 1883 | `mqtt` |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use onair_core::engine::{Engine, EngineConfig};
//! use onair_core::event::CommandSource;
//! use onair_core::settings::JsonFileSettings;
//!
//! #[tokio::main]
//! async fn main() -> onair_core::Result<()> {
//!     let mut engine = Engine::builder(EngineConfig::builder().build()?)
//!         .settings(Arc::new(JsonFileSettings::new("settings.json")))
//!         .render_queue()
//!         .start()
//!         .await;
//!
//!     // The renderer consumes committed changes in order.
//!     let mut renders = engine.take_render_queue().expect("requested above");
//!     tokio::spawn(async move {
//!         while let Some(update) = renders.recv().await {
//!             println!("revision {}: {:?}", update.revision, update.change);
//!         }
//!     });
//!
//!     engine.dispatcher().execute("LED1:ON", CommandSource::Internal).await?;
//!     tokio::signal::ctrl_c().await.ok();
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Embedding without transports
//!
//! ```
//! use onair_core::dispatcher::Dispatcher;
//! use onair_core::event::CommandSource;
//! use onair_core::state::DeviceState;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> onair_core::Result<()> {
//! let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
//! let dispatcher = handles.dispatcher;
//!
//! let report = dispatcher
//!     .submit("NOW:News\nWARN:1:Traffic\nBOGUS", CommandSource::Internal)
//!     .await?;
//! assert_eq!(report.failures().count(), 1);
//! assert_eq!(dispatcher.status().texts.warn, "Traffic");
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod event;
pub mod protocol;
pub mod settings;
pub mod state;
pub mod types;
pub mod validate;

pub use command::{Command, SystemRequest, TextField, parse_line};
pub use dispatcher::{Dispatcher, Outcome, PacketReport, RenderQueue, RenderUpdate};
pub use engine::{Engine, EngineConfig, TransportStatus};
pub use error::{
    CommitError, CommitFailure, Error, ErrorKind, ParseError, Result, TransportError,
    ValidationError,
};
pub use event::{CommandSource, DeviceEvent, DeviceId};
pub use settings::{ConfigKey, ConfigValue, SettingsStore};
pub use state::{DeviceState, StateChange, StatusReport};
pub use types::{AirIndex, Color, LedIndex, SwitchAction, TimerEvent, WarningPriority};
