// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runs the on-air command engine until Ctrl-C.
//!
//! # Environment
//!
//! | Variable | Meaning |
//! |---|---|
//! | `RUST_LOG` | log filter (default `info`) |
//! | `ONAIR_SETTINGS` | settings file (default: platform config dir) |
//! | `ONAIR_MQTT_HOST` | enables MQTT with this broker |
//! | `ONAIR_MQTT_PORT` | broker port (default 1883) |
//! | `ONAIR_MQTT_USER`, `ONAIR_MQTT_PASSWORD` | broker credentials |

use std::env;
use std::sync::Arc;

use onair_core::engine::{Engine, EngineConfig};
use onair_core::settings::{JsonFileSettings, SettingsStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = match env::var("ONAIR_SETTINGS") {
        Ok(path) => Some(JsonFileSettings::new(path)),
        Err(_) => JsonFileSettings::default_location(),
    };

    #[cfg_attr(not(feature = "mqtt"), allow(unused_mut))]
    let mut config = EngineConfig::builder();
    #[cfg(feature = "mqtt")]
    if let Ok(host) = env::var("ONAIR_MQTT_HOST") {
        config = config.mqtt(mqtt_config(host)?);
    }
    let config = config.build()?;

    let mut builder = Engine::builder(config);
    match settings {
        Some(store) => {
            tracing::info!(path = %store.path().display(), "Using settings file");
            builder = builder.settings(Arc::new(store) as Arc<dyn SettingsStore>);
        }
        None => tracing::warn!("No config directory available, settings will not be kept"),
    }

    let engine = builder.start().await;
    if engine.transports().iter().all(|t| !t.is_running()) {
        engine.shutdown().await;
        return Err("no transport could be started".into());
    }

    tokio::signal::ctrl_c().await?;
    engine.shutdown().await;
    Ok(())
}

#[cfg(feature = "mqtt")]
fn mqtt_config(
    host: String,
) -> Result<onair_core::protocol::MqttConfig, Box<dyn std::error::Error>> {
    let mut builder = onair_core::protocol::MqttConfig::builder().host(host);
    if let Ok(port) = env::var("ONAIR_MQTT_PORT") {
        builder = builder.port(port.parse()?);
    }
    if let (Ok(user), Ok(password)) = (env::var("ONAIR_MQTT_USER"), env::var("ONAIR_MQTT_PASSWORD"))
    {
        builder = builder.credentials(user, password);
    }
    Ok(builder.build()?)
}
