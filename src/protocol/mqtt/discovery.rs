// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Home-automation autodiscovery descriptors.
//!
//! Every entity has a stable `unique_id` derived from the device identifier,
//! and descriptors are published retained, so republishing after a reconnect
//! replaces the existing entities instead of adding new ones.

use serde::Serialize;

use crate::event::DeviceId;
use crate::state::VERSION;
use crate::types::{AirIndex, LedIndex};

use super::topics::Topics;

/// Device block shared by every entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Identifiers grouping the entities under one device.
    pub identifiers: Vec<String>,
    /// Display name.
    pub name: String,
    /// Manufacturer.
    pub manufacturer: &'static str,
    /// Model.
    pub model: &'static str,
    /// Software version.
    pub sw_version: &'static str,
}

/// One entity descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityConfig {
    /// Entity name.
    pub name: String,
    /// Stable unique id.
    pub unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_press: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    /// Owning device.
    pub device: DeviceInfo,
}

/// A descriptor together with its config topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Entity component (`switch`, `sensor`, ...).
    pub component: &'static str,
    /// Topic `<prefix>/<component>/<unique_id>/config`.
    pub topic: String,
    /// The descriptor.
    pub config: EntityConfig,
}

impl Descriptor {
    /// Serializes the descriptor payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.config)
    }
}

/// Builds every descriptor for one device.
///
/// Produces eight switches (LEDs and timers), four duration sensors, reset
/// buttons for AIR3/AIR4, three text entities and the warning binary sensor.
#[must_use]
pub fn descriptors(prefix: &str, device_name: &str, id: &DeviceId) -> Vec<Descriptor> {
    let short = id.short_id();
    let topics = Topics::new(id.base_topic());
    let device = DeviceInfo {
        identifiers: vec![format!("onairscreen_{short}")],
        name: device_name.to_string(),
        manufacturer: "astrastudio",
        model: "OnAirScreen",
        sw_version: VERSION,
    };
    let entity = |name: String, unique_id: String| EntityConfig {
        name,
        unique_id,
        state_topic: None,
        command_topic: None,
        payload_on: None,
        payload_off: None,
        payload_press: None,
        unit_of_measurement: None,
        device_class: None,
        device: device.clone(),
    };
    let descriptor = |component: &'static str, config: EntityConfig| Descriptor {
        component,
        topic: format!("{prefix}/{component}/{}/config", config.unique_id),
        config,
    };

    let mut out = Vec::with_capacity(18);

    for led in LedIndex::all() {
        let n = led.value();
        out.push(descriptor(
            "switch",
            EntityConfig {
                state_topic: Some(topics.topic(&format!("led{n}/state"))),
                command_topic: Some(topics.topic(&format!("led{n}/set"))),
                payload_on: Some("ON"),
                payload_off: Some("OFF"),
                device_class: Some("switch"),
                ..entity(format!("LED{n}"), format!("onairscreen_led{n}_{short}"))
            },
        ));
    }

    for air in AirIndex::all() {
        let n = air.value();
        out.push(descriptor(
            "switch",
            EntityConfig {
                state_topic: Some(topics.topic(&format!("air{n}/state"))),
                command_topic: Some(topics.topic(&format!("air{n}/set"))),
                payload_on: Some("ON"),
                payload_off: Some("OFF"),
                device_class: Some("switch"),
                ..entity(format!("AIR{n}"), format!("onairscreen_air{n}_{short}"))
            },
        ));
        out.push(descriptor(
            "sensor",
            EntityConfig {
                state_topic: Some(topics.topic(&format!("air{n}/time"))),
                unit_of_measurement: Some("s"),
                device_class: Some("duration"),
                ..entity(
                    format!("AIR{n} Time"),
                    format!("onairscreen_air{n}_time_{short}"),
                )
            },
        ));
    }

    for air in [AirIndex::RADIO, AirIndex::STREAM] {
        let n = air.value();
        out.push(descriptor(
            "button",
            EntityConfig {
                command_topic: Some(topics.topic(&format!("air{n}/reset"))),
                payload_press: Some("PRESS"),
                ..entity(
                    format!("AIR{n} Reset"),
                    format!("onairscreen_air{n}_reset_{short}"),
                )
            },
        ));
    }

    for (field, label) in [("now", "Now"), ("next", "Next"), ("warn", "Warning")] {
        out.push(descriptor(
            "text",
            EntityConfig {
                state_topic: Some(topics.topic(&format!("text/{field}/state"))),
                command_topic: Some(topics.topic(&format!("text/{field}/set"))),
                ..entity(
                    format!("{label} Text"),
                    format!("onairscreen_text_{field}_{short}"),
                )
            },
        ));
    }

    out.push(descriptor(
        "binary_sensor",
        EntityConfig {
            state_topic: Some(topics.topic("warning/active")),
            payload_on: Some("true"),
            payload_off: Some("false"),
            device_class: Some("problem"),
            ..entity(
                "Warning Active".to_string(),
                format!("onairscreen_warning_active_{short}"),
            )
        },
    ));

    out
}
