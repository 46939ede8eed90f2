// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status document served by the HTTP API and pushed over WebSocket.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::command::TextField;
use crate::types::WarningPriority;

use super::DeviceState;

/// Engine version reported in the status document.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Distribution name reported in the status document.
pub const DISTRIBUTION: &str = "OnAirScreen";

/// LED entry of the status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedStatus {
    /// Lit.
    pub status: bool,
    /// Shown on the display.
    pub used: bool,
    /// Label.
    pub text: String,
}

/// Timer entry of the status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirStatus {
    /// Running.
    pub status: bool,
    /// Elapsed seconds.
    pub seconds: u64,
    /// Label.
    pub text: String,
}

/// Text fields of the status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextStatus {
    /// NOW text.
    pub now: String,
    /// NEXT text.
    pub next: String,
    /// The currently displayed warning, or empty.
    pub warn: String,
}

/// Warning entry of the status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningStatus {
    /// Level -1..=2.
    pub priority: WarningPriority,
    /// Warning text.
    pub text: String,
    /// When the warning was set.
    pub created_at: DateTime<Utc>,
}

/// Full status document.
///
/// ```json
/// {"revision": 3,
///  "leds": {"1": {"status": true, "used": true, "text": "ON AIR"}, ...},
///  "air": {"1": {"status": false, "seconds": 0, "text": "Mic"}, ...},
///  "texts": {"now": "", "next": "", "warn": ""},
///  "warnings": [],
///  "version": "0.1.0", "distribution": "OnAirScreen"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// State revision.
    pub revision: u64,
    /// LEDs keyed `"1"`..`"4"`.
    pub leds: BTreeMap<String, LedStatus>,
    /// Timers keyed `"1"`..`"4"`.
    pub air: BTreeMap<String, AirStatus>,
    /// Text fields.
    pub texts: TextStatus,
    /// All set warnings, lowest priority first.
    pub warnings: Vec<WarningStatus>,
    /// Engine version.
    pub version: String,
    /// Distribution name.
    pub distribution: String,
}

impl From<&DeviceState> for StatusReport {
    fn from(state: &DeviceState) -> Self {
        let leds = state
            .leds()
            .map(|(index, led)| {
                (
                    index.value().to_string(),
                    LedStatus {
                        status: led.on,
                        used: led.used,
                        text: led.text.clone(),
                    },
                )
            })
            .collect();

        let air = state
            .timers()
            .map(|timer| {
                (
                    timer.index().value().to_string(),
                    AirStatus {
                        status: timer.is_running(),
                        seconds: timer.elapsed(),
                        text: timer.label().to_string(),
                    },
                )
            })
            .collect();

        let warnings = state
            .warnings()
            .iter()
            .map(|entry| WarningStatus {
                priority: entry.priority,
                text: entry.text.clone(),
                created_at: entry.created_at,
            })
            .collect();

        Self {
            revision: state.revision(),
            leds,
            air,
            texts: TextStatus {
                now: state.text(TextField::Now).to_string(),
                next: state.text(TextField::Next).to_string(),
                warn: state
                    .warnings()
                    .current()
                    .map(|w| w.text.clone())
                    .unwrap_or_default(),
            },
            warnings,
            version: VERSION.to_string(),
            distribution: DISTRIBUTION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateChange;
    use crate::types::LedIndex;

    #[test]
    fn serializes_expected_shape() {
        let mut state = DeviceState::new();
        state.apply(&StateChange::Led {
            index: LedIndex::new(1).unwrap(),
            on: true,
        });
        state.apply(&StateChange::Warning {
            priority: WarningPriority::High,
            text: Some("Fire".into()),
        });

        let json = serde_json::to_value(StatusReport::from(&state)).unwrap();
        assert_eq!(json["leds"]["1"]["status"], true);
        assert_eq!(json["leds"]["1"]["text"], "ON AIR");
        assert_eq!(json["air"]["4"]["text"], "Stream");
        assert_eq!(json["air"]["4"]["seconds"], 0);
        assert_eq!(json["texts"]["warn"], "Fire");
        assert_eq!(json["warnings"][0]["priority"], 2);
        assert!(json["warnings"][0]["created_at"].is_string());
        assert_eq!(json["distribution"], "OnAirScreen");
        assert_eq!(json["revision"], 0);
    }
}
