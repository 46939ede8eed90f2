// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic layout under the device base topic.
//!
//! Inbound `set`/`reset`/`command` topics are translated into command lines;
//! committed changes are turned into retained state publications.

use crate::command::TextField;
use crate::state::{DeviceState, StateChange};
use crate::types::{AirIndex, LedIndex};

/// A retained state publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Full topic.
    pub topic: String,
    /// Payload.
    pub payload: String,
}

/// Topic names for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    /// Creates the layout for `base` (e.g. `onairscreen_a1b2c3`).
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base topic.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns `<base>/<suffix>`.
    #[must_use]
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.base)
    }

    /// Returns every topic filter the client subscribes to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let mut topics = Vec::with_capacity(14);
        for led in LedIndex::all() {
            topics.push(self.topic(&format!("led{}/set", led.value())));
        }
        for air in AirIndex::all() {
            topics.push(self.topic(&format!("air{}/set", air.value())));
        }
        for air in [AirIndex::RADIO, AirIndex::STREAM] {
            topics.push(self.topic(&format!("air{}/reset", air.value())));
        }
        for field in ["now", "next", "warn"] {
            topics.push(self.topic(&format!("text/{field}/set")));
        }
        topics.push(self.topic("command/+"));
        topics
    }

    /// Translates an inbound message into a command line.
    ///
    /// Returns `None` for topics outside this device and for reset presses on
    /// timers without a reset capability.
    #[must_use]
    pub fn translate(&self, topic: &str, payload: &str) -> Option<String> {
        let rest = topic.strip_prefix(&self.base)?.strip_prefix('/')?;
        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            ["command", verb] if !verb.is_empty() => Some(format!("{verb}:{payload}")),
            [target, "set"] if target.starts_with("led") => {
                Some(format!("LED{}:{}", &target[3..], payload.trim().to_uppercase()))
            }
            [target, "set"] if target.starts_with("air") => {
                Some(format!("AIR{}:{}", &target[3..], payload.trim().to_uppercase()))
            }
            [target, "reset"] if target.starts_with("air") => match &target[3..] {
                n @ ("3" | "4") => Some(format!("AIR{n}:RESET")),
                n => {
                    tracing::warn!(topic = %topic, "Reset is only available for AIR3 and AIR4, ignoring AIR{n}");
                    None
                }
            },
            ["text", "now", "set"] => Some(format!("NOW:{payload}")),
            ["text", "next", "set"] => Some(format!("NEXT:{payload}")),
            ["text", "warn", "set"] => Some(format!("WARN:{payload}")),
            _ => None,
        }
    }

    /// Returns the publications describing the complete state.
    #[must_use]
    pub fn full_state(&self, state: &DeviceState) -> Vec<Publication> {
        let mut out = Vec::with_capacity(16);
        for (index, _) in state.leds() {
            self.push_led(&mut out, state, index);
        }
        for timer in state.timers() {
            self.push_timer(&mut out, state, timer.index());
        }
        self.push_text(&mut out, state, TextField::Now);
        self.push_text(&mut out, state, TextField::Next);
        self.push_warning(&mut out, state);
        out
    }

    /// Returns the publications for the fields touched by `change`.
    ///
    /// `state` is the snapshot after the change.
    #[must_use]
    pub fn changed(&self, change: &StateChange, state: &DeviceState) -> Vec<Publication> {
        let mut out = Vec::new();
        match change {
            StateChange::Led { index, .. } => self.push_led(&mut out, state, *index),
            StateChange::Timer { index, .. } => self.push_timer(&mut out, state, *index),
            StateChange::Tick(advanced) => {
                for (index, elapsed) in advanced {
                    out.push(self.time(*index, *elapsed));
                }
            }
            StateChange::Text { field, .. } => self.push_text(&mut out, state, *field),
            StateChange::Warning { .. } => self.push_warning(&mut out, state),
            // Display settings have no published topics.
            StateChange::Settings(_) => {}
        }
        out
    }

    fn publication(&self, suffix: &str, payload: impl Into<String>) -> Publication {
        Publication {
            topic: self.topic(suffix),
            payload: payload.into(),
        }
    }

    fn push_led(&self, out: &mut Vec<Publication>, state: &DeviceState, index: LedIndex) {
        out.push(self.publication(
            &format!("led{}/state", index.value()),
            on_off(state.led(index).on),
        ));
    }

    fn push_timer(&self, out: &mut Vec<Publication>, state: &DeviceState, index: AirIndex) {
        let timer = state.timer(index);
        out.push(self.publication(
            &format!("air{}/state", index.value()),
            on_off(timer.is_running()),
        ));
        out.push(self.time(index, timer.elapsed()));
    }

    fn time(&self, index: AirIndex, elapsed: u64) -> Publication {
        self.publication(&format!("air{}/time", index.value()), elapsed.to_string())
    }

    fn push_text(&self, out: &mut Vec<Publication>, state: &DeviceState, field: TextField) {
        let name = match field {
            TextField::Now => "now",
            TextField::Next => "next",
        };
        out.push(self.publication(&format!("text/{name}/state"), state.text(field)));
    }

    fn push_warning(&self, out: &mut Vec<Publication>, state: &DeviceState) {
        let current = state.warnings().current();
        out.push(self.publication(
            "text/warn/state",
            current.map(|entry| entry.text.as_str()).unwrap_or_default(),
        ));
        out.push(self.publication(
            "warning/active",
            if current.is_some() { "true" } else { "false" },
        ));
    }
}

const fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TimerChangeKind;
    use crate::types::WarningPriority;

    fn topics() -> Topics {
        Topics::new("onairscreen_abc123")
    }

    #[test]
    fn subscriptions_cover_every_input() {
        let subs = topics().subscriptions();
        assert_eq!(subs.len(), 14);
        assert!(subs.contains(&"onairscreen_abc123/led4/set".to_string()));
        assert!(subs.contains(&"onairscreen_abc123/air3/reset".to_string()));
        assert!(!subs.contains(&"onairscreen_abc123/air1/reset".to_string()));
        assert!(subs.contains(&"onairscreen_abc123/command/+".to_string()));
    }

    #[test]
    fn set_payloads_are_uppercased() {
        let t = topics();
        assert_eq!(
            t.translate("onairscreen_abc123/led2/set", "on"),
            Some("LED2:ON".to_string())
        );
        assert_eq!(
            t.translate("onairscreen_abc123/air1/set", " toggle "),
            Some("AIR1:TOGGLE".to_string())
        );
    }

    #[test]
    fn reset_only_for_resettable_timers() {
        let t = topics();
        assert_eq!(
            t.translate("onairscreen_abc123/air4/reset", "PRESS"),
            Some("AIR4:RESET".to_string())
        );
        assert_eq!(t.translate("onairscreen_abc123/air2/reset", "PRESS"), None);
    }

    #[test]
    fn text_payloads_are_kept_verbatim() {
        let t = topics();
        assert_eq!(
            t.translate("onairscreen_abc123/text/now/set", "News: at ten"),
            Some("NOW:News: at ten".to_string())
        );
        assert_eq!(
            t.translate("onairscreen_abc123/text/warn/set", "2:Fire"),
            Some("WARN:2:Fire".to_string())
        );
    }

    #[test]
    fn command_topic_carries_verb() {
        assert_eq!(
            topics().translate("onairscreen_abc123/command/AIR3TIME", "120"),
            Some("AIR3TIME:120".to_string())
        );
    }

    #[test]
    fn foreign_topics_are_ignored() {
        let t = topics();
        assert_eq!(t.translate("onairscreen_zzz999/led1/set", "ON"), None);
        assert_eq!(t.translate("onairscreen_abc123led1/set", "ON"), None);
        assert_eq!(t.translate("onairscreen_abc123/led1/state", "ON"), None);
    }

    #[test]
    fn full_state_publishes_every_field() {
        let pubs = topics().full_state(&DeviceState::new());
        // 4 LEDs, 4 timers x (state + time), now, next, warn, warning/active
        assert_eq!(pubs.len(), 16);
        let active = pubs
            .iter()
            .find(|p| p.topic.ends_with("warning/active"))
            .unwrap();
        assert_eq!(active.payload, "false");
    }

    #[test]
    fn tick_publishes_only_times() {
        let mut state = DeviceState::new();
        let air = AirIndex::new(1).unwrap();
        state.apply(&StateChange::Timer {
            index: air,
            running: true,
            elapsed: 0,
            kind: TimerChangeKind::Started,
        });
        let tick = state.tick().unwrap();
        state.apply(&tick);

        let pubs = topics().changed(&tick, &state);
        assert_eq!(
            pubs,
            vec![Publication {
                topic: "onairscreen_abc123/air1/time".into(),
                payload: "1".into(),
            }]
        );
    }

    #[test]
    fn warning_change_publishes_arbitrated_text() {
        let mut state = DeviceState::new();
        let change = StateChange::Warning {
            priority: WarningPriority::High,
            text: Some("Fire".into()),
        };
        state.apply(&change);

        let pubs = topics().changed(&change, &state);
        assert_eq!(pubs[0].payload, "Fire");
        assert_eq!(pubs[1].payload, "true");
    }
}
