// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use std::net::Ipv4Addr;

use chrono::Utc;

use crate::command::TextField;
use crate::settings::{ConfigKey, ConfigValue, SettingsMap};
use crate::types::{AirIndex, Color, LedIndex};

use super::{AirTimer, StateChange, WarningQueue};

/// Default UDP command port.
pub const DEFAULT_UDP_PORT: u16 = 3310;

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8010;

/// Default UDP multicast group.
pub const DEFAULT_MULTICAST: Ipv4Addr = Ipv4Addr::new(239, 194, 0, 1);

const DEFAULT_LED_TEXTS: [&str; 4] = ["ON AIR", "PHONE", "DOORBELL", "EAS ACTIVE"];
const DEFAULT_TIMER_LABELS: [&str; 4] = ["Mic", "Phone", "Timer", "Stream"];
const DEFAULT_TIMER_ICONS: [&str; 4] = [
    ":/mic_icon/images/mic_icon.png",
    ":/phone_icon/images/phone_icon.png",
    ":/timer_icon/images/timer_icon.png",
    ":/stream_icon/images/antenna2.png",
];

/// One of the four status LEDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedState {
    /// Lit or not.
    pub on: bool,
    /// Shown on the display at all.
    pub used: bool,
    /// Label.
    pub text: String,
    /// Background color while lit.
    pub active_bg_color: Color,
    /// Text color while lit.
    pub active_text_color: Color,
    /// Flash while lit.
    pub autoflash: bool,
    /// Flash for a limited time after switching on.
    pub timedflash: bool,
}

impl LedState {
    fn with_text(text: &str) -> Self {
        Self {
            on: false,
            used: true,
            text: text.to_string(),
            active_bg_color: Color::from_rgb_u32(0x00FF_0000),
            active_text_color: Color::from_rgb_u32(0x00FF_FFFF),
            autoflash: false,
            timedflash: false,
        }
    }
}

/// `General` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSettings {
    /// Station name.
    pub station_name: String,
    /// Slogan below the station name.
    pub slogan: String,
    /// Station name color.
    pub station_color: Color,
    /// Slogan color.
    pub slogan_color: Color,
    /// Show `replace_now_text` instead of NOW.
    pub replace_now: bool,
    /// Replacement NOW text.
    pub replace_now_text: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            station_name: "Radio Eriwan".to_string(),
            slogan: "Your question is our motivation".to_string(),
            station_color: Color::from_rgb_u32(0x00FF_AA00),
            slogan_color: Color::from_rgb_u32(0x00FF_AA00),
            replace_now: false,
            replace_now_text: String::new(),
        }
    }
}

/// `Clock` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSettings {
    /// Digital instead of analog clock.
    pub digital: bool,
    /// Show seconds.
    pub show_seconds: bool,
    /// Seconds on the same line as hours and minutes.
    pub seconds_in_one_line: bool,
    /// Colon does not blink.
    pub static_colon: bool,
    /// Hour digit color.
    pub hour_color: Color,
    /// Second digit color.
    pub second_color: Color,
    /// Digit segment color.
    pub digit_color: Color,
    /// Logo image path.
    pub logo_path: String,
    /// Logo above the clock.
    pub logo_upper: bool,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            digital: true,
            show_seconds: false,
            seconds_in_one_line: false,
            static_colon: false,
            hour_color: Color::from_rgb_u32(0x0032_32FF),
            second_color: Color::from_rgb_u32(0x00FF_9900),
            digit_color: Color::from_rgb_u32(0x0032_32FF),
            logo_path: ":/astrastudio_logo/images/astrastudio_transparent.png".to_string(),
            logo_upper: false,
        }
    }
}

/// `Network` section.
///
/// Changes are committed and persisted but only take effect when the
/// transports are started again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    /// UDP command port.
    pub udp_port: u16,
    /// HTTP port.
    pub http_port: u16,
    /// UDP multicast group.
    pub multicast_address: Ipv4Addr,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            http_port: DEFAULT_HTTP_PORT,
            multicast_address: DEFAULT_MULTICAST,
        }
    }
}

/// The complete state of the on-air display.
///
/// Only the State Owner mutates a `DeviceState`; everyone else sees
/// immutable snapshots. Every committed mutation increments
/// [`revision`](Self::revision).
///
/// # Examples
///
/// ```
/// use onair_core::command::TextField;
/// use onair_core::state::{DeviceState, StateChange};
///
/// let mut state = DeviceState::new();
/// assert_eq!(state.station().station_name, "Radio Eriwan");
///
/// state.apply(&StateChange::Text { field: TextField::Now, text: "Live".into() });
/// assert_eq!(state.text(TextField::Now), "Live");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    revision: u64,
    leds: [LedState; 4],
    timers: [AirTimer; 4],
    now: String,
    next: String,
    warnings: WarningQueue,
    general: GeneralSettings,
    clock: ClockSettings,
    network: NetworkSettings,
    timer_min_width: u64,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            revision: 0,
            leds: DEFAULT_LED_TEXTS.map(LedState::with_text),
            timers: AirIndex::all().map(|index| {
                let mut timer = AirTimer::new(index, DEFAULT_TIMER_LABELS[index.slot()]);
                timer.icon_path = DEFAULT_TIMER_ICONS[index.slot()].to_string();
                timer
            }),
            now: String::new(),
            next: String::new(),
            warnings: WarningQueue::new(),
            general: GeneralSettings::default(),
            clock: ClockSettings::default(),
            network: NetworkSettings::default(),
            timer_min_width: 200,
        }
    }
}

impl DeviceState {
    /// Creates a state with the product defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the revision counter.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    // ========== LEDs ==========

    /// Returns an LED.
    #[must_use]
    pub fn led(&self, index: LedIndex) -> &LedState {
        &self.leds[index.slot()]
    }

    /// Iterates over all LEDs with their index.
    pub fn leds(&self) -> impl Iterator<Item = (LedIndex, &LedState)> {
        LedIndex::all().into_iter().zip(self.leds.iter())
    }

    // ========== Timers ==========

    /// Returns a timer.
    #[must_use]
    pub fn timer(&self, index: AirIndex) -> &AirTimer {
        &self.timers[index.slot()]
    }

    /// Iterates over all timers.
    pub fn timers(&self) -> impl Iterator<Item = &AirTimer> {
        self.timers.iter()
    }

    /// Returns the tick change for the current running timers, if any run.
    #[must_use]
    pub fn tick(&self) -> Option<StateChange> {
        let advanced: Vec<_> = self
            .timers
            .iter()
            .filter_map(|t| t.next_tick().map(|elapsed| (t.index(), elapsed)))
            .collect();
        (!advanced.is_empty()).then_some(StateChange::Tick(advanced))
    }

    // ========== Texts and warnings ==========

    /// Returns NOW or NEXT.
    #[must_use]
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Now => &self.now,
            TextField::Next => &self.next,
        }
    }

    /// Returns the warning queue.
    #[must_use]
    pub const fn warnings(&self) -> &WarningQueue {
        &self.warnings
    }

    // ========== Settings ==========

    /// Returns the `General` settings.
    #[must_use]
    pub const fn station(&self) -> &GeneralSettings {
        &self.general
    }

    /// Returns the `Clock` settings.
    #[must_use]
    pub const fn clock(&self) -> &ClockSettings {
        &self.clock
    }

    /// Returns the `Network` settings.
    #[must_use]
    pub const fn network(&self) -> &NetworkSettings {
        &self.network
    }

    /// Returns `Timers.TimerAIRMinWidth`.
    #[must_use]
    pub const fn timer_min_width(&self) -> u64 {
        self.timer_min_width
    }

    /// Applies a state change.
    ///
    /// Returns `true` if the state actually changed. The revision counter is
    /// not touched; the State Owner bumps it for every change that applied.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Led { index, on } => assign(&mut self.leds[index.slot()].on, *on),
            StateChange::Timer {
                index,
                running,
                elapsed,
                ..
            } => self.timers[index.slot()].set(*running, *elapsed),
            StateChange::Tick(advanced) => {
                let mut changed = false;
                for (index, elapsed) in advanced {
                    let timer = &mut self.timers[index.slot()];
                    changed |= timer.set(timer.is_running(), *elapsed);
                }
                changed
            }
            StateChange::Text { field, text } => match field {
                TextField::Now => assign(&mut self.now, text.clone()),
                TextField::Next => assign(&mut self.next, text.clone()),
            },
            StateChange::Warning { priority, text } => match text {
                Some(text) => self.warnings.set(*priority, text, Utc::now()),
                None => self.warnings.clear(*priority),
            },
            StateChange::Settings(values) => values
                .iter()
                .fold(false, |changed, (key, value)| self.apply_setting(*key, value) | changed),
        }
    }

    /// Applies one validated configuration value. Returns `true` on change.
    ///
    /// A value whose variant does not match the key's kind is ignored.
    pub fn apply_setting(&mut self, key: ConfigKey, value: &ConfigValue) -> bool {
        use ConfigKey as K;
        use ConfigValue as V;

        match (key, value) {
            // General
            (K::StationName, V::Text(t)) => assign(&mut self.general.station_name, t.clone()),
            (K::Slogan, V::Text(t)) => assign(&mut self.general.slogan, t.clone()),
            (K::StationColor, V::Color(c)) => assign(&mut self.general.station_color, *c),
            (K::SloganColor, V::Color(c)) => assign(&mut self.general.slogan_color, *c),
            (K::ReplaceNow, V::Bool(b)) => assign(&mut self.general.replace_now, *b),
            (K::ReplaceNowText, V::Text(t)) => {
                assign(&mut self.general.replace_now_text, t.clone())
            }

            // LEDs
            (K::LedUsed(i), V::Bool(b)) => assign(&mut self.leds[i.slot()].used, *b),
            (K::LedText(i), V::Text(t)) => assign(&mut self.leds[i.slot()].text, t.clone()),
            (K::LedActiveBgColor(i), V::Color(c)) => {
                assign(&mut self.leds[i.slot()].active_bg_color, *c)
            }
            (K::LedActiveTextColor(i), V::Color(c)) => {
                assign(&mut self.leds[i.slot()].active_text_color, *c)
            }
            (K::LedAutoFlash(i), V::Bool(b)) => assign(&mut self.leds[i.slot()].autoflash, *b),
            (K::LedTimedFlash(i), V::Bool(b)) => assign(&mut self.leds[i.slot()].timedflash, *b),

            // Timers
            (K::TimerEnabled(i), V::Bool(b)) => assign(&mut self.timers[i.slot()].enabled, *b),
            (K::TimerText(i), V::Text(t)) => assign(&mut self.timers[i.slot()].label, t.clone()),
            (K::TimerActiveBgColor(i), V::Color(c)) => {
                assign(&mut self.timers[i.slot()].active_bg_color, *c)
            }
            (K::TimerActiveTextColor(i), V::Color(c)) => {
                assign(&mut self.timers[i.slot()].active_text_color, *c)
            }
            (K::TimerIconPath(i), V::Text(t)) => {
                assign(&mut self.timers[i.slot()].icon_path, t.clone())
            }
            (K::TimerMinWidth, V::Integer(n)) => assign(&mut self.timer_min_width, *n),

            // Clock
            (K::ClockDigital, V::Bool(b)) => assign(&mut self.clock.digital, *b),
            (K::ClockShowSeconds, V::Bool(b)) => assign(&mut self.clock.show_seconds, *b),
            (K::ClockSecondsInOneLine, V::Bool(b)) => {
                assign(&mut self.clock.seconds_in_one_line, *b)
            }
            (K::ClockStaticColon, V::Bool(b)) => assign(&mut self.clock.static_colon, *b),
            (K::ClockHourColor, V::Color(c)) => assign(&mut self.clock.hour_color, *c),
            (K::ClockSecondColor, V::Color(c)) => assign(&mut self.clock.second_color, *c),
            (K::ClockDigitColor, V::Color(c)) => assign(&mut self.clock.digit_color, *c),
            (K::ClockLogoPath, V::Text(t)) => assign(&mut self.clock.logo_path, t.clone()),
            (K::ClockLogoUpper, V::Bool(b)) => assign(&mut self.clock.logo_upper, *b),

            // Network
            (K::UdpPort, V::Port(p)) => assign(&mut self.network.udp_port, *p),
            (K::TcpPort, V::Port(p)) => assign(&mut self.network.http_port, *p),
            (K::MulticastAddress, V::Multicast(a)) => {
                assign(&mut self.network.multicast_address, *a)
            }

            (key, value) => {
                tracing::warn!(key = %key, value = %value, "Setting value does not match key kind");
                false
            }
        }
    }

    /// Seeds the state from stored settings.
    ///
    /// Each stored entry goes through the same schema and validation as a
    /// commit. Unknown keys and invalid values are logged and skipped, so the
    /// default stays in place. Returns the number of applied entries.
    pub fn seed_from(&mut self, stored: &SettingsMap) -> usize {
        let mut applied = 0;
        for (section, values) in stored {
            for (name, raw) in values {
                let Some(key) = ConfigKey::parse(section, name) else {
                    tracing::debug!(section = %section, key = %name, "Skipping unknown stored setting");
                    continue;
                };
                match key.validate(raw) {
                    Ok(value) => {
                        self.apply_setting(key, &value);
                        applied += 1;
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Invalid stored setting, keeping default");
                    }
                }
            }
        }
        applied
    }
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
