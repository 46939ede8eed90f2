// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CONF key schema.
//!
//! Every `(section, key)` pair the engine understands maps to exactly one
//! [`ConfigKey`], and every key declares the [`ValueKind`] its value must
//! satisfy. Section and key names are matched exactly.

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::ValidationError;
use crate::types::{AirIndex, Color, LedIndex};
use crate::validate::{self, CONF_MAX_LEN};

/// Upper bound of `Timers.TimerAIRMinWidth`.
pub const TIMER_MIN_WIDTH_MAX: u64 = 10_000;

/// A recognized configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    // ========== General ==========
    /// `General.stationname`
    StationName,
    /// `General.slogan`
    Slogan,
    /// `General.stationcolor`
    StationColor,
    /// `General.slogancolor`
    SloganColor,
    /// `General.replacenow`
    ReplaceNow,
    /// `General.replacenowtext`
    ReplaceNowText,

    // ========== LED1-LED4 ==========
    /// `LEDn.used`
    LedUsed(LedIndex),
    /// `LEDn.text`
    LedText(LedIndex),
    /// `LEDn.activebgcolor`
    LedActiveBgColor(LedIndex),
    /// `LEDn.activetextcolor`
    LedActiveTextColor(LedIndex),
    /// `LEDn.autoflash`
    LedAutoFlash(LedIndex),
    /// `LEDn.timedflash`
    LedTimedFlash(LedIndex),

    // ========== Timers ==========
    /// `Timers.TimerAIRnEnabled`
    TimerEnabled(AirIndex),
    /// `Timers.TimerAIRnText`
    TimerText(AirIndex),
    /// `Timers.AIRnactivebgcolor`
    TimerActiveBgColor(AirIndex),
    /// `Timers.AIRnactivetextcolor`
    TimerActiveTextColor(AirIndex),
    /// `Timers.AIRniconpath`
    TimerIconPath(AirIndex),
    /// `Timers.TimerAIRMinWidth`
    TimerMinWidth,

    // ========== Clock ==========
    /// `Clock.digital`
    ClockDigital,
    /// `Clock.showseconds`
    ClockShowSeconds,
    /// `Clock.secondsinoneline`
    ClockSecondsInOneLine,
    /// `Clock.staticcolon`
    ClockStaticColon,
    /// `Clock.digitalhourcolor`
    ClockHourColor,
    /// `Clock.digitalsecondcolor`
    ClockSecondColor,
    /// `Clock.digitaldigitcolor`
    ClockDigitColor,
    /// `Clock.logopath`
    ClockLogoPath,
    /// `Clock.logoupper`
    ClockLogoUpper,

    // ========== Network ==========
    /// `Network.udpport`
    UdpPort,
    /// `Network.tcpport`
    TcpPort,
    /// `Network.multicast_address`
    MulticastAddress,
}

/// The value grammar a key accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Sanitized free text.
    Text,
    /// `True` or `False`.
    Bool,
    /// `#RRGGBB` or `0xRRGGBB`.
    Color,
    /// Non-negative integer within bounds.
    Integer {
        /// Inclusive minimum.
        min: u64,
        /// Inclusive maximum.
        max: u64,
    },
    /// Port number 1-65535.
    Port,
    /// IPv4 multicast group.
    Multicast,
}

/// A validated configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// Free text.
    Text(String),
    /// Boolean flag.
    Bool(bool),
    /// Normalized color.
    Color(Color),
    /// Bounded integer.
    Integer(u64),
    /// Port number.
    Port(u16),
    /// Multicast group.
    Multicast(Ipv4Addr),
}

impl fmt::Display for ConfigValue {
    /// Formats the value in the form accepted back by [`ConfigKey::validate`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Color(color) => write!(f, "{color}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Port(port) => write!(f, "{port}"),
            Self::Multicast(addr) => write!(f, "{addr}"),
        }
    }
}

impl ConfigKey {
    /// Looks up a `(section, key)` pair. Returns `None` for unknown pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use onair_core::settings::ConfigKey;
    ///
    /// assert_eq!(ConfigKey::parse("General", "stationname"), Some(ConfigKey::StationName));
    /// assert_eq!(ConfigKey::parse("General", "StationName"), None);
    /// ```
    #[must_use]
    pub fn parse(section: &str, key: &str) -> Option<Self> {
        match section {
            "General" => match key {
                "stationname" => Some(Self::StationName),
                "slogan" => Some(Self::Slogan),
                "stationcolor" => Some(Self::StationColor),
                "slogancolor" => Some(Self::SloganColor),
                "replacenow" => Some(Self::ReplaceNow),
                "replacenowtext" => Some(Self::ReplaceNowText),
                _ => None,
            },
            "Timers" => parse_timer_key(key),
            "Clock" => match key {
                "digital" => Some(Self::ClockDigital),
                "showseconds" => Some(Self::ClockShowSeconds),
                "secondsinoneline" => Some(Self::ClockSecondsInOneLine),
                "staticcolon" => Some(Self::ClockStaticColon),
                "digitalhourcolor" => Some(Self::ClockHourColor),
                "digitalsecondcolor" => Some(Self::ClockSecondColor),
                "digitaldigitcolor" => Some(Self::ClockDigitColor),
                "logopath" => Some(Self::ClockLogoPath),
                "logoupper" => Some(Self::ClockLogoUpper),
                _ => None,
            },
            "Network" => match key {
                "udpport" => Some(Self::UdpPort),
                "tcpport" => Some(Self::TcpPort),
                "multicast_address" => Some(Self::MulticastAddress),
                _ => None,
            },
            _ => {
                let led = single_digit(section.strip_prefix("LED")?)
                    .and_then(|n| LedIndex::new(n).ok())?;
                match key {
                    "used" => Some(Self::LedUsed(led)),
                    "text" => Some(Self::LedText(led)),
                    "activebgcolor" => Some(Self::LedActiveBgColor(led)),
                    "activetextcolor" => Some(Self::LedActiveTextColor(led)),
                    "autoflash" => Some(Self::LedAutoFlash(led)),
                    "timedflash" => Some(Self::LedTimedFlash(led)),
                    _ => None,
                }
            }
        }
    }

    /// Returns the section name.
    #[must_use]
    pub fn section(&self) -> String {
        match self {
            Self::StationName
            | Self::Slogan
            | Self::StationColor
            | Self::SloganColor
            | Self::ReplaceNow
            | Self::ReplaceNowText => "General".to_string(),
            Self::LedUsed(led)
            | Self::LedText(led)
            | Self::LedActiveBgColor(led)
            | Self::LedActiveTextColor(led)
            | Self::LedAutoFlash(led)
            | Self::LedTimedFlash(led) => led.to_string(),
            Self::TimerEnabled(_)
            | Self::TimerText(_)
            | Self::TimerActiveBgColor(_)
            | Self::TimerActiveTextColor(_)
            | Self::TimerIconPath(_)
            | Self::TimerMinWidth => "Timers".to_string(),
            Self::ClockDigital
            | Self::ClockShowSeconds
            | Self::ClockSecondsInOneLine
            | Self::ClockStaticColon
            | Self::ClockHourColor
            | Self::ClockSecondColor
            | Self::ClockDigitColor
            | Self::ClockLogoPath
            | Self::ClockLogoUpper => "Clock".to_string(),
            Self::UdpPort | Self::TcpPort | Self::MulticastAddress => "Network".to_string(),
        }
    }

    /// Returns the key name within its section.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::StationName => "stationname".to_string(),
            Self::Slogan => "slogan".to_string(),
            Self::StationColor => "stationcolor".to_string(),
            Self::SloganColor => "slogancolor".to_string(),
            Self::ReplaceNow => "replacenow".to_string(),
            Self::ReplaceNowText => "replacenowtext".to_string(),
            Self::LedUsed(_) => "used".to_string(),
            Self::LedText(_) => "text".to_string(),
            Self::LedActiveBgColor(_) => "activebgcolor".to_string(),
            Self::LedActiveTextColor(_) => "activetextcolor".to_string(),
            Self::LedAutoFlash(_) => "autoflash".to_string(),
            Self::LedTimedFlash(_) => "timedflash".to_string(),
            Self::TimerEnabled(air) => format!("TimerAIR{}Enabled", air.value()),
            Self::TimerText(air) => format!("TimerAIR{}Text", air.value()),
            Self::TimerActiveBgColor(air) => format!("AIR{}activebgcolor", air.value()),
            Self::TimerActiveTextColor(air) => format!("AIR{}activetextcolor", air.value()),
            Self::TimerIconPath(air) => format!("AIR{}iconpath", air.value()),
            Self::TimerMinWidth => "TimerAIRMinWidth".to_string(),
            Self::ClockDigital => "digital".to_string(),
            Self::ClockShowSeconds => "showseconds".to_string(),
            Self::ClockSecondsInOneLine => "secondsinoneline".to_string(),
            Self::ClockStaticColon => "staticcolon".to_string(),
            Self::ClockHourColor => "digitalhourcolor".to_string(),
            Self::ClockSecondColor => "digitalsecondcolor".to_string(),
            Self::ClockDigitColor => "digitaldigitcolor".to_string(),
            Self::ClockLogoPath => "logopath".to_string(),
            Self::ClockLogoUpper => "logoupper".to_string(),
            Self::UdpPort => "udpport".to_string(),
            Self::TcpPort => "tcpport".to_string(),
            Self::MulticastAddress => "multicast_address".to_string(),
        }
    }

    /// Returns the value grammar for this key.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::StationName
            | Self::Slogan
            | Self::ReplaceNowText
            | Self::LedText(_)
            | Self::TimerText(_)
            | Self::TimerIconPath(_)
            | Self::ClockLogoPath => ValueKind::Text,
            Self::ReplaceNow
            | Self::LedUsed(_)
            | Self::LedAutoFlash(_)
            | Self::LedTimedFlash(_)
            | Self::TimerEnabled(_)
            | Self::ClockDigital
            | Self::ClockShowSeconds
            | Self::ClockSecondsInOneLine
            | Self::ClockStaticColon
            | Self::ClockLogoUpper => ValueKind::Bool,
            Self::StationColor
            | Self::SloganColor
            | Self::LedActiveBgColor(_)
            | Self::LedActiveTextColor(_)
            | Self::TimerActiveBgColor(_)
            | Self::TimerActiveTextColor(_)
            | Self::ClockHourColor
            | Self::ClockSecondColor
            | Self::ClockDigitColor => ValueKind::Color,
            Self::TimerMinWidth => ValueKind::Integer {
                min: 0,
                max: TIMER_MIN_WIDTH_MAX,
            },
            Self::UdpPort | Self::TcpPort => ValueKind::Port,
            Self::MulticastAddress => ValueKind::Multicast,
        }
    }

    /// Validates a raw value against this key's grammar.
    ///
    /// # Errors
    ///
    /// Returns the `ValidationError` describing why `raw` does not fit.
    pub fn validate(&self, raw: &str) -> Result<ConfigValue, ValidationError> {
        let field = self.to_string();
        match self.kind() {
            ValueKind::Text => {
                validate::sanitize_text(&field, raw, CONF_MAX_LEN).map(ConfigValue::Text)
            }
            ValueKind::Bool => validate::parse_bool(&field, raw).map(ConfigValue::Bool),
            ValueKind::Color => Color::parse(raw).map(ConfigValue::Color),
            ValueKind::Integer { min, max } => {
                validate::parse_bounded(&field, raw, min, max).map(ConfigValue::Integer)
            }
            ValueKind::Port => validate::parse_port(&field, raw).map(ConfigValue::Port),
            ValueKind::Multicast => validate::parse_multicast(raw).map(ConfigValue::Multicast),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key())
    }
}

fn single_digit(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [d @ b'1'..=b'9'] => Some(d - b'0'),
        _ => None,
    }
}

fn parse_timer_key(key: &str) -> Option<ConfigKey> {
    if key == "TimerAIRMinWidth" {
        return Some(ConfigKey::TimerMinWidth);
    }

    let air = |digits: &str| single_digit(digits).and_then(|n| AirIndex::new(n).ok());

    if let Some(rest) = key.strip_prefix("TimerAIR") {
        if let Some(n) = rest.strip_suffix("Enabled") {
            return air(n).map(ConfigKey::TimerEnabled);
        }
        if let Some(n) = rest.strip_suffix("Text") {
            return air(n).map(ConfigKey::TimerText);
        }
        return None;
    }

    let rest = key.strip_prefix("AIR")?;
    if let Some(n) = rest.strip_suffix("activebgcolor") {
        return air(n).map(ConfigKey::TimerActiveBgColor);
    }
    if let Some(n) = rest.strip_suffix("activetextcolor") {
        return air(n).map(ConfigKey::TimerActiveTextColor);
    }
    if let Some(n) = rest.strip_suffix("iconpath") {
        return air(n).map(ConfigKey::TimerIconPath);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led(n: u8) -> LedIndex {
        LedIndex::new(n).unwrap()
    }

    fn air(n: u8) -> AirIndex {
        AirIndex::new(n).unwrap()
    }

    #[test]
    fn parses_every_section() {
        assert_eq!(ConfigKey::parse("General", "slogan"), Some(ConfigKey::Slogan));
        assert_eq!(ConfigKey::parse("LED3", "autoflash"), Some(ConfigKey::LedAutoFlash(led(3))));
        assert_eq!(
            ConfigKey::parse("Timers", "TimerAIR2Text"),
            Some(ConfigKey::TimerText(air(2)))
        );
        assert_eq!(
            ConfigKey::parse("Timers", "AIR4iconpath"),
            Some(ConfigKey::TimerIconPath(air(4)))
        );
        assert_eq!(
            ConfigKey::parse("Timers", "TimerAIRMinWidth"),
            Some(ConfigKey::TimerMinWidth)
        );
        assert_eq!(ConfigKey::parse("Clock", "logoupper"), Some(ConfigKey::ClockLogoUpper));
        assert_eq!(
            ConfigKey::parse("Network", "multicast_address"),
            Some(ConfigKey::MulticastAddress)
        );
    }

    #[test]
    fn rejects_unknown_pairs() {
        assert_eq!(ConfigKey::parse("LED5", "used"), None);
        assert_eq!(ConfigKey::parse("LED0", "used"), None);
        assert_eq!(ConfigKey::parse("LED12", "used"), None);
        assert_eq!(ConfigKey::parse("Timers", "AIR5iconpath"), None);
        assert_eq!(ConfigKey::parse("Timers", "AIRiconpath"), None);
        assert_eq!(ConfigKey::parse("Weather", "city"), None);
        assert_eq!(ConfigKey::parse("general", "stationname"), None);
    }

    #[test]
    fn names_round_trip_through_parse() {
        let keys = [
            ConfigKey::StationName,
            ConfigKey::LedActiveTextColor(led(1)),
            ConfigKey::TimerEnabled(air(3)),
            ConfigKey::TimerActiveBgColor(air(2)),
            ConfigKey::ClockSecondColor,
            ConfigKey::TcpPort,
        ];
        for key in keys {
            assert_eq!(ConfigKey::parse(&key.section(), &key.key()), Some(key));
        }
    }

    #[test]
    fn validates_by_kind() {
        assert_eq!(
            ConfigKey::StationColor.validate("0xff0000").unwrap(),
            ConfigValue::Color(Color::new(255, 0, 0))
        );
        assert_eq!(
            ConfigKey::LedUsed(led(1)).validate("False").unwrap(),
            ConfigValue::Bool(false)
        );
        assert_eq!(ConfigKey::UdpPort.validate("3311").unwrap(), ConfigValue::Port(3311));
        assert!(ConfigKey::UdpPort.validate("notanumber").is_err());
        assert!(ConfigKey::TimerMinWidth.validate("10001").is_err());
        assert!(ConfigKey::MulticastAddress.validate("10.0.0.1").is_err());
        assert!(ConfigKey::StationName.validate("<script>").is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(ConfigKey::LedText(led(2)).to_string(), "LED2.text");
        assert_eq!(ConfigValue::Bool(true).to_string(), "True");
        assert_eq!(ConfigValue::Color(Color::new(0x32, 0x32, 0xFF)).to_string(), "#3232FF");
    }
}
