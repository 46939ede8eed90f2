// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line parser.

use crate::error::{Error, ParseError, ValidationError};
use crate::settings::ConfigKey;
use crate::types::{AirIndex, LedIndex, SwitchAction, TimerEvent, WarningPriority};
use crate::validate::{self, CONF_MAX_LEN, TEXT_MAX_LEN};

use super::{AIR_TIME_MAX_SECONDS, Command, SystemRequest, TextField};

/// Splits a transport payload into command lines.
///
/// Lines are separated by `\n`; a trailing `\r` is dropped and blank lines
/// are skipped.
///
/// # Examples
///
/// ```
/// use onair_core::command::split_lines;
///
/// let lines: Vec<_> = split_lines("LED1:ON\r\n\nLED2:ON\n").collect();
/// assert_eq!(lines, ["LED1:ON", "LED2:ON"]);
/// ```
pub fn split_lines(payload: &str) -> impl Iterator<Item = &str> {
    payload
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

/// Decodes a raw transport payload.
///
/// # Errors
///
/// Returns [`ParseError::InvalidEncoding`] if `bytes` is not UTF-8.
pub fn decode_payload(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding)
}

/// Parses and validates a single command line.
///
/// # Errors
///
/// - [`Error::Parse`] for lines without a `:`, malformed target indices or a
///   malformed `CONF` argument
/// - [`Error::UnknownCommand`] for unknown verbs, CONF keys and CMD requests
/// - [`Error::Validation`] for values that fail validation
pub fn parse_line(line: &str) -> Result<Command, Error> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Err(ParseError::Empty.into());
    }

    let (verb, argument) = line
        .split_once(':')
        .ok_or_else(|| ParseError::MissingSeparator(line.to_string()))?;

    match verb {
        "NOW" => parse_text(TextField::Now, argument),
        "NEXT" => parse_text(TextField::Next, argument),
        "WARN" => parse_warn(argument),
        "AIR3TIME" => {
            let seconds =
                validate::parse_bounded("AIR3TIME", token(argument), 0, AIR_TIME_MAX_SECONDS)?;
            Ok(Command::AirTime { seconds })
        }
        "CONF" => parse_conf(argument),
        "CMD" => parse_system(argument),
        _ => parse_indexed(verb, argument),
    }
}

/// Enumerated tokens and numbers tolerate surrounding whitespace, nothing else.
fn token(argument: &str) -> &str {
    argument.trim()
}

fn parse_text(field: TextField, argument: &str) -> Result<Command, Error> {
    let text = validate::sanitize_text(field.verb(), argument, TEXT_MAX_LEN)?;
    Ok(Command::Text { field, text })
}

fn parse_warn(argument: &str) -> Result<Command, Error> {
    if let Some((head, rest)) = argument.split_once(':')
        && looks_like_priority(head)
    {
        let priority: WarningPriority = head.parse()?;
        let text = validate::sanitize_text("WARN", rest, TEXT_MAX_LEN)?;
        return Ok(Command::Warn { priority, text });
    }

    let text = validate::sanitize_text("WARN", argument, TEXT_MAX_LEN)?;
    Ok(Command::Warn {
        priority: WarningPriority::Normal,
        text,
    })
}

/// A single digit, optionally signed, in front of a second colon is read as a
/// priority. Anything longer ("12:30 meeting") is plain warning text.
fn looks_like_priority(head: &str) -> bool {
    let digits = head.strip_prefix('-').unwrap_or(head);
    digits.len() == 1 && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_conf(argument: &str) -> Result<Command, Error> {
    let malformed = || ParseError::MalformedConf(argument.to_string());

    let (section, assignment) = argument.split_once(':').ok_or_else(malformed)?;
    let (key, value) = assignment.split_once('=').ok_or_else(malformed)?;
    if section.is_empty() || key.is_empty() {
        return Err(malformed().into());
    }

    if section == "CONF" {
        if key != "APPLY" {
            return Err(Error::UnknownCommand(format!("CONF:{section}:{key}")));
        }
        if value != "TRUE" {
            return Err(ValidationError::InvalidToken {
                field: "CONF.APPLY".to_string(),
                value: value.to_string(),
                expected: "TRUE",
            }
            .into());
        }
        return Ok(Command::Apply);
    }

    let config_key = ConfigKey::parse(section, key)
        .ok_or_else(|| Error::UnknownCommand(format!("CONF:{section}:{key}")))?;
    let value = validate::sanitize_text(&config_key.to_string(), value, CONF_MAX_LEN)?;

    Ok(Command::Conf {
        key: config_key,
        value,
    })
}

fn parse_system(argument: &str) -> Result<Command, Error> {
    let request = match token(argument) {
        "REBOOT" => SystemRequest::Reboot,
        "SHUTDOWN" => SystemRequest::Shutdown,
        "QUIT" => SystemRequest::Quit,
        other => return Err(Error::UnknownCommand(format!("CMD:{other}"))),
    };
    Ok(Command::System(request))
}

fn parse_indexed(verb: &str, argument: &str) -> Result<Command, Error> {
    if let Some(suffix) = verb.strip_prefix("LED") {
        let index = LedIndex::new(parse_target(verb, suffix)?)
            .map_err(|_| ParseError::InvalidTarget(verb.to_string()))?;
        let action: SwitchAction = token(argument).parse()?;
        return Ok(Command::Led { index, action });
    }

    if let Some(suffix) = verb.strip_prefix("AIR") {
        // AIR1TIME and friends are well-formed but only AIR3 supports a time set.
        if suffix.ends_with("TIME") {
            return Err(Error::UnknownCommand(verb.to_string()));
        }
        let index = AirIndex::new(parse_target(verb, suffix)?)
            .map_err(|_| ParseError::InvalidTarget(verb.to_string()))?;
        let event: TimerEvent = token(argument).parse()?;
        return Ok(Command::Air { index, event });
    }

    Err(Error::UnknownCommand(verb.to_string()))
}

fn parse_target(verb: &str, suffix: &str) -> Result<u8, ParseError> {
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidTarget(verb.to_string()));
    }
    suffix
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidTarget(verb.to_string()))
}
