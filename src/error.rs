// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the on-air command engine.
//!
//! This module provides the error hierarchy used across the engine: command
//! parsing, input validation, configuration commits, and transport startup.
//! Every failure is local to the line or transport that caused it; nothing in
//! here is ever allowed to take down the State Owner.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A line could not be parsed into a command.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A value failed validation or sanitization.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The line was well-formed but names an unknown verb or target.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// One or more staged configuration entries were invalid at APPLY time.
    #[error("config commit failed: {0}")]
    Commit(#[from] CommitError),

    /// A transport could not be started or failed while running.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The State Owner is no longer running.
    #[error("state owner unavailable")]
    ChannelClosed,
}

impl Error {
    /// Returns a stable, machine-readable tag for this error.
    ///
    /// Transports that report errors back to their peers use this tag in
    /// their structured responses.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Self::Commit(_) => ErrorKind::Commit,
            Self::Transport(_) => ErrorKind::Transport,
            Self::ChannelClosed => ErrorKind::Unavailable,
        }
    }
}

/// Coarse error classification shared by all transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unparseable line.
    Parse,
    /// Value rejected by the validator.
    Validation,
    /// Unrecognized verb or target.
    UnknownCommand,
    /// Configuration commit aborted.
    Commit,
    /// Transport failure.
    Transport,
    /// State Owner gone.
    Unavailable,
}

impl ErrorKind {
    /// Returns the tag as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::UnknownCommand => "unknown_command",
            Self::Commit => "commit",
            Self::Transport => "transport",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while splitting a line into a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line is empty or only whitespace.
    #[error("empty line")]
    Empty,

    /// The line does not contain the `:` separator.
    #[error("missing ':' separator in {0:?}")]
    MissingSeparator(String),

    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidEncoding,

    /// A `CONF` line is missing its `Section:Key=Value` structure.
    #[error("malformed CONF argument {0:?}, expected Section:Key=Value")]
    MalformedConf(String),

    /// The verb carries an index outside 1-4 or a non-numeric index.
    #[error("invalid target index in {0:?}")]
    InvalidTarget(String),
}

/// Errors related to value validation and sanitization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Text is longer than the allowed maximum (in characters).
    #[error("{field} is {actual} characters long, maximum is {max}")]
    TooLong {
        /// The field being validated.
        field: String,
        /// Maximum number of characters.
        max: usize,
        /// Number of characters after sanitization.
        actual: usize,
    },

    /// Text contains a forbidden pattern such as a script tag.
    #[error("{field} contains forbidden content {pattern:?}")]
    DangerousContent {
        /// The field being validated.
        field: String,
        /// The pattern that triggered the rejection.
        pattern: String,
    },

    /// A token is not one of the accepted values.
    #[error("invalid {field} token {value:?}, expected one of {expected}")]
    InvalidToken {
        /// The field being validated.
        field: String,
        /// The rejected value.
        value: String,
        /// Human-readable list of accepted values.
        expected: &'static str,
    },

    /// A color is not in `#RRGGBB` or `0xRRGGBB` notation.
    #[error("invalid color {0:?}, expected #RRGGBB or 0xRRGGBB")]
    InvalidColor(String),

    /// A value is not a non-negative integer.
    #[error("{field} value {value:?} is not a non-negative integer")]
    NotANumber {
        /// The field being validated.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A numeric value is outside its declared range.
    #[error("{field} value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// The field being validated.
        field: String,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
        /// The value that was provided.
        actual: u64,
    },

    /// An address is not a valid IPv4 multicast group.
    #[error("invalid multicast address {0:?}")]
    InvalidMulticast(String),

    /// A warning level outside the operator-writable range.
    #[error("warning level {0} cannot be changed by operators")]
    ReservedPriority(i8),
}

/// A single staged entry that failed validation at commit time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommitFailure {
    /// Section of the failing entry.
    pub section: String,
    /// Key of the failing entry.
    pub key: String,
    /// The staged value.
    pub value: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}={:?}: {}", self.section, self.key, self.value, self.reason)
    }
}

/// Errors returned when an APPLY commit is aborted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// At least one staged entry is invalid; nothing was applied.
    #[error("{}", describe_failures(.0))]
    Invalid(Vec<CommitFailure>),
}

impl CommitError {
    /// Returns the individual failures, if any.
    #[must_use]
    pub fn failures(&self) -> &[CommitFailure] {
        match self {
            Self::Invalid(failures) => failures,
        }
    }
}

fn describe_failures(failures: &[CommitFailure]) -> String {
    let noun = if failures.len() == 1 { "entry" } else { "entries" };
    let details = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} staged {noun} rejected: {details}", failures.len())
}

/// Errors related to transport startup and communication.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The address is already used by another process.
    #[error("{protocol} port {addr} is already in use")]
    PortInUse {
        /// Transport protocol name.
        protocol: &'static str,
        /// The address that could not be bound.
        addr: SocketAddr,
    },

    /// Binding requires privileges the process does not have.
    #[error("permission denied binding {protocol} port {addr}")]
    PermissionDenied {
        /// Transport protocol name.
        protocol: &'static str,
        /// The address that could not be bound.
        addr: SocketAddr,
    },

    /// Any other bind or socket failure.
    #[error("{protocol} socket error on {addr}: {source}")]
    Io {
        /// Transport protocol name.
        protocol: &'static str,
        /// The address involved.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// MQTT client failure.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Invalid broker or listener configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfiguration(String),
}

impl TransportError {
    /// Classifies a bind error by its I/O error kind.
    #[must_use]
    pub fn from_bind(protocol: &'static str, addr: SocketAddr, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::AddrInUse => Self::PortInUse { protocol, addr },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { protocol, addr },
            _ => Self::Io {
                protocol,
                addr,
                source,
            },
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::OutOfRange {
            field: "udpport".to_string(),
            min: 1,
            max: 65535,
            actual: 70000,
        };
        assert_eq!(err.to_string(), "udpport value 70000 is out of range [1, 65535]");
    }

    #[test]
    fn error_kind_mapping() {
        let err: Error = ParseError::Empty.into();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err: Error = ValidationError::InvalidColor("red".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(Error::UnknownCommand("FOO".into()).kind(), ErrorKind::UnknownCommand);
        assert_eq!(Error::ChannelClosed.kind().as_str(), "unavailable");
    }

    #[test]
    fn commit_error_names_failing_key() {
        let err = CommitError::Invalid(vec![CommitFailure {
            section: "Network".into(),
            key: "udpport".into(),
            value: "notanumber".into(),
            reason: "not a number".into(),
        }]);
        let text = err.to_string();
        assert!(text.contains("1 staged entry rejected"));
        assert!(text.contains("Network.udpport"));
        assert_eq!(err.failures().len(), 1);
    }

    #[test]
    fn bind_error_classification() {
        let addr: SocketAddr = "127.0.0.1:8010".parse().unwrap();
        let err = TransportError::from_bind(
            "HTTP",
            addr,
            std::io::Error::from(std::io::ErrorKind::AddrInUse),
        );
        assert!(matches!(err, TransportError::PortInUse { .. }));
        assert_eq!(err.to_string(), "HTTP port 127.0.0.1:8010 is already in use");
    }
}
