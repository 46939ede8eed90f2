// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker connection settings.

use std::time::Duration;

use crate::error::TransportError;

/// Default discovery prefix.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Default device name shown by the home-automation integration.
pub const DEFAULT_DEVICE_NAME: &str = "OnAirScreen";

/// Broker connection and autodiscovery settings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use onair_core::protocol::MqttConfig;
///
/// let config = MqttConfig::builder()
///     .host("192.168.1.50")
///     .credentials("studio", "secret")
///     .keep_alive(Duration::from_secs(60))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.port(), 1883);
/// assert_eq!(config.discovery_prefix(), "homeassistant");
/// ```
#[derive(Debug, Clone)]
pub struct MqttConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    discovery_prefix: String,
    device_name: String,
    keep_alive: Duration,
    reconnection: ReconnectionPolicy,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            keep_alive: Duration::from_secs(30),
            reconnection: ReconnectionPolicy::default(),
        }
    }
}

impl MqttConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> MqttConfigBuilder {
        MqttConfigBuilder::default()
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the credentials, if set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Returns the autodiscovery topic prefix.
    #[must_use]
    pub fn discovery_prefix(&self) -> &str {
        &self.discovery_prefix
    }

    /// Returns the device name.
    #[must_use]
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Returns the reconnection policy.
    #[must_use]
    pub const fn reconnection(&self) -> &ReconnectionPolicy {
        &self.reconnection
    }
}

/// Builder for [`MqttConfig`].
#[derive(Debug, Default)]
pub struct MqttConfigBuilder {
    config: MqttConfig,
}

impl MqttConfigBuilder {
    /// Sets the broker host (required).
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the broker credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the autodiscovery prefix.
    #[must_use]
    pub fn discovery_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.discovery_prefix = prefix.into();
        self
    }

    /// Sets the device name.
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.config.device_name = name.into();
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.config.reconnection = policy;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfiguration`] if the host or the
    /// discovery prefix is empty.
    pub fn build(self) -> Result<MqttConfig, TransportError> {
        if self.config.host.trim().is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "MQTT broker host is required".to_string(),
            ));
        }
        if self.config.discovery_prefix.trim().is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "MQTT discovery prefix must not be empty".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Backoff applied when the broker connection drops.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use onair_core::protocol::ReconnectionPolicy;
///
/// let policy = ReconnectionPolicy::default();
/// assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
/// assert_eq!(policy.delay_for_attempt(20), Duration::from_secs(60));
/// assert!(policy.should_retry(1_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectionPolicy {
    /// Maximum number of retries before giving up (`None` = unlimited).
    pub max_retries: Option<u32>,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for the delay.
    pub max_delay: Duration,
    /// Factor applied per attempt.
    pub backoff_multiplier: u32,
}

impl ReconnectionPolicy {
    /// Sets the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the upper bound for the delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Returns the delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Returns `true` if retry number `attempt` may be made.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_default_values() {
        let builder = MqttConfigBuilder::default();
        assert_eq!(builder.config.port, 1883);
        assert!(builder.config.host.is_empty());
        assert!(builder.config.credentials.is_none());
        assert_eq!(builder.config.keep_alive, Duration::from_secs(30));
        assert_eq!(builder.config.device_name, "OnAirScreen");
    }

    #[test]
    fn builder_chain() {
        let config = MqttConfig::builder()
            .host("broker.local")
            .port(8883)
            .credentials("admin", "secret")
            .discovery_prefix("ha")
            .device_name("Studio 2")
            .build()
            .unwrap();

        assert_eq!(config.host(), "broker.local");
        assert_eq!(config.port(), 8883);
        assert_eq!(config.credentials(), Some(("admin", "secret")));
        assert_eq!(config.discovery_prefix(), "ha");
        assert_eq!(config.device_name(), "Studio 2");
    }

    #[test]
    fn builder_missing_host_fails() {
        let err = MqttConfig::builder().build().unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfiguration(_)));
    }

    #[test]
    fn builder_empty_prefix_fails() {
        let err = MqttConfig::builder()
            .host("broker.local")
            .discovery_prefix(" ")
            .build()
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfiguration(_)));
    }

    #[test]
    fn reconnection_delay_calculation() {
        let policy = ReconnectionPolicy::default().with_max_delay(Duration::from_secs(10));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn reconnection_should_retry() {
        let policy = ReconnectionPolicy::default().with_max_retries(3);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(ReconnectionPolicy::default().should_retry(u32::MAX));
    }
}
