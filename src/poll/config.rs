// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reconcile::{ReconcileConfig, is_valid_namespace};

/// Configuration of one polling instance.
///
/// # Examples
///
/// ```
/// use polltree::poll::PollerConfig;
/// use std::time::Duration;
///
/// let config = PollerConfig::new("SMA")
///     .with_interval(Duration::from_secs(30))
///     .with_read_timeout(Duration::from_secs(2))
///     .with_archived("Power");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.namespace(), "SMA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(with = "millis", rename = "interval_ms")]
    interval: Duration,
    #[serde(with = "millis", rename = "read_timeout_ms")]
    read_timeout: Duration,
    #[serde(default)]
    position_offset: i32,
    reconcile: ReconcileConfig,
}

impl PollerConfig {
    /// Default polling interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
    /// Default timeout of a single read.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration with default timing for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            position_offset: 0,
            reconcile: ReconcileConfig::new(namespace),
        }
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the timeout of a single read.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the position of the first value of the primary source.
    #[must_use]
    pub fn with_position_offset(mut self, offset: i32) -> Self {
        self.position_offset = offset;
        self
    }

    /// Enables history logging for `name`.
    #[must_use]
    pub fn with_archived(mut self, name: impl Into<String>) -> Self {
        self.reconcile = self.reconcile.with_archived(name);
        self
    }

    /// Hides `name`.
    #[must_use]
    pub fn with_hidden(mut self, name: impl Into<String>) -> Self {
        self.reconcile = self.reconcile.with_hidden(name);
        self
    }

    /// Formats `name` with the profile `template`.
    #[must_use]
    pub fn with_profile(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.reconcile = self.reconcile.with_profile(name, template);
        self
    }

    /// Returns the polling interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the timeout of a single read.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the position of the first value of the primary source.
    #[must_use]
    pub fn position_offset(&self) -> i32 {
        self.position_offset
    }

    /// Returns the identifier namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.reconcile.namespace()
    }

    /// Returns the reconciliation settings.
    #[must_use]
    pub fn reconcile(&self) -> &ReconcileConfig {
        &self.reconcile
    }

    /// Checks the configuration before anything is read.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero interval, a zero read timeout,
    /// or a namespace that is empty or contains unsafe characters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if !is_valid_namespace(self.namespace()) {
            return Err(ConfigError::InvalidNamespace(self.namespace().to_string()));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
