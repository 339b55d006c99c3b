// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-call reconciliation settings.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Settings applied to variables the reconciler creates.
///
/// All lookups are by semantic name and only matter when a variable is
/// created; existing variables keep their formatting.
///
/// # Examples
///
/// ```
/// use polltree::reconcile::ReconcileConfig;
///
/// let config = ReconcileConfig::new("UniFi")
///     .with_archived("Latency")
///     .with_hidden("Raw JSON")
///     .with_profile("Latency", "Latency");
///
/// assert!(config.is_archived("Latency"));
/// assert_eq!(config.profile_for("Latency"), Some("Latency"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    namespace: String,
    #[serde(default)]
    archived: HashSet<String>,
    #[serde(default)]
    hidden: HashSet<String>,
    #[serde(default)]
    profiles: HashMap<String, String>,
}

impl ReconcileConfig {
    /// Creates a configuration for identifiers and profiles in `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Enables history logging for `name`.
    #[must_use]
    pub fn with_archived(mut self, name: impl Into<String>) -> Self {
        self.archived.insert(name.into());
        self
    }

    /// Hides `name`.
    #[must_use]
    pub fn with_hidden(mut self, name: impl Into<String>) -> Self {
        self.hidden.insert(name.into());
        self
    }

    /// Formats `name` with the profile `template`.
    #[must_use]
    pub fn with_profile(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.profiles.insert(name.into(), template.into());
        self
    }

    /// Adds a device hint for `name` without overriding explicit settings.
    ///
    /// A profile already configured for the name is kept.
    pub fn apply_hint(&mut self, name: &str, profile: Option<&str>, archived: bool) {
        if let Some(template) = profile {
            self.profiles
                .entry(name.to_string())
                .or_insert_with(|| template.to_string());
        }
        if archived {
            self.archived.insert(name.to_string());
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns `true` if `name` is logged by the history sink.
    #[must_use]
    pub fn is_archived(&self, name: &str) -> bool {
        self.archived.contains(name)
    }

    /// Returns `true` if `name` is hidden.
    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    /// Returns the profile template configured for `name`.
    #[must_use]
    pub fn profile_for(&self, name: &str) -> Option<&str> {
        self.profiles.get(name).map(String::as_str)
    }
}
