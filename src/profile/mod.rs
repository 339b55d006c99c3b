// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared display profiles.
//!
//! Profiles are looked up by semantic template name. Names starting with
//! `~` are system-wide and used as they are; all other names are prefixed
//! with the module namespace, so two modules can format the same name
//! differently.
//!
//! The [`ProfileRegistry`] is shared between device instances. Creation is
//! idempotent: a profile that another instance created first counts as
//! created.

mod template;

pub use template::{Association, ProfileDefinition, ProfileTemplate};

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::tree::ProfileStore;

/// Prefix marking system-wide profile names.
pub const SYSTEM_PREFIX: char = '~';

/// Returns the identifier of `template` within `namespace`.
///
/// # Examples
///
/// ```
/// use polltree::profile::profile_id;
///
/// assert_eq!(profile_id("UniFi", "Latency"), "UniFi.Latency");
/// assert_eq!(profile_id("UniFi", "~Watt.14490"), "~Watt.14490");
/// ```
#[must_use]
pub fn profile_id(namespace: &str, template: &str) -> String {
    if template.starts_with(SYSTEM_PREFIX) {
        template.to_string()
    } else {
        format!("{namespace}.{template}")
    }
}

/// Lazily creates profiles and remembers which ones exist.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    known: RwLock<HashSet<String>>,
    templates: HashMap<String, ProfileDefinition>,
}

impl ProfileRegistry {
    /// Creates a registry knowing only the built-in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional template under `name`.
    ///
    /// The definition's identifier is replaced on creation. Custom templates
    /// take precedence over built-in ones of the same name.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, definition: ProfileDefinition) -> Self {
        self.templates.insert(name.into(), definition);
        self
    }

    fn definition(&self, template: &str, id: &str) -> Option<ProfileDefinition> {
        let name = template.trim_start_matches(SYSTEM_PREFIX);
        if let Some(custom) = self.templates.get(name) {
            return Some(custom.clone().with_id(id));
        }
        ProfileTemplate::from_name(name).map(|t| t.definition(id))
    }

    /// Returns the identifier of the profile for `template`, creating it if needed.
    ///
    /// Returns `Ok(None)` if the profile does not exist and no template is
    /// known for the name; the variable then stays unformatted.
    ///
    /// # Errors
    ///
    /// Returns a store error if creation fails for any reason other than the
    /// profile already existing.
    pub fn get_or_create(
        &self,
        store: &dyn ProfileStore,
        namespace: &str,
        template: &str,
    ) -> Result<Option<String>, StoreError> {
        let id = profile_id(namespace, template);
        if self.known.read().contains(&id) {
            return Ok(Some(id));
        }

        if !store.profile_exists(&id) {
            let Some(definition) = self.definition(template, &id) else {
                tracing::debug!(profile = %id, "No template for profile, leaving unformatted");
                return Ok(None);
            };

            match store.create_profile(&definition) {
                Ok(()) => tracing::debug!(profile = %id, "Created profile"),
                Err(StoreError::AlreadyExists(_)) => {
                    tracing::debug!(profile = %id, "Profile created concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        self.known.write().insert(id.clone());
        Ok(Some(id))
    }

    /// Returns the number of profiles known to exist.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.known.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MemoryStore, VariableType};

    #[test]
    fn creates_builtin_once() {
        let store = MemoryStore::new();
        let registry = ProfileRegistry::new();

        let first = registry.get_or_create(&store, "UniFi", "Latency").unwrap();
        let second = registry.get_or_create(&store, "UniFi", "Latency").unwrap();

        assert_eq!(first.as_deref(), Some("UniFi.Latency"));
        assert_eq!(first, second);
        assert_eq!(store.profile_count(), 1);
        assert_eq!(store.profile("UniFi.Latency").unwrap().suffix, " ms");
    }

    #[test]
    fn namespaces_do_not_collide() {
        let store = MemoryStore::new();
        let registry = ProfileRegistry::new();

        registry.get_or_create(&store, "UniFi", "Price").unwrap();
        registry.get_or_create(&store, "Tibber", "Price").unwrap();

        assert_eq!(store.profile_count(), 2);
    }

    #[test]
    fn unknown_template_yields_none() {
        let store = MemoryStore::new();
        let registry = ProfileRegistry::new();

        assert_eq!(registry.get_or_create(&store, "UniFi", "Temperature").unwrap(), None);
        assert_eq!(store.profile_count(), 0);
    }

    #[test]
    fn existing_system_profile_is_used_as_is() {
        let store = MemoryStore::new();
        store
            .create_profile(&ProfileDefinition::new("~Watt.14490", VariableType::Float))
            .unwrap();
        let registry = ProfileRegistry::new();

        let id = registry.get_or_create(&store, "SMA", "~Watt.14490").unwrap();
        assert_eq!(id.as_deref(), Some("~Watt.14490"));
        assert_eq!(store.profile_count(), 1);
    }

    #[test]
    fn missing_system_profile_without_template() {
        let store = MemoryStore::new();
        let registry = ProfileRegistry::new();
        assert_eq!(registry.get_or_create(&store, "SMA", "~Electricity").unwrap(), None);
    }

    #[test]
    fn racing_registries_share_one_profile() {
        let store = MemoryStore::new();
        let a = ProfileRegistry::new();
        let b = ProfileRegistry::new();

        let from_a = a.get_or_create(&store, "UniFi", "Presence").unwrap();
        let from_b = b.get_or_create(&store, "UniFi", "Presence").unwrap();

        assert_eq!(from_a, from_b);
        assert_eq!(store.profile_count(), 1);
    }

    #[test]
    fn already_exists_counts_as_success() {
        struct Racy;

        impl ProfileStore for Racy {
            fn profile_exists(&self, _id: &str) -> bool {
                false
            }

            fn create_profile(&self, definition: &ProfileDefinition) -> Result<(), StoreError> {
                Err(StoreError::AlreadyExists(definition.id.clone()))
            }
        }

        let registry = ProfileRegistry::new();
        let id = registry.get_or_create(&Racy, "UniFi", "Status").unwrap();
        assert_eq!(id.as_deref(), Some("UniFi.Status"));
        assert_eq!(registry.cached(), 1);
    }

    #[test]
    fn custom_template_takes_precedence() {
        let store = MemoryStore::new();
        let registry = ProfileRegistry::new().with_template(
            "CO2",
            ProfileDefinition::new("", VariableType::Integer).with_suffix(" ppm"),
        );

        let id = registry.get_or_create(&store, "Netatmo", "CO2").unwrap().unwrap();
        assert_eq!(id, "Netatmo.CO2");
        assert_eq!(store.profile(&id).unwrap().suffix, " ppm");
    }
}
