// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tracking of addresses that failed to read or decode.
//!
//! An address that failed once is never read again until the list is reset
//! by hand. Addresses marked during a cycle are held back until
//! [`UnsupportedAddresses::commit`] so the running cycle keeps the address
//! set it started with.

use crate::error::StoreError;
use crate::tree::{NodeHandle, ObjectStore};

/// Instance property holding the persisted address list.
pub const PROPERTY_KEY: &str = "unsupported";

/// The persisted, ordered set of unsupported addresses of one device instance.
///
/// # Examples
///
/// ```
/// use polltree::unsupported::UnsupportedAddresses;
///
/// let mut unsupported = UnsupportedAddresses::new();
/// unsupported.mark_unsupported(30_775);
///
/// // Still read during the current cycle.
/// assert!(!unsupported.is_skippable(30_775));
///
/// unsupported.commit();
/// assert!(unsupported.is_skippable(30_775));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsupportedAddresses {
    addresses: Vec<u16>,
    pending: Vec<u16>,
}

impl UnsupportedAddresses {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from already committed addresses.
    #[must_use]
    pub fn from_addresses(addresses: impl IntoIterator<Item = u16>) -> Self {
        let mut set = Self::new();
        for address in addresses {
            if !set.addresses.contains(&address) {
                set.addresses.push(address);
            }
        }
        set
    }

    /// Loads the set persisted on `instance`.
    ///
    /// A missing property yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidProperty`] if the persisted list is not a
    /// JSON array of addresses, or a store error if `instance` does not exist.
    pub fn load(store: &dyn ObjectStore, instance: NodeHandle) -> Result<Self, StoreError> {
        let Some(raw) = store.property(instance, PROPERTY_KEY)? else {
            return Ok(Self::new());
        };
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }

        let addresses: Vec<u16> =
            serde_json::from_str(&raw).map_err(|source| StoreError::InvalidProperty {
                key: PROPERTY_KEY.to_string(),
                source,
            })?;
        Ok(Self::from_addresses(addresses))
    }

    /// Persists the committed addresses on `instance`.
    ///
    /// # Errors
    ///
    /// Returns a store error if `instance` does not exist.
    pub fn save(&self, store: &dyn ObjectStore, instance: NodeHandle) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.addresses).map_err(|source| {
            StoreError::InvalidProperty {
                key: PROPERTY_KEY.to_string(),
                source,
            }
        })?;
        store.set_property(instance, PROPERTY_KEY, raw)
    }

    /// Returns `true` if `address` must not be read.
    #[must_use]
    pub fn is_skippable(&self, address: u16) -> bool {
        self.addresses.contains(&address)
    }

    /// Marks `address` as unsupported from the next cycle on.
    ///
    /// Returns `false` if the address was already known.
    pub fn mark_unsupported(&mut self, address: u16) -> bool {
        if self.addresses.contains(&address) || self.pending.contains(&address) {
            return false;
        }
        self.pending.push(address);
        true
    }

    /// Moves the addresses marked during this cycle into the committed set.
    ///
    /// Returns the newly committed addresses in the order they were marked.
    pub fn commit(&mut self) -> Vec<u16> {
        let added = std::mem::take(&mut self.pending);
        self.addresses.extend_from_slice(&added);
        added
    }

    /// Clears every address, committed or pending.
    pub fn reset(&mut self) {
        self.addresses.clear();
        self.pending.clear();
    }

    /// Returns the committed addresses in the order they failed.
    #[must_use]
    pub fn addresses(&self) -> &[u16] {
        &self.addresses
    }

    /// Returns the addresses marked during the running cycle.
    #[must_use]
    pub fn pending(&self) -> &[u16] {
        &self.pending
    }

    /// Returns the number of committed addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns `true` if no address is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
