// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Collaborator traits for the host's object store.
//!
//! The host owns the persistent tree and hands out stable numeric handles.
//! These traits are the only way the reconciler touches it, so any host
//! (or the bundled [`MemoryStore`](super::MemoryStore)) can sit behind them.

use crate::error::StoreError;
use crate::profile::ProfileDefinition;
use crate::value::Value;

use super::{NodeHandle, VariableType};

/// Store of shared display profiles, keyed by their namespaced name.
pub trait ProfileStore: Send + Sync {
    /// Returns `true` if a profile with this identifier exists.
    fn profile_exists(&self, id: &str) -> bool;

    /// Creates a profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if a profile with the same
    /// identifier was created in the meantime.
    fn create_profile(&self, definition: &ProfileDefinition) -> Result<(), StoreError>;
}

/// The host's hierarchical object store.
///
/// All mutating methods take `&self`; implementations synchronise
/// internally. Every method that receives a handle fails with
/// [`StoreError::NotFound`] if the node does not exist.
pub trait ObjectStore: ProfileStore {
    /// Finds the child of `parent` carrying `ident`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist.
    fn find_child(&self, parent: NodeHandle, ident: &str) -> Result<Option<NodeHandle>, StoreError>;

    /// Finds a link below `parent` that points at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist.
    fn find_link(
        &self,
        parent: NodeHandle,
        target: NodeHandle,
    ) -> Result<Option<NodeHandle>, StoreError>;

    /// Returns `true` if the node is a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn is_container(&self, handle: NodeHandle) -> Result<bool, StoreError>;

    /// Creates a container below `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist or `ident` is taken.
    fn create_container(&self, parent: NodeHandle, ident: &str) -> Result<NodeHandle, StoreError>;

    /// Creates a variable of the given type below `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist or `ident` is taken.
    fn create_variable(
        &self,
        parent: NodeHandle,
        ident: &str,
        value_type: VariableType,
    ) -> Result<NodeHandle, StoreError>;

    /// Creates a link below `parent` pointing at `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` or `target` does not exist.
    fn create_link(&self, parent: NodeHandle, target: NodeHandle) -> Result<NodeHandle, StoreError>;

    /// Sets the display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn set_name(&self, handle: NodeHandle, name: &str) -> Result<(), StoreError>;

    /// Sets the display position.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn set_position(&self, handle: NodeHandle, position: i32) -> Result<(), StoreError>;

    /// Sets the icon.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn set_icon(&self, handle: NodeHandle, icon: &str) -> Result<(), StoreError>;

    /// Shows or hides the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn set_hidden(&self, handle: NodeHandle, hidden: bool) -> Result<(), StoreError>;

    /// Attaches a profile to a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is not a variable.
    fn set_profile(&self, handle: NodeHandle, profile: &str) -> Result<(), StoreError>;

    /// Writes a value into a variable.
    ///
    /// The store keeps the variable's storage type and coerces the value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is not a variable.
    fn set_value(&self, handle: NodeHandle, value: Value) -> Result<(), StoreError>;

    /// Reads a configuration property attached to a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn property(&self, handle: NodeHandle, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a configuration property attached to a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn set_property(&self, handle: NodeHandle, key: &str, value: String) -> Result<(), StoreError>;
}

/// External history logging collaborator.
pub trait HistorySink: Send + Sync {
    /// Enables history logging for a variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable cannot be logged.
    fn enable_logging(&self, handle: NodeHandle) -> Result<(), StoreError>;
}
