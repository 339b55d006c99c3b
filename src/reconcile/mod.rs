// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of named values onto the object tree.
//!
//! The [`Reconciler`] upserts one variable per entry of a
//! [`NamedValueMap`], keyed by an identifier derived from the entry's name.
//! Running it again with the same map finds the same nodes and only writes
//! values, so it can run on every polling tick against a tree that already
//! holds the previous results. Nodes are never deleted.
//!
//! # Examples
//!
//! ```
//! use polltree::profile::ProfileRegistry;
//! use polltree::reconcile::{ReconcileConfig, Reconciler};
//! use polltree::tree::{MemoryStore, NodeHandle};
//! use polltree::value::NamedValueMap;
//!
//! let store = MemoryStore::new();
//! let profiles = ProfileRegistry::new();
//! let reconciler = Reconciler::new(&store, &profiles);
//!
//! let values = NamedValueMap::new().with("Temperature", 21.5).with("Power Today", 3.2);
//! let applied = reconciler
//!     .reconcile(NodeHandle::ROOT, &values, 0, &ReconcileConfig::new("SMA"))
//!     .unwrap();
//!
//! assert_eq!(applied.created().count(), 2);
//! ```

mod config;
mod ident;

pub use config::ReconcileConfig;
pub use ident::{SEPARATOR, SUBSTITUTIONS, identifier, is_valid_namespace, sanitize};

use std::collections::HashMap;

use crate::error::StoreError;
use crate::profile::ProfileRegistry;
use crate::tree::{HistorySink, NodeHandle, ObjectStore};
use crate::value::{Item, NamedValueMap, Value};

/// Kind of node touched by a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppliedKind {
    /// A container.
    Container,
    /// A variable.
    Variable,
    /// A link.
    Link,
}

/// One node touched by a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedNode {
    /// Handle of the node.
    pub handle: NodeHandle,
    /// Identifier of the node; links carry none.
    pub ident: Option<String>,
    /// Semantic name the node was reconciled from.
    pub name: String,
    /// Kind of node.
    pub kind: AppliedKind,
    /// Whether the node was created by this reconciliation.
    pub created: bool,
}

/// An entry whose identifier was already taken.
///
/// Two distinct names of one batch that map to the same identifier are
/// written to the same node and the later one wins. An entry whose
/// identifier belongs to a node of the other kind (a value landing on a
/// container or a group landing on a variable) is skipped instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// The shared identifier.
    pub ident: String,
    /// The name that claimed the identifier first in this batch, or the
    /// entry's own name if an earlier reconciliation claimed it.
    pub first: String,
    /// The name merged into it.
    pub merged: String,
    /// Whether the entry was skipped because the node has the other kind.
    pub skipped: bool,
}

/// The nodes touched by a reconciliation, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Touched nodes; nested groups follow their container.
    pub nodes: Vec<AppliedNode>,
    /// Identifier collisions detected in the batch.
    pub collisions: Vec<Collision>,
}

impl Applied {
    /// Returns the nodes created by this reconciliation.
    pub fn created(&self) -> impl Iterator<Item = &AppliedNode> {
        self.nodes.iter().filter(|n| n.created)
    }

    /// Returns the handle of the first node reconciled from `name`.
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<NodeHandle> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.handle)
    }

    /// Returns the number of touched nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends the result of another reconciliation.
    pub fn extend(&mut self, other: Applied) {
        self.nodes.extend(other.nodes);
        self.collisions.extend(other.collisions);
    }
}

/// A link to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// The node the link points at.
    pub target: NodeHandle,
    /// Display name, applied on creation.
    pub name: String,
    /// Optional icon, applied on creation.
    pub icon: Option<String>,
    /// Whether the link is hidden, applied on creation.
    pub hidden: bool,
}

impl LinkTarget {
    /// Creates a visible link target without icon.
    #[must_use]
    pub fn new(target: NodeHandle, name: impl Into<String>) -> Self {
        Self {
            target,
            name: name.into(),
            icon: None,
            hidden: false,
        }
    }

    /// Sets the icon.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Hides the link.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

// Outcome of looking up an identifier below a parent.
enum Existing {
    Missing,
    Found(NodeHandle),
    OtherKind(NodeHandle),
}

// Where and under which label a node lands.
struct Placement<'n> {
    ident: String,
    name: &'n str,
    rename: bool,
    position: i32,
}

fn position_at(offset: i32, index: usize) -> i32 {
    offset.saturating_add(i32::try_from(index).unwrap_or(i32::MAX))
}

/// Upserts named values into the object tree.
///
/// The reconciler holds no per-instance state: everything that differs
/// between device instances comes in through [`ReconcileConfig`], so one
/// reconciler can serve several instances.
pub struct Reconciler<'a> {
    store: &'a dyn ObjectStore,
    profiles: &'a ProfileRegistry,
    history: Option<&'a dyn HistorySink>,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler without history sink.
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore, profiles: &'a ProfileRegistry) -> Self {
        Self {
            store,
            profiles,
            history: None,
        }
    }

    /// Sets the sink enabling history logging on archived variables.
    #[must_use]
    pub fn with_history(mut self, history: &'a dyn HistorySink) -> Self {
        self.history = Some(history);
        self
    }

    /// Projects `values` onto the children of `parent`.
    ///
    /// Entry `i` of the map lands at position `offset + i`. Groups recurse
    /// into a sub-container whose children are numbered from zero.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store rejects an operation, for example
    /// because `parent` does not exist.
    pub fn reconcile(
        &self,
        parent: NodeHandle,
        values: &NamedValueMap,
        offset: i32,
        config: &ReconcileConfig,
    ) -> Result<Applied, StoreError> {
        let mut applied = Applied::default();
        self.reconcile_into(parent, values, offset, config, &mut applied)?;
        Ok(applied)
    }

    fn reconcile_into(
        &self,
        parent: NodeHandle,
        values: &NamedValueMap,
        offset: i32,
        config: &ReconcileConfig,
        applied: &mut Applied,
    ) -> Result<(), StoreError> {
        let mut claimed: HashMap<String, &str> = HashMap::new();

        for (index, entry) in values.iter().enumerate() {
            let name = entry.name().trim();
            let ident = identifier(config.namespace(), entry.ident().unwrap_or(name));
            let is_group = matches!(entry.item(), Item::Group(_));

            let existing = match self.lookup(parent, &ident, is_group)? {
                Existing::Missing => None,
                Existing::Found(handle) => Some(handle),
                Existing::OtherKind(handle) => {
                    tracing::warn!(
                        ident = %ident,
                        handle = %handle,
                        name = name,
                        "Identifier taken by a node of another kind, skipping entry"
                    );
                    applied.collisions.push(Collision {
                        first: claimed.get(&ident).copied().unwrap_or(name).to_string(),
                        ident,
                        merged: name.to_string(),
                        skipped: true,
                    });
                    continue;
                }
            };

            if let Some(first) = claimed.insert(ident.clone(), name)
                && first != name
            {
                tracing::warn!(
                    ident = %ident,
                    first = first,
                    merged = name,
                    "Identifier collision, merging into one node"
                );
                applied.collisions.push(Collision {
                    ident: ident.clone(),
                    first: first.to_string(),
                    merged: name.to_string(),
                    skipped: false,
                });
            }

            let placement = Placement {
                ident,
                name,
                rename: entry.ident().is_some(),
                position: position_at(offset, index),
            };

            match entry.item() {
                Item::Value(value) => {
                    let node =
                        self.upsert_leaf(parent, placement, existing, value.clone(), config)?;
                    applied.nodes.push(node);
                }
                Item::Group(group) => {
                    let node = self.upsert_folder(parent, placement, existing, None, config)?;
                    let handle = node.handle;
                    applied.nodes.push(node);
                    self.reconcile_into(handle, group, 0, config, applied)?;
                }
            }
        }
        Ok(())
    }

    /// Upserts a single variable named `name` below `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WrongKind`] if the identifier belongs to a
    /// container, or a store error if the store rejects an operation.
    pub fn upsert_variable(
        &self,
        parent: NodeHandle,
        name: &str,
        value: impl Into<Value>,
        position: i32,
        config: &ReconcileConfig,
    ) -> Result<AppliedNode, StoreError> {
        let name = name.trim();
        let ident = identifier(config.namespace(), name);
        let existing = match self.lookup(parent, &ident, false)? {
            Existing::Missing => None,
            Existing::Found(handle) => Some(handle),
            Existing::OtherKind(handle) => {
                return Err(StoreError::WrongKind {
                    handle,
                    expected: "variable",
                });
            }
        };
        let placement = Placement {
            ident,
            name,
            rename: false,
            position,
        };
        self.upsert_leaf(parent, placement, existing, value.into(), config)
    }

    /// Upserts a container named `name` below `parent`.
    ///
    /// The icon and the hidden flag are only applied on creation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WrongKind`] if the identifier belongs to a
    /// variable, or a store error if the store rejects an operation.
    pub fn upsert_container(
        &self,
        parent: NodeHandle,
        name: &str,
        icon: Option<&str>,
        position: i32,
        config: &ReconcileConfig,
    ) -> Result<AppliedNode, StoreError> {
        let name = name.trim();
        let ident = identifier(config.namespace(), name);
        let existing = match self.lookup(parent, &ident, true)? {
            Existing::Missing => None,
            Existing::Found(handle) => Some(handle),
            Existing::OtherKind(handle) => {
                return Err(StoreError::WrongKind {
                    handle,
                    expected: "container",
                });
            }
        };
        let placement = Placement {
            ident,
            name,
            rename: false,
            position,
        };
        self.upsert_folder(parent, placement, existing, icon, config)
    }

    fn lookup(
        &self,
        parent: NodeHandle,
        ident: &str,
        container: bool,
    ) -> Result<Existing, StoreError> {
        let Some(handle) = self.store.find_child(parent, ident)? else {
            return Ok(Existing::Missing);
        };
        if self.store.is_container(handle)? == container {
            Ok(Existing::Found(handle))
        } else {
            Ok(Existing::OtherKind(handle))
        }
    }

    fn upsert_leaf(
        &self,
        parent: NodeHandle,
        placement: Placement<'_>,
        existing: Option<NodeHandle>,
        value: Value,
        config: &ReconcileConfig,
    ) -> Result<AppliedNode, StoreError> {
        let Placement {
            ident,
            name,
            rename,
            position,
        } = placement;
        let value = value.trimmed();

        let (handle, created) = match existing {
            Some(handle) => (handle, false),
            None => {
                let handle = self.store.create_variable(parent, &ident, value.variable_type())?;
                tracing::debug!(
                    ident = %ident,
                    handle = %handle,
                    value_type = ?value.variable_type(),
                    "Created variable"
                );
                self.apply_new_leaf_settings(handle, name, config)?;
                (handle, true)
            }
        };

        if created || rename {
            self.store.set_name(handle, name)?;
        }
        self.store.set_position(handle, position)?;
        self.store.set_value(handle, value)?;

        Ok(AppliedNode {
            handle,
            ident: Some(ident),
            name: name.to_string(),
            kind: AppliedKind::Variable,
            created,
        })
    }

    fn apply_new_leaf_settings(
        &self,
        handle: NodeHandle,
        name: &str,
        config: &ReconcileConfig,
    ) -> Result<(), StoreError> {
        if config.is_hidden(name) {
            self.store.set_hidden(handle, true)?;
        }

        if config.is_archived(name) {
            match self.history {
                Some(history) => {
                    if let Err(e) = history.enable_logging(handle) {
                        tracing::warn!(handle = %handle, error = %e, "Failed to enable history logging");
                    }
                }
                None => tracing::debug!(handle = %handle, "No history sink, not archiving"),
            }
        }

        if let Some(template) = config.profile_for(name) {
            match self
                .profiles
                .get_or_create(self.store, config.namespace(), template)
            {
                Ok(Some(id)) => self.store.set_profile(handle, &id)?,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(profile = template, error = %e, "Failed to create profile");
                }
            }
        }
        Ok(())
    }

    fn upsert_folder(
        &self,
        parent: NodeHandle,
        placement: Placement<'_>,
        existing: Option<NodeHandle>,
        icon: Option<&str>,
        config: &ReconcileConfig,
    ) -> Result<AppliedNode, StoreError> {
        let Placement {
            ident,
            name,
            rename,
            position,
        } = placement;

        let (handle, created) = match existing {
            Some(handle) => (handle, false),
            None => {
                let handle = self.store.create_container(parent, &ident)?;
                tracing::debug!(ident = %ident, handle = %handle, "Created container");
                if let Some(icon) = icon {
                    self.store.set_icon(handle, icon)?;
                }
                if config.is_hidden(name) {
                    self.store.set_hidden(handle, true)?;
                }
                (handle, true)
            }
        };

        if created || rename {
            self.store.set_name(handle, name)?;
        }
        self.store.set_position(handle, position)?;

        Ok(AppliedNode {
            handle,
            ident: Some(ident),
            name: name.to_string(),
            kind: AppliedKind::Container,
            created,
        })
    }

    /// Upserts one link per target below `parent`, in order.
    ///
    /// Links are matched by their target rather than by name. Link `i` lands
    /// at position `offset + i`; name, icon and hidden flag are only applied
    /// on creation.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store rejects an operation, for example
    /// because a target does not exist.
    pub fn reconcile_links(
        &self,
        parent: NodeHandle,
        targets: &[LinkTarget],
        offset: i32,
    ) -> Result<Applied, StoreError> {
        let mut applied = Applied::default();

        for (index, link) in targets.iter().enumerate() {
            let name = link.name.trim();
            let (handle, created) = match self.store.find_link(parent, link.target)? {
                Some(handle) => (handle, false),
                None => {
                    let handle = self.store.create_link(parent, link.target)?;
                    tracing::debug!(link_target = %link.target, handle = %handle, "Created link");
                    self.store.set_name(handle, name)?;
                    if link.hidden {
                        self.store.set_hidden(handle, true)?;
                    }
                    if let Some(icon) = &link.icon {
                        self.store.set_icon(handle, icon)?;
                    }
                    (handle, true)
                }
            };
            self.store.set_position(handle, position_at(offset, index))?;

            applied.nodes.push(AppliedNode {
                handle,
                ident: None,
                name: name.to_string(),
                kind: AppliedKind::Link,
                created,
            });
        }
        Ok(applied)
    }
}
