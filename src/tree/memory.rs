// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory object store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::profile::ProfileDefinition;
use crate::value::Value;

use super::{HistorySink, NodeHandle, NodeKind, ObjectNode, ObjectStore, ProfileStore, VariableType};

/// An [`ObjectStore`] kept entirely in memory.
///
/// The store starts with a single root container at [`NodeHandle::ROOT`].
/// It implements [`ProfileStore`] and [`HistorySink`] as well, so a whole
/// reconciliation can run against it without a host.
///
/// # Examples
///
/// ```
/// use polltree::tree::{MemoryStore, NodeHandle, ObjectStore};
///
/// let store = MemoryStore::new();
/// let instance = store.create_container(NodeHandle::ROOT, "SMA").unwrap();
///
/// assert_eq!(store.find_child(NodeHandle::ROOT, "SMA").unwrap(), Some(instance));
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    nodes: BTreeMap<NodeHandle, ObjectNode>,
    next_handle: u32,
    properties: HashMap<(NodeHandle, String), String>,
    profiles: BTreeMap<String, ProfileDefinition>,
}

impl Inner {
    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut ObjectNode, StoreError> {
        self.nodes
            .get_mut(&handle)
            .ok_or(StoreError::NotFound(handle))
    }

    fn require(&self, handle: NodeHandle) -> Result<&ObjectNode, StoreError> {
        self.nodes.get(&handle).ok_or(StoreError::NotFound(handle))
    }

    fn insert(&mut self, parent: NodeHandle, ident: Option<&str>, kind: NodeKind) -> NodeHandle {
        let handle = NodeHandle::new(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(
            handle,
            ObjectNode {
                handle,
                parent,
                ident: ident.map(str::to_string),
                name: ident.unwrap_or_default().to_string(),
                position: 0,
                icon: None,
                hidden: false,
                kind,
            },
        );
        handle
    }

    fn ensure_free(&self, parent: NodeHandle, ident: &str) -> Result<(), StoreError> {
        self.require(parent)?;
        let taken = self
            .nodes
            .values()
            .any(|n| n.parent == parent && n.ident.as_deref() == Some(ident));
        if taken {
            return Err(StoreError::AlreadyExists(format!("ident {ident} below {parent}")));
        }
        Ok(())
    }
}

impl MemoryStore {
    /// Creates a store holding only the root container.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            NodeHandle::ROOT,
            ObjectNode {
                handle: NodeHandle::ROOT,
                parent: NodeHandle::ROOT,
                ident: None,
                name: "Root".to_string(),
                position: 0,
                icon: None,
                hidden: false,
                kind: NodeKind::Container,
            },
        );

        Self {
            inner: RwLock::new(Inner {
                nodes,
                next_handle: 1,
                properties: HashMap::new(),
                profiles: BTreeMap::new(),
            }),
        }
    }

    /// Returns a copy of a node.
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<ObjectNode> {
        self.inner.read().nodes.get(&handle).cloned()
    }

    /// Returns the children of `parent`, ordered by position then handle.
    #[must_use]
    pub fn children(&self, parent: NodeHandle) -> Vec<ObjectNode> {
        let inner = self.inner.read();
        let mut children: Vec<ObjectNode> = inner
            .nodes
            .values()
            .filter(|n| n.parent == parent && n.handle != NodeHandle::ROOT)
            .cloned()
            .collect();
        children.sort_by_key(|n| (n.position, n.handle));
        children
    }

    /// Returns a snapshot of every node, ordered by handle.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ObjectNode> {
        self.inner.read().nodes.values().cloned().collect()
    }

    /// Returns the number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Returns `true` if the store holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Returns a copy of a profile definition.
    #[must_use]
    pub fn profile(&self, id: &str) -> Option<ProfileDefinition> {
        self.inner.read().profiles.get(id).cloned()
    }

    /// Returns the number of stored profiles.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.inner.read().profiles.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for MemoryStore {
    fn profile_exists(&self, id: &str) -> bool {
        self.inner.read().profiles.contains_key(id)
    }

    fn create_profile(&self, definition: &ProfileDefinition) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.profiles.contains_key(&definition.id) {
            return Err(StoreError::AlreadyExists(format!("profile {}", definition.id)));
        }
        inner
            .profiles
            .insert(definition.id.clone(), definition.clone());
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn find_child(&self, parent: NodeHandle, ident: &str) -> Result<Option<NodeHandle>, StoreError> {
        let inner = self.inner.read();
        inner.require(parent)?;
        Ok(inner
            .nodes
            .values()
            .find(|n| n.parent == parent && n.ident.as_deref() == Some(ident))
            .map(|n| n.handle))
    }

    fn find_link(
        &self,
        parent: NodeHandle,
        target: NodeHandle,
    ) -> Result<Option<NodeHandle>, StoreError> {
        let inner = self.inner.read();
        inner.require(parent)?;
        Ok(inner
            .nodes
            .values()
            .find(|n| n.parent == parent && n.link_target() == Some(target))
            .map(|n| n.handle))
    }

    fn is_container(&self, handle: NodeHandle) -> Result<bool, StoreError> {
        Ok(self.inner.read().require(handle)?.is_container())
    }

    fn create_container(&self, parent: NodeHandle, ident: &str) -> Result<NodeHandle, StoreError> {
        let mut inner = self.inner.write();
        inner.ensure_free(parent, ident)?;
        Ok(inner.insert(parent, Some(ident), NodeKind::Container))
    }

    fn create_variable(
        &self,
        parent: NodeHandle,
        ident: &str,
        value_type: VariableType,
    ) -> Result<NodeHandle, StoreError> {
        let mut inner = self.inner.write();
        inner.ensure_free(parent, ident)?;
        let kind = NodeKind::Variable {
            value_type,
            value: Value::default_for(value_type),
            profile: None,
            archived: false,
        };
        Ok(inner.insert(parent, Some(ident), kind))
    }

    fn create_link(&self, parent: NodeHandle, target: NodeHandle) -> Result<NodeHandle, StoreError> {
        let mut inner = self.inner.write();
        inner.require(parent)?;
        inner.require(target)?;
        Ok(inner.insert(parent, None, NodeKind::Link { target }))
    }

    fn set_name(&self, handle: NodeHandle, name: &str) -> Result<(), StoreError> {
        self.inner.write().node_mut(handle)?.name = name.to_string();
        Ok(())
    }

    fn set_position(&self, handle: NodeHandle, position: i32) -> Result<(), StoreError> {
        self.inner.write().node_mut(handle)?.position = position;
        Ok(())
    }

    fn set_icon(&self, handle: NodeHandle, icon: &str) -> Result<(), StoreError> {
        self.inner.write().node_mut(handle)?.icon = Some(icon.to_string());
        Ok(())
    }

    fn set_hidden(&self, handle: NodeHandle, hidden: bool) -> Result<(), StoreError> {
        self.inner.write().node_mut(handle)?.hidden = hidden;
        Ok(())
    }

    fn set_profile(&self, handle: NodeHandle, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        match &mut inner.node_mut(handle)?.kind {
            NodeKind::Variable { profile, .. } => {
                *profile = Some(id.to_string());
                Ok(())
            }
            _ => Err(StoreError::WrongKind {
                handle,
                expected: "variable",
            }),
        }
    }

    fn set_value(&self, handle: NodeHandle, new_value: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        match &mut inner.node_mut(handle)?.kind {
            NodeKind::Variable {
                value_type, value, ..
            } => {
                *value = new_value.coerce(*value_type);
                Ok(())
            }
            _ => Err(StoreError::WrongKind {
                handle,
                expected: "variable",
            }),
        }
    }

    fn property(&self, handle: NodeHandle, key: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read();
        inner.require(handle)?;
        Ok(inner.properties.get(&(handle, key.to_string())).cloned())
    }

    fn set_property(&self, handle: NodeHandle, key: &str, value: String) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner.require(handle)?;
        inner.properties.insert((handle, key.to_string()), value);
        Ok(())
    }
}

impl HistorySink for MemoryStore {
    fn enable_logging(&self, handle: NodeHandle) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        match &mut inner.node_mut(handle)?.kind {
            NodeKind::Variable { archived, .. } => {
                *archived = true;
                Ok(())
            }
            _ => Err(StoreError::WrongKind {
                handle,
                expected: "variable",
            }),
        }
    }
}
