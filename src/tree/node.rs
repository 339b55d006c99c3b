// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object tree node types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Stable numeric handle of a node in the host's object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(u32);

impl NodeHandle {
    /// The handle of the tree root.
    pub const ROOT: Self = Self(0);

    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage type of a variable, fixed when the variable is created.
///
/// The discriminants follow the host's numeric type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Boolean variable (type code 0).
    Boolean = 0,
    /// Integer variable (type code 1).
    Integer = 1,
    /// Floating point variable (type code 2).
    Float = 2,
    /// String variable (type code 3).
    String = 3,
}

impl VariableType {
    /// Returns the host's numeric code for this type.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// The variant-specific part of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    /// Groups children; holds no value.
    Container,
    /// Holds one typed value.
    Variable {
        /// The storage type chosen at creation.
        value_type: VariableType,
        /// The current value, coerced to `value_type`.
        value: Value,
        /// Identifier of the attached display profile.
        profile: Option<String>,
        /// Whether the history sink logs this variable.
        archived: bool,
    },
    /// References another node's live value.
    Link {
        /// The referenced node.
        target: NodeHandle,
    },
}

/// A persisted node of the object tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    /// Handle of this node.
    pub handle: NodeHandle,
    /// Handle of the owning node.
    pub parent: NodeHandle,
    /// Identifier, unique among the parent's children. Links carry none.
    pub ident: Option<String>,
    /// Display name.
    pub name: String,
    /// Display position among siblings.
    pub position: i32,
    /// Optional icon name.
    pub icon: Option<String>,
    /// Whether the node is hidden from the visualisation.
    pub hidden: bool,
    /// Variant data.
    pub kind: NodeKind,
}

impl ObjectNode {
    /// Returns `true` for containers.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container)
    }

    /// Returns `true` for variables.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable { .. })
    }

    /// Returns `true` for links.
    #[must_use]
    pub fn is_link(&self) -> bool {
        matches!(self.kind, NodeKind::Link { .. })
    }

    /// Returns the stored value of a variable.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Variable { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns the storage type of a variable.
    #[must_use]
    pub fn value_type(&self) -> Option<VariableType> {
        match &self.kind {
            NodeKind::Variable { value_type, .. } => Some(*value_type),
            _ => None,
        }
    }

    /// Returns the profile identifier attached to a variable.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Variable { profile, .. } => profile.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` if history logging is enabled for this variable.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        matches!(self.kind, NodeKind::Variable { archived: true, .. })
    }

    /// Returns the target of a link.
    #[must_use]
    pub fn link_target(&self) -> Option<NodeHandle> {
        match self.kind {
            NodeKind::Link { target } => Some(target),
            _ => None,
        }
    }
}
