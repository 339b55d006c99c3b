// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The persistent object tree.
//!
//! The host keeps a tree of containers, variables and links addressed by
//! stable numeric handles. This module describes those nodes and the
//! collaborator traits through which the reconciler reads and writes them:
//!
//! - [`ObjectStore`]: find, create and update nodes, plus per-node properties
//! - [`ProfileStore`]: shared display profiles
//! - [`HistorySink`]: the external history logger
//!
//! [`MemoryStore`] implements all three in memory.

mod memory;
mod node;
mod store;

pub use memory::MemoryStore;
pub use node::{NodeHandle, NodeKind, ObjectNode, VariableType};
pub use store::{HistorySink, ObjectStore, ProfileStore};
