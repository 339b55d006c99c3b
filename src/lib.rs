// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `polltree` - decode polled device data and keep it in a home-automation
//! object tree.
//!
//! Home-automation modules all do the same thing on every timer tick: read
//! an external source, turn what came back into typed values, and make sure
//! the host's tree of containers, variables and links reflects them without
//! ever duplicating a node. This library is that pipeline.
//!
//! # Components
//!
//! - [`decode`]: raw register words to typed values (fixed point scaling,
//!   enum labels, signedness and byte order)
//! - [`unsupported`]: persisted list of addresses that failed and are skipped
//! - [`profile`]: shared display profiles, created once per namespace
//! - [`reconcile`]: idempotent projection of named values onto the tree
//! - [`poll`]: the read → decode → reconcile cycle on a timer
//! - [`tree`]: the object store seam and an in-memory store
//!
//! # Quick Start
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
//! let config = ReconcileConfig::new("SMA");
//!
//! let first = NamedValueMap::new().with("Temperature", 21.5).with("Power Today", 3.2);
//! let second = NamedValueMap::new().with("Temperature", 21.5).with("Power Today", 4.1);
//!
//! reconciler.reconcile(NodeHandle::ROOT, &first, 0, &config)?;
//! reconciler.reconcile(NodeHandle::ROOT, &second, 0, &config)?;
//!
//! let leaves = store.children(NodeHandle::ROOT);
//! assert_eq!(leaves.len(), 2);
//! assert_eq!(leaves[1].value().and_then(|v| v.as_f64()), Some(4.1));
//! # Ok::<(), polltree::Error>(())
//! ```
//!
//! ## Decoding registers
//!
//! ```
//! use polltree::decode::{RegisterFormat, RegisterSpec};
//! use polltree::value::Value;
//!
//! let spec = RegisterSpec::unsigned(30201, 2, RegisterFormat::Enum, "Condition")
//!     .with_label(307, "OK");
//!
//! assert_eq!(polltree::decode::decode(&spec, &[0, 307])?, Some(Value::from("OK")));
//! # Ok::<(), polltree::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod decode;
pub mod error;
pub mod event;
pub mod poll;
pub mod profile;
pub mod reconcile;
pub mod tree;
pub mod unsupported;
pub mod value;

pub use decode::{DecodedValue, DeviceSchema, RegisterFormat, RegisterSpec};
pub use error::{ConfigError, DecodeError, Error, Result, StoreError, TransportError};
pub use event::{EventBus, InstanceEvents, PollEvent};
pub use poll::{InstanceStatus, Poller, PollerConfig, RegisterSource, RegisterTransport, ValueSource};
pub use profile::{ProfileDefinition, ProfileRegistry};
pub use reconcile::{Applied, ReconcileConfig, Reconciler};
pub use tree::{MemoryStore, NodeHandle, ObjectStore};
pub use unsupported::UnsupportedAddresses;
pub use value::{NamedValueMap, Value};
