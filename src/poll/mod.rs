// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polling cycles.
//!
//! A [`Poller`] runs read → decode → reconcile on a timer for one device
//! instance. The reading side is a [`ValueSource`]:
//!
//! - [`RegisterSource`] reads registers through a [`RegisterTransport`] and
//!   decodes them, marking failing addresses unsupported
//! - `JsonHttpSource` (feature `http`) fetches a JSON document over HTTP
//!
//! Errors a source returns abort the cycle and mark the instance
//! unreachable. Failures of single data points never leave the source.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use polltree::decode::DeviceSchema;
//! use polltree::poll::{Poller, PollerConfig, RegisterSource, RegisterTransport};
//! use polltree::profile::ProfileRegistry;
//! use polltree::tree::{MemoryStore, NodeHandle, ObjectStore};
//!
//! # async fn example<T: RegisterTransport + Send + 'static>(transport: T, schema: DeviceSchema) -> polltree::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let instance = store.create_container(NodeHandle::ROOT, "inverter")?;
//!
//! let source = RegisterSource::new(transport, schema).with_default_probe();
//! let mut poller = Poller::new(store, Arc::new(ProfileRegistry::new()), instance, PollerConfig::new("SMA"), source);
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! poller.run(shutdown).await;
//! # Ok(())
//! # }
//! ```

mod config;
#[cfg(feature = "http")]
mod http_source;
mod poller;
mod register_source;
mod status;

pub use config::PollerConfig;
#[cfg(feature = "http")]
pub use http_source::{HttpSourceConfig, JsonHttpSource};
pub use poller::{CycleReport, Poller};
pub use register_source::{RegisterSource, RegisterTransport};
pub use status::InstanceStatus;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::TransportError;
use crate::unsupported::UnsupportedAddresses;
use crate::value::NamedValueMap;

/// Formatting a source suggests for one of its names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHint {
    /// The semantic name.
    pub name: String,
    /// Suggested profile template.
    pub profile: Option<String>,
    /// Whether the name should be logged by the history sink.
    pub archived: bool,
}

/// Produces the named values of one polling cycle.
pub trait ValueSource {
    /// Reads the current values.
    ///
    /// Single reads are bounded by `read_timeout`. Addresses listed as
    /// skippable in `unsupported` are not read; addresses that fail are
    /// marked there and the read continues.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the source as a whole cannot be
    /// read. The cycle is then aborted.
    fn fetch(
        &mut self,
        read_timeout: Duration,
        unsupported: &mut UnsupportedAddresses,
    ) -> impl Future<Output = Result<NamedValueMap, TransportError>> + Send;

    /// Returns formatting hints for the names this source produces.
    fn hints(&self) -> Vec<SourceHint> {
        Vec::new()
    }
}

type BoxedFetch<'a> =
    Pin<Box<dyn Future<Output = Result<NamedValueMap, TransportError>> + Send + 'a>>;

// Object-safe form of `ValueSource`, so one poller can hold sources of
// different types.
pub(crate) trait DynSource: Send {
    fn fetch_boxed<'a>(
        &'a mut self,
        read_timeout: Duration,
        unsupported: &'a mut UnsupportedAddresses,
    ) -> BoxedFetch<'a>;

    fn source_hints(&self) -> Vec<SourceHint>;
}

impl<S: ValueSource + Send> DynSource for S {
    fn fetch_boxed<'a>(
        &'a mut self,
        read_timeout: Duration,
        unsupported: &'a mut UnsupportedAddresses,
    ) -> BoxedFetch<'a> {
        Box::pin(self.fetch(read_timeout, unsupported))
    }

    fn source_hints(&self) -> Vec<SourceHint> {
        self.hints()
    }
}

pub(crate) fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
