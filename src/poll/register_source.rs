// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register-based value source.

use std::future::Future;
use std::time::Duration;

use crate::decode::DeviceSchema;
use crate::error::TransportError;
use crate::unsupported::UnsupportedAddresses;
use crate::value::NamedValueMap;

use super::{SourceHint, ValueSource, timeout_millis};

/// Reads raw 16-bit words from a device.
pub trait RegisterTransport {
    /// Reads `count` words starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`]. Errors for which
    /// [`TransportError::is_fatal`] holds mean the device is unreachable;
    /// all others concern this address only.
    fn read_words(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;
}

/// Reads and decodes the registers of a [`DeviceSchema`].
///
/// Registers are read in schema order. A register whose read or decode
/// fails is marked unsupported and skipped from the next cycle on; the
/// remaining registers are still read.
#[derive(Debug)]
pub struct RegisterSource<T> {
    transport: T,
    schema: DeviceSchema,
    probe: Option<(u16, u16)>,
}

impl<T: RegisterTransport + Send> RegisterSource<T> {
    /// Register read to check that the device answers at all.
    pub const DEFAULT_PROBE_ADDRESS: u16 = 30051;
    /// Word count of the default probe read.
    pub const DEFAULT_PROBE_COUNT: u16 = 2;

    /// Creates a source without connectivity probe.
    #[must_use]
    pub fn new(transport: T, schema: DeviceSchema) -> Self {
        Self {
            transport,
            schema,
            probe: None,
        }
    }

    /// Reads `count` words at `address` before every cycle.
    ///
    /// Any failure of the probe read makes the device unreachable.
    #[must_use]
    pub fn with_probe(mut self, address: u16, count: u16) -> Self {
        self.probe = Some((address, count));
        self
    }

    /// Uses the default probe register.
    #[must_use]
    pub fn with_default_probe(self) -> Self {
        self.with_probe(Self::DEFAULT_PROBE_ADDRESS, Self::DEFAULT_PROBE_COUNT)
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &DeviceSchema {
        &self.schema
    }

    /// Returns the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    async fn probe(&mut self, read_timeout: Duration) -> Result<(), TransportError> {
        let Some((address, count)) = self.probe else {
            return Ok(());
        };

        match tokio::time::timeout(read_timeout, self.transport.read_words(address, count)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.is_fatal() => Err(e),
            Ok(Err(e)) => Err(TransportError::ConnectionFailed(format!(
                "probe read at {address} failed: {e}"
            ))),
            Err(_) => Err(TransportError::ConnectionFailed(format!(
                "probe read at {address} timed out after {} ms",
                timeout_millis(read_timeout)
            ))),
        }
    }

    async fn read_all(
        &mut self,
        read_timeout: Duration,
        unsupported: &mut UnsupportedAddresses,
    ) -> Result<NamedValueMap, TransportError> {
        self.probe(read_timeout).await?;

        let mut values = NamedValueMap::new();
        for spec in &self.schema {
            let address = spec.address();
            if unsupported.is_skippable(address) {
                tracing::debug!(address, name = spec.name(), "Skipping unsupported address");
                continue;
            }

            let read = tokio::time::timeout(
                read_timeout,
                self.transport.read_words(address, spec.count()),
            )
            .await
            .unwrap_or_else(|_| Err(TransportError::Timeout(timeout_millis(read_timeout))));

            let words = match read {
                Ok(words) => words,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(address, error = %e, "Read failed, marking address unsupported");
                    unsupported.mark_unsupported(address);
                    continue;
                }
            };

            match spec.decode(&words) {
                Ok(Some(decoded)) => values.insert(decoded.name, decoded.value),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(address, error = %e, "Decode failed, marking address unsupported");
                    unsupported.mark_unsupported(address);
                }
            }
        }
        Ok(values)
    }
}

impl<T: RegisterTransport + Send> ValueSource for RegisterSource<T> {
    fn fetch(
        &mut self,
        read_timeout: Duration,
        unsupported: &mut UnsupportedAddresses,
    ) -> impl Future<Output = Result<NamedValueMap, TransportError>> + Send {
        self.read_all(read_timeout, unsupported)
    }

    fn hints(&self) -> Vec<SourceHint> {
        self.schema
            .iter()
            .filter(|spec| spec.profile().is_some() || spec.log_history())
            .map(|spec| SourceHint {
                name: spec.name().to_string(),
                profile: spec.profile().map(str::to_string),
                archived: spec.log_history(),
            })
            .collect()
    }
}
