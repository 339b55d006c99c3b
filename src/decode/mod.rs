// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register decoding.
//!
//! A [`RegisterSpec`] describes where a value lives on a device and how its
//! raw 16-bit words turn into a typed [`Value`]. A [`DeviceSchema`] groups
//! the registers of one device type.
//!
//! # Examples
//!
//! ```
//! use polltree::decode::{RegisterFormat, RegisterSpec};
//! use polltree::value::Value;
//!
//! let spec = RegisterSpec::unsigned(30953, 2, RegisterFormat::Fix1, "Internal temperature");
//! let decoded = spec.decode(&[0x0000, 0x00D7]).unwrap().unwrap();
//!
//! assert_eq!(decoded.name, "Internal temperature");
//! assert_eq!(decoded.value, Value::Float(21.5));
//! ```

mod codec;
mod register;

pub use codec::{RawReading, SUB_WORD_INDEX, decode, extract};
pub use register::{DeviceSchema, Endianness, RegisterFormat, RegisterSpec, Signedness};

use crate::error::DecodeError;
use crate::value::Value;

/// A decoded register value, tagged with its semantic name.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedValue {
    /// The register's semantic name.
    pub name: String,
    /// The decoded value.
    pub value: Value,
}

impl RegisterSpec {
    /// Decodes raw words read from this register.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the words cannot be decoded.
    pub fn decode(&self, words: &[u16]) -> Result<Option<DecodedValue>, DecodeError> {
        Ok(decode(self, words)?.map(|value| DecodedValue {
            name: self.name().to_string(),
            value,
        }))
    }
}
