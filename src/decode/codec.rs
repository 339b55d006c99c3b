// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw word decoding.
//!
//! Decoding runs in four steps:
//!
//! 1. select the words the format reads
//! 2. reinterpret their bytes as an integer of the register's signedness
//! 3. clamp negative and invalid-marker readings to zero
//! 4. map enum codes to labels, or scale fixed point readings
//!
//! Steps 1 and 2 are exposed as [`extract`] so the pre-clamp reading can be
//! inspected.

use crate::error::DecodeError;
use crate::value::Value;

use super::register::{Endianness, RegisterSpec, Signedness};

/// Index of the word scaled and enum formats read within their register.
pub const SUB_WORD_INDEX: usize = 1;

/// An integer reading before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    value: i128,
    bits: u32,
    signed: bool,
}

impl RawReading {
    /// Returns the integer.
    #[must_use]
    pub fn value(&self) -> i128 {
        self.value
    }

    /// Returns the bit width the integer was read with.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Returns `true` if the reading is the device's "no value" marker.
    ///
    /// Unsigned registers mark missing values with all bits set, signed
    /// registers with the smallest representable value.
    #[must_use]
    pub fn is_invalid_marker(&self) -> bool {
        if self.signed {
            self.value == -(1i128 << (self.bits - 1))
        } else {
            self.value == (1i128 << self.bits) - 1
        }
    }

    fn clamped(self) -> Self {
        if self.value < 0 || self.is_invalid_marker() {
            Self { value: 0, ..self }
        } else {
            self
        }
    }
}

/// Selects the words of `words` the register's format reads.
fn select<'a>(spec: &RegisterSpec, words: &'a [u16]) -> Result<&'a [u16], DecodeError> {
    let count = usize::from(spec.count());
    if words.len() < count {
        return Err(DecodeError::InsufficientWords {
            expected: count,
            got: words.len(),
        });
    }

    if spec.format().uses_sub_word() {
        let index = SUB_WORD_INDEX.min(count.saturating_sub(1));
        return words.get(index..=index).ok_or(DecodeError::InsufficientWords {
            expected: index + 1,
            got: words.len(),
        });
    }

    match count {
        1 | 2 | 4 => Ok(&words[..count]),
        other => Err(DecodeError::UnsupportedWidth(other)),
    }
}

/// Reinterprets the register's words as an integer.
///
/// Returns `Ok(None)` for registers without sign interpretation, which carry
/// no integer and are dropped.
///
/// # Errors
///
/// Returns a [`DecodeError`] if too few words were supplied or the word
/// count is not a supported integer width.
///
/// # Examples
///
/// ```
/// use polltree::decode::{extract, RegisterFormat, RegisterSpec};
///
/// let spec = RegisterSpec::signed(30775, 2, RegisterFormat::Fix0, "Power");
/// let reading = extract(&spec, &[0xFFFF, 0xFFFB]).unwrap().unwrap();
/// assert_eq!(reading.value(), -5);
/// ```
pub fn extract(spec: &RegisterSpec, words: &[u16]) -> Result<Option<RawReading>, DecodeError> {
    let selected = select(spec, words)?;

    let signed = match spec.signedness() {
        Signedness::Signed => true,
        Signedness::Unsigned => false,
        Signedness::None => return Ok(None),
    };

    let mut bytes: Vec<u8> = selected.iter().flat_map(|w| w.to_be_bytes()).collect();
    if spec.endianness() == Endianness::Little {
        bytes.reverse();
    }

    let value = match (bytes.as_slice(), signed) {
        (&[a, b], true) => i128::from(i16::from_be_bytes([a, b])),
        (&[a, b], false) => i128::from(u16::from_be_bytes([a, b])),
        (b, true) if b.len() == 4 => i128::from(i32::from_be_bytes(to_array(b)?)),
        (b, false) if b.len() == 4 => i128::from(u32::from_be_bytes(to_array(b)?)),
        (b, true) if b.len() == 8 => i128::from(i64::from_be_bytes(to_array(b)?)),
        (b, false) if b.len() == 8 => i128::from(u64::from_be_bytes(to_array(b)?)),
        (b, _) => return Err(DecodeError::UnsupportedWidth(b.len() / 2)),
    };

    #[allow(clippy::cast_possible_truncation)]
    let bits = (bytes.len() * 8) as u32;

    Ok(Some(RawReading {
        value,
        bits,
        signed,
    }))
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], DecodeError> {
    bytes
        .try_into()
        .map_err(|_| DecodeError::UnsupportedWidth(bytes.len() / 2))
}

/// Turns a clamped integer into the register's value.
#[allow(clippy::cast_precision_loss)]
fn interpret(spec: &RegisterSpec, raw: i64) -> Value {
    if let Some(label) = spec.label(raw) {
        return Value::Text(label.to_string());
    }
    match spec.format().divisor() {
        Some(divisor) => Value::Float(raw as f64 / divisor),
        None => Value::Int(raw),
    }
}

/// Decodes the raw words of one register read.
///
/// Returns `Ok(None)` if the register carries no integer (signedness
/// [`Signedness::None`]); such values are dropped without error.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the words cannot be decoded. The caller
/// marks the address unsupported.
///
/// # Examples
///
/// ```
/// use polltree::decode::{decode, RegisterFormat, RegisterSpec};
/// use polltree::value::Value;
///
/// let spec = RegisterSpec::unsigned(30977, 2, RegisterFormat::Fix2, "Grid current");
/// assert_eq!(decode(&spec, &[0x0000, 0x04D2]).unwrap(), Some(Value::Float(12.34)));
/// ```
pub fn decode(spec: &RegisterSpec, words: &[u16]) -> Result<Option<Value>, DecodeError> {
    let Some(reading) = extract(spec, words)? else {
        tracing::trace!(
            address = spec.address(),
            name = spec.name(),
            "Register has no integer interpretation, dropping"
        );
        return Ok(None);
    };

    let reading = if spec.clamps_negative() {
        reading.clamped()
    } else {
        reading
    };

    let raw = i64::try_from(reading.value())
        .map_err(|_| DecodeError::OutOfRange(u64::try_from(reading.value()).unwrap_or(u64::MAX)))?;

    Ok(Some(interpret(spec, raw)))
}
