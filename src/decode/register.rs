// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register descriptions.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the raw register words encode the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegisterFormat {
    /// Plain integer over the register's words.
    Raw,
    /// Fixed point, no decimals.
    Fix0,
    /// Fixed point, one decimal.
    Fix1,
    /// Fixed point, two decimals.
    Fix2,
    /// Fixed point, three decimals.
    Fix3,
    /// Enumerated status code.
    Enum,
}

impl RegisterFormat {
    /// Returns `true` for the formats that read a single trailing sub-word.
    #[must_use]
    pub fn uses_sub_word(self) -> bool {
        !matches!(self, Self::Raw)
    }

    /// Returns the decimal divisor of fixed point formats.
    #[must_use]
    pub fn divisor(self) -> Option<f64> {
        match self {
            Self::Fix0 => Some(1.0),
            Self::Fix1 => Some(10.0),
            Self::Fix2 => Some(100.0),
            Self::Fix3 => Some(1000.0),
            Self::Raw | Self::Enum => None,
        }
    }
}

/// Sign interpretation of the selected bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signedness {
    /// Two's complement signed integer.
    Signed,
    /// Unsigned integer.
    Unsigned,
    /// Not an integer (strings, timestamps, firmware tuples).
    None,
}

/// Byte order used to reinterpret the selected bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Most significant byte first.
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

fn default_clamp() -> bool {
    true
}

/// Description of one device register.
///
/// # Examples
///
/// ```
/// use polltree::decode::{RegisterFormat, RegisterSpec};
///
/// let spec = RegisterSpec::unsigned(30775, 2, RegisterFormat::Fix0, "Power")
///     .with_profile("~Watt.14490")
///     .with_log_history();
///
/// assert_eq!(spec.address(), 30775);
/// assert!(spec.log_history());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSpec {
    address: u16,
    count: u16,
    format: RegisterFormat,
    signedness: Signedness,
    #[serde(default)]
    endianness: Endianness,
    #[serde(default)]
    mapping: BTreeMap<i64, String>,
    name: String,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    log_history: bool,
    #[serde(default = "default_clamp")]
    clamp_negative: bool,
}

impl RegisterSpec {
    /// Creates a raw register without sign interpretation.
    #[must_use]
    pub fn new(address: u16, count: u16, name: impl Into<String>) -> Self {
        Self {
            address,
            count,
            format: RegisterFormat::Raw,
            signedness: Signedness::None,
            endianness: Endianness::Big,
            mapping: BTreeMap::new(),
            name: name.into(),
            profile: None,
            log_history: false,
            clamp_negative: true,
        }
    }

    /// Creates a signed register.
    #[must_use]
    pub fn signed(address: u16, count: u16, format: RegisterFormat, name: impl Into<String>) -> Self {
        Self::new(address, count, name)
            .with_format(format)
            .with_signedness(Signedness::Signed)
    }

    /// Creates an unsigned register.
    #[must_use]
    pub fn unsigned(
        address: u16,
        count: u16,
        format: RegisterFormat,
        name: impl Into<String>,
    ) -> Self {
        Self::new(address, count, name)
            .with_format(format)
            .with_signedness(Signedness::Unsigned)
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: RegisterFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the signedness.
    #[must_use]
    pub fn with_signedness(mut self, signedness: Signedness) -> Self {
        self.signedness = signedness;
        self
    }

    /// Sets the byte order.
    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Adds one code → label pair to the enum table.
    #[must_use]
    pub fn with_label(mut self, code: i64, label: impl Into<String>) -> Self {
        self.mapping.insert(code, label.into());
        self
    }

    /// Adds several code → label pairs to the enum table.
    #[must_use]
    pub fn with_labels<L: Into<String>>(mut self, labels: impl IntoIterator<Item = (i64, L)>) -> Self {
        self.mapping
            .extend(labels.into_iter().map(|(code, label)| (code, label.into())));
        self
    }

    /// Sets the display profile template name.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Enables history logging for the variable this register feeds.
    #[must_use]
    pub fn with_log_history(mut self) -> Self {
        self.log_history = true;
        self
    }

    /// Keeps negative and invalid-marker readings instead of clamping them to zero.
    #[must_use]
    pub fn without_clamp(mut self) -> Self {
        self.clamp_negative = false;
        self
    }

    /// Returns the register address.
    #[must_use]
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Returns the number of words to read.
    #[must_use]
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Returns the format.
    #[must_use]
    pub fn format(&self) -> RegisterFormat {
        self.format
    }

    /// Returns the signedness.
    #[must_use]
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }

    /// Returns the byte order.
    #[must_use]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Returns the label for an enum code.
    #[must_use]
    pub fn label(&self, code: i64) -> Option<&str> {
        self.mapping.get(&code).map(String::as_str)
    }

    /// Returns `true` if the register carries an enum table.
    #[must_use]
    pub fn has_mapping(&self) -> bool {
        !self.mapping.is_empty()
    }

    /// Returns the semantic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the display profile template name.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Returns `true` if history logging is requested.
    #[must_use]
    pub fn log_history(&self) -> bool {
        self.log_history
    }

    /// Returns `true` if negative and invalid-marker readings clamp to zero.
    #[must_use]
    pub fn clamps_negative(&self) -> bool {
        self.clamp_negative
    }
}

/// The registers of one device type, in read order.
///
/// Semantic names are unique within a schema.
///
/// # Examples
///
/// ```
/// use polltree::decode::DeviceSchema;
///
/// let schema = DeviceSchema::from_json(r#"[
///     {"address": 30201, "count": 2, "format": "ENUM", "signedness": "unsigned",
///      "name": "Condition", "mapping": {"35": "Fault", "307": "OK"}},
///     {"address": 30775, "count": 2, "format": "FIX0", "signedness": "signed",
///      "name": "Power", "log_history": true}
/// ]"#).unwrap();
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.get("Condition").unwrap().label(307), Some("OK"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceSchema {
    registers: Vec<RegisterSpec>,
}

impl DeviceSchema {
    /// Creates a schema from registers in read order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateName`] if two registers share a name.
    pub fn new(registers: Vec<RegisterSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for spec in &registers {
            if !seen.insert(spec.name()) {
                return Err(ConfigError::DuplicateName(spec.name().to_string()));
            }
        }
        Ok(Self { registers })
    }

    /// Parses a schema from a JSON array of registers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSchema`] if the JSON is malformed, or
    /// [`ConfigError::DuplicateName`] if two registers share a name.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let registers: Vec<RegisterSpec> =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidSchema(e.to_string()))?;
        Self::new(registers)
    }

    /// Returns the register with the given semantic name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisterSpec> {
        self.registers.iter().find(|r| r.name() == name)
    }

    /// Iterates the registers in read order.
    pub fn iter(&self) -> std::slice::Iter<'_, RegisterSpec> {
        self.registers.iter()
    }

    /// Returns the number of registers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Returns `true` if the schema has no registers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

impl<'a> IntoIterator for &'a DeviceSchema {
    type Item = &'a RegisterSpec;
    type IntoIter = std::slice::Iter<'a, RegisterSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.registers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_divisors() {
        assert_eq!(RegisterFormat::Fix0.divisor(), Some(1.0));
        assert_eq!(RegisterFormat::Fix3.divisor(), Some(1000.0));
        assert_eq!(RegisterFormat::Enum.divisor(), None);
        assert!(!RegisterFormat::Raw.uses_sub_word());
        assert!(RegisterFormat::Enum.uses_sub_word());
    }

    #[test]
    fn builder_defaults() {
        let spec = RegisterSpec::new(30051, 2, "Device class");
        assert_eq!(spec.format(), RegisterFormat::Raw);
        assert_eq!(spec.signedness(), Signedness::None);
        assert_eq!(spec.endianness(), Endianness::Big);
        assert!(spec.clamps_negative());
        assert!(!spec.has_mapping());
    }

    #[test]
    fn labels_accumulate() {
        let spec = RegisterSpec::unsigned(30201, 2, RegisterFormat::Enum, "Condition")
            .with_label(35, "Fault")
            .with_labels([(303, "Off"), (307, "OK")]);

        assert_eq!(spec.label(35), Some("Fault"));
        assert_eq!(spec.label(307), Some("OK"));
        assert_eq!(spec.label(1), None);
    }

    #[test]
    fn deserializes_with_defaults() {
        let spec: RegisterSpec = serde_json::from_str(
            r#"{"address": 30513, "count": 4, "format": "FIX0", "signedness": "unsigned", "name": "Total yield"}"#,
        )
        .unwrap();

        assert_eq!(spec.count(), 4);
        assert!(spec.clamps_negative());
        assert!(!spec.log_history());
        assert_eq!(spec.profile(), None);
    }

    #[test]
    fn schema_rejects_duplicate_names() {
        let err = DeviceSchema::new(vec![
            RegisterSpec::new(1, 1, "A"),
            RegisterSpec::new(2, 1, "A"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateName("A".to_string()));
    }

    #[test]
    fn schema_rejects_malformed_json() {
        let err = DeviceSchema::from_json("[{]").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSchema(_)));
    }
}
