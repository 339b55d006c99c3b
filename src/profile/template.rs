// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Profile definitions and the built-in templates.

use serde::{Deserialize, Serialize};

use crate::tree::VariableType;
use crate::value::Value;

/// One value → label association of a discrete profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    /// The associated value.
    pub value: Value,
    /// The label shown for the value.
    pub label: String,
    /// Optional icon shown for the value.
    #[serde(default)]
    pub icon: Option<String>,
    /// Optional RGB color, `None` for the host default.
    #[serde(default)]
    pub color: Option<u32>,
}

/// A shared formatting rule attached to variables.
///
/// # Examples
///
/// ```
/// use polltree::profile::ProfileDefinition;
/// use polltree::tree::VariableType;
///
/// let profile = ProfileDefinition::new("NetatmoWeather.CO2", VariableType::Integer)
///     .with_suffix(" ppm")
///     .with_icon("Gauge");
///
/// assert_eq!(profile.suffix, " ppm");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    /// Namespaced identifier, unique in the profile store.
    pub id: String,
    /// Storage type of the variables using the profile.
    pub value_type: VariableType,
    /// Number of decimal digits.
    #[serde(default)]
    pub digits: u8,
    /// Text shown before the value.
    #[serde(default)]
    pub prefix: String,
    /// Text shown after the value.
    #[serde(default)]
    pub suffix: String,
    /// Icon name.
    #[serde(default)]
    pub icon: Option<String>,
    /// Discrete value → label table.
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl ProfileDefinition {
    /// Creates an unformatted profile.
    #[must_use]
    pub fn new(id: impl Into<String>, value_type: VariableType) -> Self {
        Self {
            id: id.into(),
            value_type,
            digits: 0,
            prefix: String::new(),
            suffix: String::new(),
            icon: None,
            associations: Vec::new(),
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the number of decimal digits.
    #[must_use]
    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    /// Sets the text shown before the value.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the text shown after the value.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sets the icon.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Adds a value → label association.
    #[must_use]
    pub fn with_association(mut self, value: impl Into<Value>, label: impl Into<String>) -> Self {
        self.associations.push(Association {
            value: value.into(),
            label: label.into(),
            icon: None,
            color: None,
        });
        self
    }

    /// Returns the label associated with `value`.
    #[must_use]
    pub fn label_for(&self, value: &Value) -> Option<&str> {
        self.associations
            .iter()
            .find(|a| &a.value == value)
            .map(|a| a.label.as_str())
    }
}

/// The built-in profile templates, selected by semantic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileTemplate {
    /// Currency amount, two digits.
    Price,
    /// Network latency in milliseconds.
    Latency,
    /// Upload throughput in MBit.
    UploadRate,
    /// Download throughput in MBit.
    DownloadRate,
    /// Absent / present.
    Presence,
    /// Unknown / OK.
    Status,
}

impl ProfileTemplate {
    /// All built-in templates.
    pub const ALL: [Self; 6] = [
        Self::Price,
        Self::Latency,
        Self::UploadRate,
        Self::DownloadRate,
        Self::Presence,
        Self::Status,
    ];

    /// Returns the template registered under `name`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Returns the semantic name selecting this template.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Price => "Price",
            Self::Latency => "Latency",
            Self::UploadRate => "MBit.Upload",
            Self::DownloadRate => "MBit.Download",
            Self::Presence => "Presence",
            Self::Status => "Status",
        }
    }

    /// Builds the definition of this template under `id`.
    #[must_use]
    pub fn definition(self, id: impl Into<String>) -> ProfileDefinition {
        match self {
            Self::Price => ProfileDefinition::new(id, VariableType::Float)
                .with_digits(2)
                .with_suffix(" €")
                .with_icon("Euro"),
            Self::Latency => ProfileDefinition::new(id, VariableType::Integer)
                .with_suffix(" ms")
                .with_icon("Graph"),
            Self::UploadRate => ProfileDefinition::new(id, VariableType::Float)
                .with_digits(2)
                .with_suffix(" MBit")
                .with_icon("HollowArrowUp"),
            Self::DownloadRate => ProfileDefinition::new(id, VariableType::Float)
                .with_digits(2)
                .with_suffix(" MBit")
                .with_icon("HollowArrowDown"),
            Self::Presence => ProfileDefinition::new(id, VariableType::Boolean)
                .with_association(false, "absent")
                .with_association(true, "present"),
            Self::Status => ProfileDefinition::new(id, VariableType::Boolean)
                .with_association(false, "?")
                .with_association(true, "OK"),
        }
    }
}
