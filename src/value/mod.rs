// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed values and ordered named-value maps.
//!
//! Every data source, binary or not, ends up producing a [`NamedValueMap`]:
//! an ordered mapping from semantic name to a [`Value`]. The value's variant
//! is decided once, where the data enters the library, so the reconciler
//! never has to inspect runtime types.
//!
//! # Examples
//!
//! ```
//! use polltree::value::{NamedValueMap, Value};
//!
//! let mut map = NamedValueMap::new();
//! map.insert("Temperature", 21.5);
//! map.insert("Status", "OK");
//!
//! assert_eq!(map.value("Temperature"), Some(&Value::Float(21.5)));
//! assert_eq!(map.names().collect::<Vec<_>>(), ["Temperature", "Status"]);
//! ```

mod named_map;

pub use named_map::{Item, NamedEntry, NamedValueMap};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::VariableType;

/// A typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns the storage type a new variable holding this value gets.
    #[must_use]
    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::Bool(_) => VariableType::Boolean,
            Self::Int(_) => VariableType::Integer,
            Self::Float(_) => VariableType::Float,
            Self::Text(_) => VariableType::String,
        }
    }

    /// Returns the value a freshly created variable of `value_type` holds.
    #[must_use]
    pub fn default_for(value_type: VariableType) -> Self {
        match value_type {
            VariableType::Boolean => Self::Bool(false),
            VariableType::Integer => Self::Int(0),
            VariableType::Float => Self::Float(0.0),
            VariableType::String => Self::Text(String::new()),
        }
    }

    /// Converts the value to `value_type` the way the host does on write.
    ///
    /// Unparseable text becomes zero; floats are truncated towards zero.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn coerce(self, value_type: VariableType) -> Self {
        match (value_type, self) {
            (VariableType::Boolean, Self::Bool(b)) => Self::Bool(b),
            (VariableType::Boolean, Self::Int(i)) => Self::Bool(i != 0),
            (VariableType::Boolean, Self::Float(f)) => Self::Bool(f != 0.0),
            (VariableType::Boolean, Self::Text(s)) => {
                let s = s.trim();
                Self::Bool(!s.is_empty() && s != "0")
            }

            (VariableType::Integer, Self::Bool(b)) => Self::Int(i64::from(b)),
            (VariableType::Integer, Self::Int(i)) => Self::Int(i),
            (VariableType::Integer, Self::Float(f)) => Self::Int(f as i64),
            (VariableType::Integer, Self::Text(s)) => {
                let s = s.trim();
                let parsed = s
                    .parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64));
                Self::Int(parsed.unwrap_or(0))
            }

            (VariableType::Float, Self::Bool(b)) => Self::Float(if b { 1.0 } else { 0.0 }),
            (VariableType::Float, Self::Int(i)) => Self::Float(i as f64),
            (VariableType::Float, Self::Float(f)) => Self::Float(f),
            (VariableType::Float, Self::Text(s)) => {
                Self::Float(s.trim().parse::<f64>().unwrap_or(0.0))
            }

            (VariableType::String, Self::Text(s)) => Self::Text(s),
            (VariableType::String, other) => Self::Text(other.to_string()),
        }
    }

    /// Returns the value with surrounding whitespace removed from text.
    #[must_use]
    pub fn trimmed(self) -> Self {
        match self {
            Self::Text(s) if s.trim().len() != s.len() => Self::Text(s.trim().to_string()),
            other => other,
        }
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the number as a float, if this is an integer or a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
