// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ordered mapping from semantic name to value.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::Value;

/// One item of a [`NamedValueMap`]: a value, or a nested named collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A single value, projected onto a variable.
    Value(Value),
    /// A named collection, projected onto a sub-container.
    Group(NamedValueMap),
}

/// A named item with an optional explicit identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedEntry {
    name: String,
    ident: Option<String>,
    item: Item,
}

impl NamedEntry {
    /// Returns the semantic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the explicit identifier, if one was given.
    #[must_use]
    pub fn ident(&self) -> Option<&str> {
        self.ident.as_deref()
    }

    /// Returns the item.
    #[must_use]
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Returns the value, if the item is not a group.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.item {
            Item::Value(v) => Some(v),
            Item::Group(_) => None,
        }
    }
}

/// Ordered mapping from semantic name to value, produced once per cycle.
///
/// Insertion order is display order. Inserting a name that is already
/// present replaces its item in place and keeps the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedValueMap {
    entries: Vec<NamedEntry>,
}

impl NamedValueMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.put(name.into(), None, Item::Value(value.into()));
    }

    /// Inserts a value whose identity is `ident` rather than its name.
    ///
    /// The display name of such an entry is refreshed on every
    /// reconciliation, so the label can change while the node stays.
    pub fn insert_with_ident(
        &mut self,
        ident: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.put(name.into(), Some(ident.into()), Item::Value(value.into()));
    }

    /// Inserts a nested collection under `name`.
    pub fn insert_group(&mut self, name: impl Into<String>, group: NamedValueMap) {
        self.put(name.into(), None, Item::Group(group));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style [`insert_group`](Self::insert_group).
    #[must_use]
    pub fn with_group(mut self, name: impl Into<String>, group: NamedValueMap) -> Self {
        self.insert_group(name, group);
        self
    }

    // Entries with an explicit identifier are keyed by it, all others by name.
    fn put(&mut self, name: String, ident: Option<String>, item: Item) {
        let existing = self.entries.iter_mut().find(|e| match (&ident, &e.ident) {
            (Some(a), Some(b)) => a == b,
            (None, None) => e.name == name,
            _ => false,
        });
        if let Some(entry) = existing {
            entry.name = name;
            entry.ident = ident;
            entry.item = item;
        } else {
            self.entries.push(NamedEntry { name, ident, item });
        }
    }

    /// Returns the item stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Item> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.item)
    }

    /// Returns the value stored under `name`, if it is not a group.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            Item::Value(v) => Some(v),
            Item::Group(_) => None,
        }
    }

    /// Returns `true` if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of entries at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, NamedEntry> {
        self.entries.iter()
    }

    /// Iterates the names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Merges `other` into this map, keeping existing positions.
    pub fn merge(&mut self, other: NamedValueMap) {
        for entry in other.entries {
            self.put(entry.name, entry.ident, entry.item);
        }
    }

    /// Builds a map from a JSON object.
    ///
    /// Objects become nested groups; arrays and nulls carry no named value
    /// and are dropped. Anything but an object yields an empty map.
    ///
    /// # Examples
    ///
    /// ```
    /// use polltree::value::{Item, NamedValueMap, Value};
    ///
    /// let json = serde_json::json!({"wan_ip": "1.2.3.4", "latency": 12, "camera": {"alim": "on"}});
    /// let map = NamedValueMap::from_json(&json);
    ///
    /// assert_eq!(map.value("latency"), Some(&Value::Int(12)));
    /// assert!(matches!(map.get("camera"), Some(Item::Group(_))));
    /// ```
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        let mut map = Self::new();
        let Some(object) = json.as_object() else {
            return map;
        };

        for (key, value) in object {
            match json_to_item(value) {
                Some(item) => map.put(key.clone(), None, item),
                None => tracing::trace!(key = %key, "Dropping JSON value without a named value"),
            }
        }
        map
    }

    /// Converts the map back into a JSON object, e.g. for logging.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn json_to_item(value: &serde_json::Value) -> Option<Item> {
    use serde_json::Value as Json;

    match value {
        Json::Bool(b) => Some(Item::Value(Value::Bool(*b))),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .map(Item::Value),
        Json::String(s) => Some(Item::Value(Value::Text(s.clone()))),
        Json::Object(_) => Some(Item::Group(NamedValueMap::from_json(value))),
        Json::Array(_) | Json::Null => None,
    }
}

impl<'a> IntoIterator for &'a NamedValueMap {
    type Item = &'a NamedEntry;
    type IntoIter = std::slice::Iter<'a, NamedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for NamedValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for NamedValueMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl Serialize for NamedValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            match &entry.item {
                Item::Value(v) => map.serialize_entry(&entry.name, v)?,
                Item::Group(g) => map.serialize_entry(&entry.name, g)?,
            }
        }
        map.end()
    }
}
