//! Detached store snapshots.
//!
//! A [`Snapshot`] is what `$raw` returns: every entry's value copied out of
//! the store at one point in time. It shares nothing with the live cells, so
//! it can be cloned, sent across threads or serialized freely.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::Field;

/// Options for [`Store::raw`](super::Store::raw).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    /// Include action entries in the snapshot.
    pub actions: bool,
}

impl RawOptions {
    pub fn with_actions() -> Self {
        Self { actions: true }
    }
}

/// Plain copy of a store's entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    fields: IndexMap<String, Field>,
}

impl Snapshot {
    pub(crate) fn new(fields: IndexMap<String, Field>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// The value under `key`, if it is a value entry.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).and_then(Field::as_value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> IndexMap<String, Field> {
        self.fields
    }

    /// JSON object of the value entries. Actions are left out.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .filter_map(|(key, field)| field.as_value().map(|v| (key.clone(), v.clone())))
                .collect(),
        )
    }

    /// MessagePack encoding of the value entries.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }
}

impl PartialEq<IndexMap<String, Field>> for Snapshot {
    fn eq(&self, other: &IndexMap<String, Field>) -> bool {
        self.fields == *other
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<(&String, &Value)> = self
            .fields
            .iter()
            .filter_map(|(key, field)| field.as_value().map(|v| (key, v)))
            .collect();

        let mut map = serializer.serialize_map(Some(values.len()))?;
        for (key, value) in values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
