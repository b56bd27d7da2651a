//! Store Façade
//!
//! A [`Store`] is a named, fixed set of entries behind a small access-checked
//! API. The entry map is built once; nothing is added or removed afterwards.
//!
//! # Access Rules
//!
//! | operation      | ref        | readonly / computed | action        | missing          |
//! |----------------|------------|---------------------|---------------|------------------|
//! | [`Store::get`] | value      | value               | the action    | `NoSuchProperty` |
//! | [`Store::set`] | written    | `ReadonlyProperty`  | `ReadonlyProperty` | `NoSuchProperty` |
//! | [`Store::patch`] | written  | skipped             | skipped       | skipped          |
//!
//! The names `$patch`, `$raw` and [`RAW_KEY`] belong to the façade itself.
//! Reading `$patch` or `$raw` yields a bound action; writing any of them
//! fails with `ReservedProperty`.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::entry::{Action, Entry, Field, StoreRefs};
use super::snapshot::{RawOptions, Snapshot};
use crate::error::{Error, Result};
use crate::reactive::SourceRef;

/// Façade name of the patch method.
pub const PATCH_KEY: &str = "$patch";

/// Façade name of the snapshot method.
pub const RAW_METHOD_KEY: &str = "$raw";

/// Sentinel name reserved for raw entry access. Use [`Store::refs`] instead.
pub const RAW_KEY: &str = "__cellar_raw";

/// Whether `key` is one of the façade's own names.
pub fn is_reserved(key: &str) -> bool {
    matches!(key, PATCH_KEY | RAW_METHOD_KEY | RAW_KEY)
}

struct StoreInner {
    name: String,
    entries: StoreRefs,
}

/// Handle to a named store. Clones share the same entries.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Build a store over `entries`.
    ///
    /// Fails with [`Error::ReservedProperty`] if an entry uses a façade name.
    pub fn new(name: impl Into<String>, entries: StoreRefs) -> Result<Self> {
        if let Some(key) = entries.keys().find(|key| is_reserved(key)) {
            return Err(Error::ReservedProperty { key: key.clone() });
        }

        Ok(Self {
            inner: Arc::new(StoreInner {
                name: name.into(),
                entries,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Entry names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Read a property.
    ///
    /// Value entries are unwrapped. `$patch` and `$raw` come back as actions
    /// bound to this store.
    pub fn get(&self, key: &str) -> Result<Field> {
        match key {
            PATCH_KEY => Ok(Field::Action(self.patch_action())),
            RAW_METHOD_KEY => Ok(Field::Action(self.raw_action())),
            RAW_KEY => Err(Error::ReservedProperty { key: key.to_string() }),
            _ => self
                .inner
                .entries
                .get(key)
                .map(Entry::read)
                .ok_or_else(|| self.no_such_property(key)),
        }
    }

    /// Read a value entry.
    pub fn value(&self, key: &str) -> Result<Value> {
        match self.get(key)? {
            Field::Value(value) => Ok(value),
            Field::Action(_) => Err(Error::NotAValue {
                store: self.inner.name.clone(),
                key: key.to_string(),
            }),
        }
    }

    /// Write a ref entry. Returns whether the value changed.
    pub fn set(&self, key: &str, value: Value) -> Result<bool> {
        if is_reserved(key) {
            return Err(Error::ReservedProperty { key: key.to_string() });
        }

        match self.inner.entries.get(key) {
            Some(Entry::Ref(cell)) => cell.try_set(value),
            Some(_) => Err(Error::ReadonlyProperty {
                store: self.inner.name.clone(),
                key: key.to_string(),
            }),
            None => Err(self.no_such_property(key)),
        }
    }

    /// Invoke an action entry, or one of the bound façade methods.
    pub fn call(&self, key: &str, args: &[Value]) -> Result<Value> {
        match self.get(key)? {
            Field::Action(action) => Ok(action.call(args)),
            Field::Value(_) => Err(Error::NotAnAction {
                store: self.inner.name.clone(),
                key: key.to_string(),
            }),
        }
    }

    /// The entry under `key` as a watchable source.
    pub fn source(&self, key: &str) -> Result<SourceRef<Value>> {
        let entry = self
            .inner
            .entries
            .get(key)
            .ok_or_else(|| self.no_such_property(key))?;
        entry.as_source().ok_or_else(|| Error::NotAValue {
            store: self.inner.name.clone(),
            key: key.to_string(),
        })
    }

    /// Best-effort bulk write.
    ///
    /// Keys naming ref entries are written in iteration order. Every other
    /// key (readonly, computed, action, reserved or unknown) is skipped.
    /// Returns how many entries changed. A validator rejection stops the
    /// patch; writes before it stay applied.
    pub fn patch<I, K>(&self, partial: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut changed = 0;
        for (key, value) in partial {
            let key = key.as_ref();
            match self.inner.entries.get(key) {
                Some(Entry::Ref(cell)) => {
                    if cell.try_set(value)? {
                        changed += 1;
                    }
                }
                Some(_) => {
                    debug!(store = %self.inner.name, key, "patch skipped non-ref entry");
                }
                None => {
                    debug!(store = %self.inner.name, key, "patch skipped unknown key");
                }
            }
        }
        Ok(changed)
    }

    /// Detached snapshot of the store.
    ///
    /// Value entries are always included; actions only with
    /// [`RawOptions::actions`].
    pub fn raw(&self, options: RawOptions) -> Snapshot {
        let fields = self
            .inner
            .entries
            .iter()
            .filter(|(_, entry)| options.actions || !entry.is_action())
            .map(|(key, entry)| (key.clone(), entry.read()))
            .collect();
        Snapshot::new(fields)
    }

    /// Every entry read through the façade, actions included.
    pub fn spread(&self) -> IndexMap<String, Field> {
        self.inner
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.read()))
            .collect()
    }

    /// The entry map itself, with the cells this store uses.
    pub fn refs(&self) -> StoreRefs {
        self.inner.entries.clone()
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn patch_action(&self) -> Action {
        let store = self.clone();
        Action::new(move |args| {
            let Some(Value::Object(partial)) = args.first() else {
                return Value::Null;
            };
            match store.patch(partial.clone()) {
                Ok(changed) => Value::from(changed),
                Err(err) => {
                    warn!(store = %store.inner.name, %err, "bound patch failed");
                    Value::Null
                }
            }
        })
    }

    fn raw_action(&self) -> Action {
        let store = self.clone();
        Action::new(move |args| {
            let options = args
                .first()
                .and_then(|arg| serde_json::from_value::<RawOptions>(arg.clone()).ok())
                .unwrap_or_default();
            store.raw(options).to_json()
        })
    }

    fn no_such_property(&self, key: &str) -> Error {
        Error::NoSuchProperty {
            store: self.inner.name.clone(),
            key: key.to_string(),
        }
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.name)
            .field("entries", &self.inner.entries)
            .finish()
    }
}

/// The entry map behind `store`, sharing cell identity with it.
pub fn store_to_refs(store: &Store) -> StoreRefs {
    store.refs()
}
