//! Store entries.
//!
//! A store is a fixed map of named entries. Each entry is a reactive source
//! over a JSON value or an action. Only [`Entry::Ref`] accepts writes.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::reactive::{Computed, ReadonlyRef, Ref, SourceRef};

/// Entry map backing a store, in declaration order.
///
/// [`store_to_refs`](super::store_to_refs) hands this map back out with the
/// same cell identities the store uses.
pub type StoreRefs = IndexMap<String, Entry>;

/// A callable store entry.
#[derive(Clone)]
pub struct Action {
    func: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
}

impl Action {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

/// Actions compare by identity.
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Action")
    }
}

/// One named entry of a store.
#[derive(Clone)]
pub enum Entry {
    Ref(Ref<Value>),
    Readonly(ReadonlyRef<Value>),
    Computed(Computed<Value>),
    Action(Action),
}

impl Entry {
    /// Only plain refs can be written through the store.
    pub fn is_settable(&self) -> bool {
        matches!(self, Entry::Ref(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self, Entry::Action(_))
    }

    /// The entry as a watchable source, if it is one.
    pub fn as_source(&self) -> Option<SourceRef<Value>> {
        match self {
            Entry::Ref(r) => Some(SourceRef::Ref(r.clone())),
            Entry::Readonly(r) => Some(SourceRef::Readonly(r.clone())),
            Entry::Computed(c) => Some(SourceRef::Computed(c.clone())),
            Entry::Action(_) => None,
        }
    }

    /// What a façade read returns: the unwrapped value or the action.
    pub fn read(&self) -> Field {
        match self {
            Entry::Ref(r) => Field::Value(r.get()),
            Entry::Readonly(r) => Field::Value(r.get()),
            Entry::Computed(c) => Field::Value(c.get()),
            Entry::Action(action) => Field::Action(action.clone()),
        }
    }
}

impl From<Ref<Value>> for Entry {
    fn from(source: Ref<Value>) -> Self {
        Entry::Ref(source)
    }
}

impl From<ReadonlyRef<Value>> for Entry {
    fn from(source: ReadonlyRef<Value>) -> Self {
        Entry::Readonly(source)
    }
}

impl From<Computed<Value>> for Entry {
    fn from(source: Computed<Value>) -> Self {
        Entry::Computed(source)
    }
}

impl From<Action> for Entry {
    fn from(action: Action) -> Self {
        Entry::Action(action)
    }
}

impl Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Ref(r) => f.debug_tuple("Ref").field(&r.get()).finish(),
            Entry::Readonly(r) => f.debug_tuple("Readonly").field(&r.get()).finish(),
            Entry::Computed(c) => f.debug_tuple("Computed").field(&c.get()).finish(),
            Entry::Action(_) => f.write_str("Action"),
        }
    }
}

/// The result of reading a store property.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    Action(Action),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Action(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Action(_) => None,
        }
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::computed;
    use serde_json::json;

    #[test]
    fn only_refs_are_settable() {
        let foo = Ref::new(json!("foo"));
        let foo_clone = foo.clone();
        let upper = computed(&[&foo], move || {
            json!(foo_clone.get().as_str().unwrap_or_default().to_uppercase())
        });

        assert!(Entry::from(foo.clone()).is_settable());
        assert!(!Entry::from(foo.readonly()).is_settable());
        assert!(!Entry::from(upper).is_settable());
        assert!(!Entry::from(Action::new(|_| Value::Null)).is_settable());
    }

    #[test]
    fn read_unwraps_sources() {
        let foo = Ref::new(json!(1));
        assert_eq!(Entry::from(foo).read(), Field::Value(json!(1)));

        let action = Action::new(|args| json!(args.len()));
        let entry = Entry::from(action.clone());
        assert_eq!(entry.read(), Field::Action(action));
        assert!(entry.as_source().is_none());
    }

    #[test]
    fn actions_compare_by_identity() {
        let a = Action::new(|_| Value::Null);
        let b = Action::new(|_| Value::Null);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.call(&[]), Value::Null);
    }
}
