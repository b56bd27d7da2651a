//! Store Registry
//!
//! Maps store names to [`Store`]s. A registry is an ordinary value: create
//! one, share it however the application likes, and drop it to tear every
//! store down. There is no process-wide default.
//!
//! # Deferred Patches
//!
//! [`Registry::use_store_with`] returns the store right away and applies the
//! patch produced by its function later, at the next microtask checkpoint
//! (see [`flush_microtasks`](crate::reactive::flush_microtasks)).
//! [`Registry::use_store_with_async`] does the same with an async function
//! spawned on the current tokio runtime. The function itself only runs
//! inside the spawned task, never before the call returns. The task drains
//! the microtask queue of the worker it ran on, so deferred watchers of the
//! patched entries run there instead of waiting on a queue nobody flushes.

use std::future::Future;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::entry::StoreRefs;
use super::facade::Store;
use crate::error::{Error, Result};
use crate::reactive::{flush_microtasks, queue_microtask};

/// Partial state applied by a deferred patch.
pub type Patch = Map<String, Value>;

/// Registry of named stores.
#[derive(Default)]
pub struct Registry {
    stores: DashMap<String, Store>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store built from `entries`.
    pub fn define(&self, name: impl Into<String>, entries: StoreRefs) -> Result<UseStore> {
        self.define_with(name, move || entries)
    }

    /// Register a store built by `setup`.
    ///
    /// `setup` runs once, and only if the name is free. It runs outside the
    /// map's locks, so it may use this registry itself.
    pub fn define_with<F>(&self, name: impl Into<String>, setup: F) -> Result<UseStore>
    where
        F: FnOnce() -> StoreRefs,
    {
        let name = name.into();
        if self.stores.contains_key(&name) {
            return Err(Error::DuplicateStore { name });
        }

        let store = Store::new(name.clone(), setup())?;

        match self.stores.entry(name) {
            MapEntry::Occupied(slot) => Err(Error::DuplicateStore {
                name: slot.key().clone(),
            }),
            MapEntry::Vacant(slot) => {
                debug!(store = %slot.key(), entries = store.len(), "store defined");
                slot.insert(store.clone());
                Ok(UseStore { store })
            }
        }
    }

    /// Look up a store by name.
    pub fn use_store(&self, name: &str) -> Result<Store> {
        self.stores
            .get(name)
            .map(|store| store.value().clone())
            .ok_or_else(|| Error::StoreNotDefined {
                name: name.to_string(),
            })
    }

    /// Look up a store and schedule `patch_fn` for the next microtask
    /// checkpoint. A `Some` result is patched into the store.
    pub fn use_store_with<F>(&self, name: &str, patch_fn: F) -> Result<Store>
    where
        F: FnOnce() -> Option<Patch> + 'static,
    {
        let store = self.use_store(name)?;
        defer_patch(&store, patch_fn);
        Ok(store)
    }

    /// Look up a store and spawn `patch_fn` on the current tokio runtime.
    /// A `Some` result is patched into the store when the future completes.
    ///
    /// Fails with [`Error::NoRuntime`] outside a runtime.
    pub fn use_store_with_async<F, Fut>(&self, name: &str, patch_fn: F) -> Result<Store>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Option<Patch>> + Send + 'static,
    {
        let store = self.use_store(name)?;
        spawn_patch(&store, patch_fn)?;
        Ok(store)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.iter().map(|item| item.key().clone()).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("stores", &self.names())
            .finish()
    }
}

/// Accessor returned by [`Registry::define`].
#[derive(Debug, Clone)]
pub struct UseStore {
    store: Store,
}

impl UseStore {
    pub fn get(&self) -> Store {
        self.store.clone()
    }

    /// [`get`](Self::get) plus a deferred patch, as [`Registry::use_store_with`].
    pub fn get_with<F>(&self, patch_fn: F) -> Store
    where
        F: FnOnce() -> Option<Patch> + 'static,
    {
        defer_patch(&self.store, patch_fn);
        self.get()
    }

    /// [`get`](Self::get) plus an async patch, as [`Registry::use_store_with_async`].
    pub fn get_with_async<F, Fut>(&self, patch_fn: F) -> Result<Store>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Option<Patch>> + Send + 'static,
    {
        spawn_patch(&self.store, patch_fn)?;
        Ok(self.get())
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }
}

fn apply_patch(store: &Store, partial: Option<Patch>) {
    let Some(partial) = partial else {
        return;
    };
    if let Err(err) = store.patch(partial) {
        warn!(store = %store.name(), %err, "deferred patch failed");
    }
}

fn defer_patch<F>(store: &Store, patch_fn: F)
where
    F: FnOnce() -> Option<Patch> + 'static,
{
    let store = store.clone();
    queue_microtask(move || apply_patch(&store, patch_fn()));
}

fn spawn_patch<F, Fut>(store: &Store, patch_fn: F) -> Result<()>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Option<Patch>> + Send + 'static,
{
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
    let store = store.clone();
    runtime.spawn(async move {
        let partial = patch_fn().await;
        apply_patch(&store, partial);
        flush_microtasks();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{flush_microtasks, Ref};
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn entries() -> StoreRefs {
        let mut entries = StoreRefs::new();
        entries.insert("foo".into(), Ref::new(json!("foo")).into());
        entries.insert("bar".into(), Ref::new(json!("bar")).into());
        entries
    }

    fn patch(value: Value) -> Option<Patch> {
        match value {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[test]
    fn define_and_use() {
        let registry = Registry::new();
        let use_store = registry.define("main", entries()).unwrap();

        let store = registry.use_store("main").unwrap();
        assert!(store.ptr_eq(&use_store.get()));
        assert_eq!(use_store.name(), "main");
        assert!(registry.contains("main"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_define_fails_without_running_setup() {
        let registry = Registry::new();
        registry.define("main", entries()).unwrap();

        let mut ran = false;
        let err = registry
            .define_with("main", || {
                ran = true;
                entries()
            })
            .unwrap_err();

        assert_eq!(err, Error::DuplicateStore { name: "main".into() });
        assert!(!ran);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn undefined_store() {
        let registry = Registry::new();
        let err = registry.use_store("nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(registry.use_store_with("nope", || None).is_err());
    }

    #[test]
    fn reserved_entry_leaves_registry_untouched() {
        let registry = Registry::new();
        let mut bad = StoreRefs::new();
        bad.insert("$raw".into(), Ref::new(json!(0)).into());

        assert!(matches!(
            registry.define("bad", bad),
            Err(Error::ReservedProperty { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn deferred_patch_waits_for_checkpoint() {
        let registry = Registry::new();
        registry.define("main", entries()).unwrap();

        let store = registry
            .use_store_with("main", || patch(json!({"foo": "baz"})))
            .unwrap();
        assert_eq!(store.value("foo").unwrap(), json!("foo"));

        flush_microtasks();
        assert_eq!(store.value("foo").unwrap(), json!("baz"));
        assert_eq!(store.value("bar").unwrap(), json!("bar"));
    }

    #[test]
    fn none_patch_is_ignored() {
        let registry = Registry::new();
        let use_store = registry.define("main", entries()).unwrap();
        let store = use_store.get_with(|| None);
        flush_microtasks();
        assert_eq!(store.value("foo").unwrap(), json!("foo"));
    }

    #[tokio::test]
    async fn async_patch_applies_later() {
        let registry = Registry::new();
        registry.define("main", entries()).unwrap();

        let store = registry
            .use_store_with_async("main", || async { patch(json!({"bar": "qux"})) })
            .unwrap();
        assert_eq!(store.value("bar").unwrap(), json!("bar"));

        for _ in 0..10 {
            if store.value("bar").unwrap() == json!("qux") {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(store.value("bar").unwrap(), json!("qux"));
    }

    #[tokio::test]
    async fn async_patch_fn_runs_after_return() {
        let registry = Registry::new();
        let use_store = registry.define("main", entries()).unwrap();
        let calls = Arc::new(AtomicI32::new(0));
        let seen = calls.clone();

        let store = use_store
            .get_with_async(move || {
                seen.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        for _ in 0..10 {
            if calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.value("foo").unwrap(), json!("foo"));
    }

    #[test]
    fn async_patch_without_runtime_fails() {
        let registry = Registry::new();
        let use_store = registry.define("main", entries()).unwrap();
        let calls = Arc::new(AtomicI32::new(0));

        let seen = calls.clone();
        let err = registry
            .use_store_with_async("main", move || {
                seen.fetch_add(1, Ordering::SeqCst);
                async { patch(json!({"foo": "baz"})) }
            })
            .unwrap_err();
        assert_eq!(err, Error::NoRuntime);

        let seen = calls.clone();
        let err = use_store
            .get_with_async(move || {
                seen.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .unwrap_err();
        assert_eq!(err, Error::NoRuntime);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(use_store.get().value("foo").unwrap(), json!("foo"));
    }

    #[test]
    fn names_are_sorted() {
        let registry = Registry::new();
        registry.define("b", entries()).unwrap();
        registry.define("a", StoreRefs::new()).unwrap();
        assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);
    }
}
