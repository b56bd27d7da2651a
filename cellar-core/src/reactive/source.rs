//! Reactive sources.
//!
//! The set of things that can be watched or used as a computed dependency is
//! closed: a [`Ref`], a [`ReadonlyRef`] or a [`Computed`]. [`ReactiveSource`]
//! is the shared interface, [`SourceRef`] the tagged variant over the three,
//! and [`MaybeRef`] adds the plain-value case so code can accept "a value or
//! something reactive that holds one".

use std::sync::Arc;

use super::computed::Computed;
use super::effect::{callback, Effect, EffectOptions};
use super::reference::{ReadonlyRef, Ref};
use super::subscriber::{SourceId, Subscribers};
use super::watch::WatchHandle;
use super::Data;

/// Common interface of refs, readonly views and computed refs.
pub trait ReactiveSource: Clone + Send + Sync + 'static {
    /// The type of value the source holds.
    type Value: Data;

    /// Clone out the current value.
    fn get(&self) -> Self::Value;

    /// Identity of the underlying cell.
    fn id(&self) -> SourceId;

    /// Readonly views and computed refs cannot be written through this handle.
    fn is_readonly(&self) -> bool;

    /// Subscriber list effects attach to.
    #[doc(hidden)]
    fn subscribers(&self) -> &Arc<Subscribers<Self::Value>>;
}

impl<T: Data> ReactiveSource for Ref<T> {
    type Value = T;

    fn get(&self) -> T {
        Ref::get(self)
    }

    fn id(&self) -> SourceId {
        Ref::id(self)
    }

    fn is_readonly(&self) -> bool {
        false
    }

    fn subscribers(&self) -> &Arc<Subscribers<T>> {
        Ref::subscribers(self)
    }
}

impl<T: Data> ReactiveSource for ReadonlyRef<T> {
    type Value = T;

    fn get(&self) -> T {
        ReadonlyRef::get(self)
    }

    fn id(&self) -> SourceId {
        ReadonlyRef::id(self)
    }

    fn is_readonly(&self) -> bool {
        true
    }

    fn subscribers(&self) -> &Arc<Subscribers<T>> {
        ReadonlyRef::subscribers(self)
    }
}

impl<T: Data> ReactiveSource for Computed<T> {
    type Value = T;

    fn get(&self) -> T {
        Computed::get(self)
    }

    fn id(&self) -> SourceId {
        Computed::id(self)
    }

    fn is_readonly(&self) -> bool {
        true
    }

    fn subscribers(&self) -> &Arc<Subscribers<T>> {
        Computed::subscribers(self)
    }
}

/// Type-erased view of a source, used for computed dependency lists.
///
/// Sources of different value types can sit in one `&[&dyn Dependency]`.
pub trait Dependency: Send + Sync {
    fn source_id(&self) -> SourceId;

    /// Run `notify` after every change of this source.
    fn on_change(&self, notify: Arc<dyn Fn() + Send + Sync>) -> WatchHandle;
}

impl<S: ReactiveSource> Dependency for S {
    fn source_id(&self) -> SourceId {
        self.id()
    }

    fn on_change(&self, notify: Arc<dyn Fn() + Send + Sync>) -> WatchHandle {
        let subscribers = self.subscribers();
        let effect = Effect::bound(
            callback(move |_: &S::Value, _| notify()),
            EffectOptions::default(),
            subscribers,
        );
        subscribers.add(Arc::clone(&effect));
        WatchHandle::new(effect)
    }
}

/// Tagged variant over the three reactive source kinds.
pub enum SourceRef<T: Data> {
    Ref(Ref<T>),
    Readonly(ReadonlyRef<T>),
    Computed(Computed<T>),
}

impl<T: Data> Clone for SourceRef<T> {
    fn clone(&self) -> Self {
        match self {
            SourceRef::Ref(r) => SourceRef::Ref(r.clone()),
            SourceRef::Readonly(r) => SourceRef::Readonly(r.clone()),
            SourceRef::Computed(c) => SourceRef::Computed(c.clone()),
        }
    }
}

impl<T: Data> ReactiveSource for SourceRef<T> {
    type Value = T;

    fn get(&self) -> T {
        match self {
            SourceRef::Ref(r) => r.get(),
            SourceRef::Readonly(r) => r.get(),
            SourceRef::Computed(c) => c.get(),
        }
    }

    fn id(&self) -> SourceId {
        match self {
            SourceRef::Ref(r) => r.id(),
            SourceRef::Readonly(r) => r.id(),
            SourceRef::Computed(c) => c.id(),
        }
    }

    fn is_readonly(&self) -> bool {
        !matches!(self, SourceRef::Ref(_))
    }

    fn subscribers(&self) -> &Arc<Subscribers<T>> {
        match self {
            SourceRef::Ref(r) => r.subscribers(),
            SourceRef::Readonly(r) => r.subscribers(),
            SourceRef::Computed(c) => c.subscribers(),
        }
    }
}

impl<T: Data> From<Ref<T>> for SourceRef<T> {
    fn from(source: Ref<T>) -> Self {
        SourceRef::Ref(source)
    }
}

impl<T: Data> From<ReadonlyRef<T>> for SourceRef<T> {
    fn from(source: ReadonlyRef<T>) -> Self {
        SourceRef::Readonly(source)
    }
}

impl<T: Data> From<Computed<T>> for SourceRef<T> {
    fn from(source: Computed<T>) -> Self {
        SourceRef::Computed(source)
    }
}

/// Either a plain value or a reactive source holding one.
pub enum MaybeRef<T: Data> {
    Plain(T),
    Source(SourceRef<T>),
}

impl<T: Data> MaybeRef<T> {
    /// Whether this is a reactive source.
    pub fn is_ref(&self) -> bool {
        matches!(self, MaybeRef::Source(_))
    }

    /// The source's current value, or the plain value unchanged.
    pub fn unref(&self) -> T {
        match self {
            MaybeRef::Plain(value) => value.clone(),
            MaybeRef::Source(source) => source.get(),
        }
    }

    /// Make a reactive source out of this.
    ///
    /// Plain values get a fresh [`Ref`]; an existing source is returned as
    /// is, keeping its identity.
    pub fn into_source(self) -> SourceRef<T> {
        match self {
            MaybeRef::Plain(value) => SourceRef::Ref(Ref::new(value)),
            MaybeRef::Source(source) => source,
        }
    }
}

impl<T: Data> From<T> for MaybeRef<T> {
    fn from(value: T) -> Self {
        MaybeRef::Plain(value)
    }
}

impl<T: Data> From<SourceRef<T>> for MaybeRef<T> {
    fn from(source: SourceRef<T>) -> Self {
        MaybeRef::Source(source)
    }
}

/// Whether `value` is a reactive source.
pub fn is_ref<T: Data>(value: &MaybeRef<T>) -> bool {
    value.is_ref()
}

/// Unwrap a reactive source to its value; plain values pass through.
pub fn unref<T: Data>(value: &MaybeRef<T>) -> T {
    value.unref()
}

/// Whether `source` rejects writes through its handle.
pub fn is_readonly<S: ReactiveSource>(source: &S) -> bool {
    source.is_readonly()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::computed;

    #[test]
    fn unref_passes_plain_values_through() {
        let plain: MaybeRef<&str> = "baz".into();
        assert!(!is_ref(&plain));
        assert_eq!(unref(&plain), "baz");
    }

    #[test]
    fn unref_reads_sources() {
        let foo = Ref::new("bar");
        let wrapped: MaybeRef<&str> = SourceRef::from(foo.clone()).into();
        assert!(is_ref(&wrapped));
        assert_eq!(unref(&wrapped), "bar");

        foo.set("baz");
        assert_eq!(unref(&wrapped), "baz");
    }

    #[test]
    fn into_source_keeps_identity() {
        let foo = Ref::new(1);
        let again = MaybeRef::from(SourceRef::from(foo.clone())).into_source();
        assert_eq!(again.id(), foo.id());

        let fresh = MaybeRef::Plain(1).into_source();
        assert_ne!(fresh.id(), foo.id());
        assert!(!fresh.is_readonly());
    }

    #[test]
    fn readonly_classification() {
        let foo = Ref::new(String::from("bar"));
        let foo_clone = foo.clone();
        let baz = computed(&[&foo], move || foo_clone.get() + "baz");

        assert!(!is_readonly(&foo));
        assert!(is_readonly(&foo.readonly()));
        assert!(is_readonly(&baz));
        assert!(SourceRef::from(baz).is_readonly());
    }

    #[test]
    fn dependency_on_change_fires_without_values() {
        let foo = Ref::new(0);
        let hits = Arc::new(std::sync::atomic::AtomicI32::new(0));
        let hits_clone = hits.clone();

        let handle = foo.on_change(Arc::new(move || {
            hits_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));

        foo.set(1);
        handle.stop();
        foo.set(2);

        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
