//! Computed Implementation
//!
//! A Computed is a readonly cell whose value is derived from other reactive
//! sources.
//!
//! # How Computed Refs Work
//!
//! 1. The caller declares the sources up front. Nothing is inferred from what
//!    the function reads; a source left out of the list never triggers a
//!    recomputation.
//!
//! 2. The function runs once during construction, so the value is available
//!    as soon as `computed` returns.
//!
//! 3. An internal update closure is subscribed to every declared source.
//!    Whenever one changes, the function runs again eagerly and the new
//!    value is pushed to this computed ref's own subscribers. There is no
//!    dirty flag and no lazy mode.
//!
//! Because a computed ref has subscribers of its own, computed refs can be
//! declared over other computed refs, forming a DAG.
//!
//! # Write Access
//!
//! Only the update closure created alongside the computed ref may write its
//! value. Writes go through `apply_update`, which checks an [`UpdateToken`]
//! minted at construction; a foreign token fails with
//! [`Error::TokenMismatch`]. The token never leaves the crate.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{trace, warn};

use super::source::Dependency;
use super::subscriber::{SourceId, Subscribers};
use super::watch::WatchHandle;
use super::Data;
use crate::error::{Error, Result};

/// Capability that gates writes to one computed ref's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpdateToken(u64);

impl UpdateToken {
    fn mint() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct ComputedInner<T: Data> {
    id: SourceId,
    value: RwLock<T>,
    subscribers: Arc<Subscribers<T>>,
    token: UpdateToken,

    /// Subscriptions on the declared sources, released on drop.
    links: Mutex<Vec<WatchHandle>>,
}

impl<T: Data> ComputedInner<T> {
    fn apply_update(&self, token: &UpdateToken, value: T) -> Result<()> {
        if *token != self.token {
            return Err(Error::TokenMismatch);
        }

        let old = std::mem::replace(&mut *self.value.write(), value.clone());
        self.subscribers.notify(&value, Some(&old));
        Ok(())
    }
}

impl<T: Data> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        for link in self.links.get_mut().drain(..) {
            link.stop();
        }
    }
}

/// A readonly value derived eagerly from declared sources.
///
/// # Example
///
/// ```rust,ignore
/// let foo = Ref::new(String::from("bar"));
/// let foo_clone = foo.clone();
/// let baz = computed(&[&foo], move || foo_clone.get() + "baz");
///
/// assert_eq!(baz.get(), "barbaz");
/// foo.set("baz".into());
/// assert_eq!(baz.get(), "bazbaz");
/// ```
pub struct Computed<T: Data> {
    inner: Arc<ComputedInner<T>>,
}

impl<T: Data> Computed<T> {
    /// Build a computed ref over `sources`.
    ///
    /// `compute` runs immediately, then again after every change of any
    /// source in `sources`.
    pub fn new<F>(sources: &[&dyn Dependency], compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let token = UpdateToken::mint();
        let inner = Arc::new(ComputedInner {
            id: SourceId::next(),
            value: RwLock::new(compute()),
            subscribers: Subscribers::new(),
            token: token.clone(),
            links: Mutex::new(Vec::with_capacity(sources.len())),
        });

        // The closure holds a weak handle so dropping the computed ref
        // releases it even though its sources still reference the closure.
        let weak = Arc::downgrade(&inner);
        let update: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            trace!(computed = ?inner.id, "recomputing");
            let next = compute();
            if let Err(err) = inner.apply_update(&token, next) {
                warn!(computed = ?inner.id, %err, "computed update refused");
            }
        });

        let links: Vec<WatchHandle> = sources
            .iter()
            .map(|source| source.on_change(Arc::clone(&update)))
            .collect();
        *inner.links.lock() = links;

        Self { inner }
    }

    /// Get the computed ref's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get a clone of the last computed value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the last computed value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Number of declared sources still linked.
    pub fn source_count(&self) -> usize {
        self.inner.links.lock().len()
    }

    /// Get the number of dependents.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn subscribers(&self) -> &Arc<Subscribers<T>> {
        &self.inner.subscribers
    }
}

/// Build a computed ref over `sources`. See [`Computed::new`].
pub fn computed<T, F>(sources: &[&dyn Dependency], compute: F) -> Computed<T>
where
    T: Data,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(sources, compute)
}

impl<T: Data> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Data + Debug> Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("source_count", &self.source_count())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
