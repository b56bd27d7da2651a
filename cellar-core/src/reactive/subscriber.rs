//! Subscriber bookkeeping for reactive sources.
//!
//! Every ref and computed ref owns a [`Subscribers`] list: the effects that
//! run when the source's value changes. Lists keep insertion order and hold
//! each effect at most once, keyed by [`EffectId`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::effect::Effect;
use super::Data;

/// Unique identifier for an effect.
///
/// Each effect gets a unique ID when created. The ID is what subscriber lists
/// de-duplicate on and what `stop` uses to detach an effect from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a reactive source (ref or computed ref).
///
/// Readonly views share the ID of the ref they wrap, so identity survives
/// wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Most sources have a handful of watchers.
type EffectList<T> = SmallVec<[Arc<Effect<T>>; 4]>;

/// Ordered, de-duplicated set of effects attached to one source.
pub struct Subscribers<T: Data> {
    effects: RwLock<EffectList<T>>,
}

impl<T: Data> Subscribers<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            effects: RwLock::new(SmallVec::new()),
        })
    }

    /// Append an effect. Returns false if it was already subscribed.
    pub(crate) fn add(&self, effect: Arc<Effect<T>>) -> bool {
        let mut effects = self.effects.write();
        if effects.iter().any(|e| e.id() == effect.id()) {
            return false;
        }
        effects.push(effect);
        true
    }

    /// Detach an effect. Removing an absent effect is a no-op.
    pub(crate) fn remove(&self, id: EffectId) {
        self.effects.write().retain(|e| e.id() != id);
    }

    /// Run every subscriber with the new and previous value.
    ///
    /// Iterates over a snapshot taken before the first callback, so callbacks
    /// may subscribe or stop effects on this same list. Effects stopped during
    /// the traversal see their own `active` flag and skip.
    pub(crate) fn notify(&self, value: &T, old: Option<&T>) {
        let snapshot: EffectList<T> = self.effects.read().clone();
        for effect in snapshot.iter() {
            effect.run(value, old);
        }
    }

    /// Number of attached effects.
    pub fn len(&self) -> usize {
        self.effects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.read().is_empty()
    }

    /// Whether an effect with this ID is attached.
    pub fn contains(&self, id: EffectId) -> bool {
        self.effects.read().iter().any(|e| e.id() == id)
    }
}

impl<T: Data> std::fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}
