//! Effect Implementation
//!
//! An Effect wraps a callback together with the policy for running it. It is
//! the unit that sits in a source's subscriber list.
//!
//! # Lifecycle
//!
//! An effect starts active and moves to stopped exactly once. Stopping is
//! one-way and idempotent; it also detaches the effect from the source it was
//! bound to, if any.
//!
//! # Policy
//!
//! - `sync` (default): the callback runs inline, before the setter returns.
//! - `sync = false`: the callback is queued as a microtask and runs at the
//!   next checkpoint (see [`flush_microtasks`](super::flush_microtasks)).
//!   A deferred callback re-checks the effect when it runs and does nothing
//!   if the effect was stopped in the meantime.
//! - `once`: the first run claims the effect and retires it before the
//!   callback fires, so reentrant writes from the callback cannot run it twice.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::microtask::queue_microtask;
use super::subscriber::{EffectId, Subscribers};
use super::Data;

/// Signature of an effect callback: `(new_value, old_value)`.
///
/// `old_value` is `None` only for the immediate first run of a watcher.
pub type EffectCallback<T> = dyn Fn(&T, Option<&T>) + Send + Sync;

/// Box a closure as an effect callback.
///
/// Passing the closure through a generic bound lets the compiler infer the
/// higher-ranked signature without annotations at the call site.
pub(crate) fn callback<T, F>(f: F) -> Arc<EffectCallback<T>>
where
    T: Data,
    F: Fn(&T, Option<&T>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Run policy for an [`Effect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectOptions {
    /// Stop after the first run.
    pub once: bool,
    /// Run inline (`true`) or defer to the microtask queue (`false`).
    pub sync: bool,
}

impl Default for EffectOptions {
    fn default() -> Self {
        Self {
            once: false,
            sync: true,
        }
    }
}

/// A callback bound to a reactive source.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
/// let effect = Effect::new(|value, old| println!("{old:?} -> {value}"), EffectOptions::default());
/// effect.run(&1, Some(&0));
/// effect.stop();
/// ```
pub struct Effect<T: Data> {
    /// Unique identifier for this effect.
    id: EffectId,

    /// The user callback.
    callback: Arc<EffectCallback<T>>,

    options: EffectOptions,

    /// Accepting new runs.
    active: AtomicBool,

    /// Stopped by the owner. Deferred runs check this before firing.
    cancelled: AtomicBool,

    /// Subscriber list of the source this effect is bound to.
    source: Option<Weak<Subscribers<T>>>,

    /// Number of times the callback has fired.
    run_count: AtomicUsize,
}

impl<T: Data> Effect<T> {
    /// Create a free-standing effect, not bound to any source.
    pub fn new<F>(callback: F, options: EffectOptions) -> Arc<Self>
    where
        F: Fn(&T, Option<&T>) + Send + Sync + 'static,
    {
        Arc::new(Self::build(Arc::new(callback), options, None))
    }

    /// Create an effect that knows its source, so `stop` can detach it.
    pub(crate) fn bound(
        callback: Arc<EffectCallback<T>>,
        options: EffectOptions,
        source: &Arc<Subscribers<T>>,
    ) -> Arc<Self> {
        Arc::new(Self::build(callback, options, Some(Arc::downgrade(source))))
    }

    fn build(
        callback: Arc<EffectCallback<T>>,
        options: EffectOptions,
        source: Option<Weak<Subscribers<T>>>,
    ) -> Self {
        Self {
            id: EffectId::new(),
            callback,
            options,
            active: AtomicBool::new(true),
            cancelled: AtomicBool::new(false),
            source,
            run_count: AtomicUsize::new(0),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn options(&self) -> EffectOptions {
        self.options
    }

    /// Run the effect with a new and previous value.
    ///
    /// No-op once the effect is stopped.
    pub fn run(self: &Arc<Self>, value: &T, old: Option<&T>) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        if self.options.once {
            // Claim the single run; a concurrent or reentrant run loses.
            if self
                .active
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            self.detach();
        }

        if self.options.sync {
            self.fire(value, old);
        } else {
            let effect = Arc::clone(self);
            let value = value.clone();
            let old = old.cloned();
            queue_microtask(move || {
                if !effect.cancelled.load(Ordering::SeqCst) {
                    effect.fire(&value, old.as_ref());
                }
            });
        }
    }

    fn fire(&self, value: &T, old: Option<&T>) {
        self.run_count.fetch_add(1, Ordering::SeqCst);
        (self.callback)(value, old);
    }

    /// Stop the effect and detach it from its source.
    ///
    /// Idempotent. Deferred runs queued before the stop become no-ops.
    pub fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if self.active.swap(false, Ordering::SeqCst) {
            trace!(effect = ?self.id, "effect stopped");
        }
        self.detach();
    }

    fn detach(&self) {
        if let Some(source) = self.source.as_ref().and_then(Weak::upgrade) {
            source.remove(self.id);
        }
    }

    /// Whether the effect still accepts runs.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Get the number of times the callback has fired.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }
}

impl<T: Data> std::fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("active", &self.is_active())
            .field("run_count", &self.run_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
