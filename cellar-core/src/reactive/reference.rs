//! Ref Implementation
//!
//! A Ref is the fundamental reactive primitive: a mutable cell holding one
//! value plus the list of effects subscribed to it.
//!
//! # How Refs Work
//!
//! 1. Reading a ref returns (a clone of) its value and has no side effects.
//!
//! 2. Writing a value equal to the current one is a no-op: no notification,
//!    no subscriber traversal.
//!
//! 3. Writing a different value swaps it in, releases the lock, and then runs
//!    every subscriber with `(new, old)` in subscription order, before the
//!    setter returns.
//!
//! Dependencies are declared, never inferred: reading a ref inside a computed
//! ref's function does not subscribe anything.
//!
//! # Readonly Views
//!
//! [`ReadonlyRef`] shares the ref's state (same ID, same subscriber list) but
//! exposes no setter, so it can be handed out and watched without granting
//! write access.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::subscriber::{SourceId, Subscribers};
use super::Data;
use crate::error::{Error, Result};

/// What a validated ref does with a value its predicate refuses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Drop the write silently.
    #[default]
    Drop,
    /// Fail the write with [`Error::ValidationRejected`] carrying `reason`.
    Reject { reason: String },
}

struct Validator<T> {
    predicate: Box<dyn Fn(&T) -> bool + Send + Sync>,
    policy: ValidationPolicy,
}

/// Shared state behind a [`Ref`] and its readonly views.
pub(crate) struct RefInner<T: Data> {
    id: SourceId,
    value: RwLock<T>,
    subscribers: Arc<Subscribers<T>>,
    validator: Option<Validator<T>>,
}

/// A mutable reactive cell holding a value of type `T`.
///
/// Cloning a `Ref` clones the handle; both handles share the value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Ref<T: Data> {
    inner: Arc<RefInner<T>>,
}

impl<T: Data> Ref<T> {
    /// Create a new ref with the given initial value.
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    /// Create a ref whose writes must satisfy `predicate`.
    ///
    /// The initial value is not checked.
    pub fn with_validator<F>(value: T, predicate: F, policy: ValidationPolicy) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::build(
            value,
            Some(Validator {
                predicate: Box::new(predicate),
                policy,
            }),
        )
    }

    fn build(value: T, validator: Option<Validator<T>>) -> Self {
        Self {
            inner: Arc::new(RefInner {
                id: SourceId::next(),
                value: RwLock::new(value),
                subscribers: Subscribers::new(),
                validator,
            }),
        }
    }

    /// Get the ref's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without cloning it.
    ///
    /// The ref is read-locked while `f` runs; writing to this same ref from
    /// inside `f` would deadlock.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Set a new value and notify subscribers.
    ///
    /// Returns whether the value changed. A write refused by a validator
    /// returns `false`; use [`try_set`](Self::try_set) to observe the refusal.
    pub fn set(&self, value: T) -> bool {
        match self.try_set(value) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(source = ?self.inner.id, %err, "ref write refused");
                false
            }
        }
    }

    /// Set a new value, surfacing validator rejections.
    ///
    /// `Ok(false)` means nothing happened: the value was equal to the current
    /// one, or the validator dropped it.
    pub fn try_set(&self, value: T) -> Result<bool> {
        if let Some(validator) = &self.inner.validator {
            if !(validator.predicate)(&value) {
                return match &validator.policy {
                    ValidationPolicy::Drop => {
                        debug!(source = ?self.inner.id, "validator dropped ref write");
                        Ok(false)
                    }
                    ValidationPolicy::Reject { reason } => Err(Error::ValidationRejected {
                        reason: reason.clone(),
                    }),
                };
            }
        }

        let old = {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return Ok(false);
            }
            std::mem::replace(&mut *guard, value.clone())
        };

        // The lock is released, so subscribers may read or write this ref.
        self.inner.subscribers.notify(&value, Some(&old));
        Ok(true)
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = self.with(f);
        self.set(next)
    }

    /// A readonly view sharing this ref's value and subscribers.
    pub fn readonly(&self) -> ReadonlyRef<T> {
        ReadonlyRef {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub(crate) fn subscribers(&self) -> &Arc<Subscribers<T>> {
        &self.inner.subscribers
    }
}

impl<T: Data> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Data + Debug> Debug for Ref<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a readonly view of `source`.
pub fn readonly<T: Data>(source: &Ref<T>) -> ReadonlyRef<T> {
    source.readonly()
}

/// A readonly view over a [`Ref`].
///
/// Reads and subscriptions go to the underlying ref; there is no setter.
pub struct ReadonlyRef<T: Data> {
    inner: Arc<RefInner<T>>,
}

impl<T: Data> ReadonlyRef<T> {
    /// The ID of the underlying ref.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Whether this view wraps `source`.
    pub fn views(&self, source: &Ref<T>) -> bool {
        Arc::ptr_eq(&self.inner, &source.inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub(crate) fn subscribers(&self) -> &Arc<Subscribers<T>> {
        &self.inner.subscribers
    }
}

impl<T: Data> Clone for ReadonlyRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Data> From<Ref<T>> for ReadonlyRef<T> {
    fn from(source: Ref<T>) -> Self {
        Self { inner: source.inner }
    }
}

impl<T: Data + Debug> Debug for ReadonlyRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadonlyRef")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, EffectOptions};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn count_changes(source: &Ref<i32>) -> Arc<AtomicI32> {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();
        source.subscribers().add(Effect::new(
            move |_: &i32, _| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            },
            EffectOptions::default(),
        ));
        call_count
    }

    #[test]
    fn ref_get_and_set() {
        let source = Ref::new(0);
        assert_eq!(source.get(), 0);

        assert!(source.set(42));
        assert_eq!(source.get(), 42);
    }

    #[test]
    fn ref_update() {
        let source = Ref::new(10);
        source.update(|v| v + 5);
        assert_eq!(source.get(), 15);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let source = Ref::new(7);
        let call_count = count_changes(&source);

        assert!(!source.set(7));
        assert!(!source.set(source.get()));
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        assert!(source.set(8));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribers_see_new_and_old_value() {
        let source = Ref::new(String::from("bar"));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        source.subscribers().add(Effect::new(
            move |value: &String, old| {
                seen_clone.lock().push((value.clone(), old.cloned()));
            },
            EffectOptions::default(),
        ));

        source.set("baz".into());
        source.set("qux".into());

        assert_eq!(
            *seen.lock(),
            vec![
                ("baz".to_string(), Some("bar".to_string())),
                ("qux".to_string(), Some("baz".to_string())),
            ]
        );
    }

    #[test]
    fn ref_clone_shares_state() {
        let ref1 = Ref::new(0);
        let ref2 = ref1.clone();

        ref1.set(42);
        assert_eq!(ref2.get(), 42);
        assert!(ref1.ptr_eq(&ref2));
        assert_eq!(ref1.id(), ref2.id());
    }

    #[test]
    fn ref_ids_are_unique() {
        let r1 = Ref::new(0);
        let r2 = Ref::new(0);
        assert_ne!(r1.id(), r2.id());
        assert!(!r1.ptr_eq(&r2));
    }

    #[test]
    fn readonly_view_tracks_source() {
        let source = Ref::new("bar");
        let view = readonly(&source);

        assert_eq!(view.get(), "bar");
        assert_eq!(view.id(), source.id());
        assert!(view.views(&source));

        source.set("baz");
        assert_eq!(view.get(), "baz");
    }

    #[test]
    fn validator_drop_policy_ignores_write() {
        let source = Ref::with_validator(1, |v: &i32| *v > 0, ValidationPolicy::Drop);
        let call_count = count_changes(&source);

        assert_eq!(source.try_set(-1), Ok(false));
        assert!(!source.set(-5));
        assert_eq!(source.get(), 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        assert_eq!(source.try_set(3), Ok(true));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn validator_reject_policy_fails_write() {
        let source = Ref::with_validator(
            1,
            |v: &i32| *v > 0,
            ValidationPolicy::Reject {
                reason: "must be positive".into(),
            },
        );

        assert_eq!(
            source.try_set(0),
            Err(Error::ValidationRejected {
                reason: "must be positive".into()
            })
        );
        assert_eq!(source.get(), 1);
    }
}
