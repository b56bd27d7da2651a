//! Watchers
//!
//! `watch` is the public way to run code when a source changes: it builds an
//! [`Effect`], attaches it to the source and hands back a [`WatchHandle`]
//! whose `stop` is the only cancellation primitive.
//!
//! The variants are thin presets over [`WatchOptions`]:
//!
//! | function             | immediate | once | sync  | truthy only |
//! |----------------------|-----------|------|-------|-------------|
//! | `watch_immediate`    | yes       |      |       |             |
//! | `watch_once`         |           | yes  |       |             |
//! | `watch_async`        |           |      | no    |             |
//! | `whenever`           |           |      |       | yes         |
//! | `whenever_async`     |           |      | no    | yes         |
//! | `whenever_immediate` | yes       |      |       | yes         |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::effect::{callback, Effect, EffectOptions};
use super::source::ReactiveSource;
use super::Data;

/// Options accepted by [`watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Run the callback right away with `(current, None)`.
    pub immediate: bool,
    /// Stop after the first run.
    pub once: bool,
    /// Run inline (`true`) or on the microtask queue (`false`).
    pub sync: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            immediate: false,
            once: false,
            sync: true,
        }
    }
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    fn effect_options(&self) -> EffectOptions {
        EffectOptions {
            once: self.once,
            sync: self.sync,
        }
    }
}

/// Object-safe stop interface over effects of any value type.
trait Stop: Send + Sync {
    fn stop(&self);
    fn is_active(&self) -> bool;
}

impl<T: Data> Stop for Effect<T> {
    fn stop(&self) {
        Effect::stop(self)
    }

    fn is_active(&self) -> bool {
        Effect::is_active(self)
    }
}

/// Disposer returned by [`watch`].
///
/// Dropping the handle does not stop the watcher; call [`stop`](Self::stop).
#[derive(Clone)]
pub struct WatchHandle {
    effect: Arc<dyn Stop>,
}

impl WatchHandle {
    pub(crate) fn new<T: Data>(effect: Arc<Effect<T>>) -> Self {
        Self { effect }
    }

    /// Stop the watcher. Synchronous, immediate and idempotent.
    pub fn stop(&self) {
        self.effect.stop();
    }

    /// Whether the watcher can still fire.
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Watch `source` and run `callback(new, old)` when it changes.
///
/// With `immediate`, the callback also runs before `watch` returns, with
/// `old = None`.
pub fn watch<S, F>(source: &S, callback_fn: F, options: WatchOptions) -> WatchHandle
where
    S: ReactiveSource,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    let subscribers = source.subscribers();
    let effect = Effect::bound(callback(callback_fn), options.effect_options(), subscribers);
    subscribers.add(Arc::clone(&effect));

    if options.immediate {
        effect.run(&source.get(), None);
    }

    WatchHandle::new(effect)
}

/// [`watch`] with `immediate` set.
pub fn watch_immediate<S, F>(source: &S, callback: F) -> WatchHandle
where
    S: ReactiveSource,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    watch(source, callback, WatchOptions::new().immediate(true))
}

/// [`watch`] that fires at most once.
pub fn watch_once<S, F>(source: &S, callback: F) -> WatchHandle
where
    S: ReactiveSource,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    watch(source, callback, WatchOptions::new().once(true))
}

/// [`watch`] with the callback deferred to the microtask queue.
pub fn watch_async<S, F>(source: &S, callback: F) -> WatchHandle
where
    S: ReactiveSource,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    watch(source, callback, WatchOptions::new().sync(false))
}

/// JavaScript-style truthiness, used by the `whenever` family and `until`.
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl Truthy for serde_json::Value {
    fn is_truthy(&self) -> bool {
        use serde_json::Value;
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f.is_truthy()),
            Value::String(s) => !s.is_empty(),
            // Arrays and objects are truthy even when empty
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

/// [`watch`] that only calls back when the new value is truthy.
pub fn whenever<S, F>(source: &S, callback: F, options: WatchOptions) -> WatchHandle
where
    S: ReactiveSource,
    S::Value: Truthy,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    watch(
        source,
        move |value: &S::Value, old| {
            if value.is_truthy() {
                callback(value, old);
            }
        },
        options,
    )
}

/// [`whenever`] with the callback deferred to the microtask queue.
pub fn whenever_async<S, F>(source: &S, callback: F) -> WatchHandle
where
    S: ReactiveSource,
    S::Value: Truthy,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    whenever(source, callback, WatchOptions::new().sync(false))
}

/// [`whenever`] that also checks the current value right away.
pub fn whenever_immediate<S, F>(source: &S, callback: F) -> WatchHandle
where
    S: ReactiveSource,
    S::Value: Truthy,
    F: Fn(&S::Value, Option<&S::Value>) + Send + Sync + 'static,
{
    whenever(source, callback, WatchOptions::new().immediate(true))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{computed, flush_microtasks, Ref};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counter() -> Arc<AtomicI32> {
        Arc::new(AtomicI32::new(0))
    }

    #[test]
    fn watch_fires_on_each_change() {
        let foo = Ref::new("bar");
        let count = counter();
        let c = count.clone();

        watch(
            &foo,
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            },
            WatchOptions::default(),
        );
        assert_eq!(count.load(Ordering::SeqCst), 0);

        foo.set("baz");
        assert_eq!(count.load(Ordering::SeqCst), 1);

        foo.set("qux");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stop_prevents_further_runs() {
        let foo = Ref::new("bar");
        let count = counter();
        let c = count.clone();

        let handle = watch(
            &foo,
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            },
            WatchOptions::default(),
        );

        foo.set("baz");
        handle.stop();
        handle.stop();
        foo.set("quux");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!handle.is_active());
        assert_eq!(foo.subscriber_count(), 0);
    }

    #[test]
    fn stop_inside_callback_blocks_reentrant_runs() {
        let foo = Ref::new(0);
        let count = counter();
        let c = count.clone();
        let slot: Arc<parking_lot::Mutex<Option<WatchHandle>>> = Arc::default();
        let slot_clone = slot.clone();
        let foo_clone = foo.clone();

        let handle = watch(
            &foo,
            move |value: &i32, _| {
                c.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = slot_clone.lock().clone() {
                    handle.stop();
                }
                foo_clone.set(value + 1);
            },
            WatchOptions::default(),
        );
        *slot.lock() = Some(handle);

        foo.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(foo.get(), 2);
    }

    #[test]
    fn watch_old_value() {
        let foo = Ref::new(String::from("bar"));
        let old_value = Arc::new(parking_lot::Mutex::new(String::new()));
        let o = old_value.clone();

        watch(
            &foo,
            move |_, old: Option<&String>| {
                *o.lock() = old.cloned().unwrap_or_default();
            },
            WatchOptions::default(),
        );
        assert_eq!(*old_value.lock(), "");

        foo.set("baz".into());
        assert_eq!(*old_value.lock(), "bar");

        foo.set("qux".into());
        assert_eq!(*old_value.lock(), "baz");
    }

    #[test]
    fn watch_immediate_runs_before_returning() {
        let foo = Ref::new("bar");
        let count = counter();
        let c = count.clone();
        let first_old = Arc::new(parking_lot::Mutex::new(Some("unset")));
        let f = first_old.clone();

        watch_immediate(&foo, move |_, old| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                *f.lock() = old.copied();
            }
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*first_old.lock(), None);

        foo.set("baz");
        foo.set("qux");
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn watch_once_runs_exactly_once() {
        let foo = Ref::new("bar");
        let count = counter();
        let c = count.clone();

        watch_once(&foo, move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        foo.set("baz");
        foo.set("qux");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(foo.subscriber_count(), 0);
    }

    #[test]
    fn watch_once_survives_reentrant_write() {
        let foo = Ref::new(0);
        let count = counter();
        let c = count.clone();
        let foo_clone = foo.clone();

        watch_once(&foo, move |value: &i32, _| {
            c.fetch_add(1, Ordering::SeqCst);
            foo_clone.set(value + 1);
        });

        foo.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(foo.get(), 2);
    }

    #[test]
    fn multiple_async_watchers_keep_order() {
        let foo = Ref::new("bar");
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for tag in 0..3 {
            let order = order.clone();
            watch_async(&foo, move |_, _| order.lock().push(tag));
        }

        foo.set("baz");
        assert!(order.lock().is_empty());

        flush_microtasks();
        assert_eq!(*order.lock(), vec![0, 1, 2]);

        foo.set("qux");
        assert_eq!(order.lock().len(), 3);
        flush_microtasks();
        assert_eq!(order.lock().len(), 6);
    }

    #[test]
    fn sync_watchers_run_before_async_ones() {
        let foo = Ref::new(0);
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let o = order.clone();
        watch_async(&foo, move |_, _| o.lock().push("async"));
        let o = order.clone();
        watch(
            &foo,
            move |_, _| o.lock().push("sync"),
            WatchOptions::default(),
        );

        foo.set(1);
        assert_eq!(*order.lock(), vec!["sync"]);
        flush_microtasks();
        assert_eq!(*order.lock(), vec!["sync", "async"]);
    }

    #[test]
    fn watch_computed_source() {
        let foo = Ref::new(2);
        let foo_clone = foo.clone();
        let doubled = computed(&[&foo], move || foo_clone.get() * 2);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = seen.clone();

        watch(
            &doubled,
            move |value, old| s.lock().push((*value, old.copied())),
            WatchOptions::default(),
        );

        foo.set(5);
        assert_eq!(*seen.lock(), vec![(10, Some(4))]);
    }

    #[test]
    fn watch_readonly_view() {
        let foo = Ref::new(1);
        let view = foo.readonly();
        let count = counter();
        let c = count.clone();

        watch(
            &view,
            move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            },
            WatchOptions::default(),
        );

        foo.set(2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn whenever_skips_falsy_values() {
        let flag = Ref::new(0);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = seen.clone();

        whenever(
            &flag,
            move |value, _| s.lock().push(*value),
            WatchOptions::default(),
        );

        flag.set(3);
        flag.set(0);
        flag.set(7);
        assert_eq!(*seen.lock(), vec![3, 7]);
    }

    #[test]
    fn whenever_immediate_checks_current_value() {
        let ready = Ref::new(true);
        let count = counter();
        let c = count.clone();

        whenever_immediate(&ready, move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);

        ready.set(false);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn whenever_async_defers() {
        let name: Ref<Option<String>> = Ref::new(None);
        let count = counter();
        let c = count.clone();

        whenever_async(&name, move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        name.set(Some("ada".into()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        flush_microtasks();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        name.set(Some(String::new()));
        flush_microtasks();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn json_truthiness() {
        use serde_json::json;

        assert!(!json!(null).is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!("").is_truthy());
        assert!(json!([]).is_truthy());
        assert!(json!({}).is_truthy());
        assert!(json!("x").is_truthy());
        assert!(json!(1.5).is_truthy());
    }
}
