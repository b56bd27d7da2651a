//! Derived values produced by async functions.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reactive::{
    flush_microtasks, watch, Data, ReactiveSource, ReadonlyRef, Ref, WatchOptions,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedAsyncOptions {
    /// Skip the initial evaluation; wait for the first change of the source.
    pub lazy: bool,
}

/// A readonly ref filled in by `getter` whenever `source` changes.
///
/// The ref starts at `initial`. Each evaluation is spawned on the current
/// tokio runtime and writes its `Ok` result when it completes; failures are
/// logged. Outside a runtime, evaluations are skipped with a warning.
///
/// The spawned task drains the microtask queue of the thread it ran on after
/// writing, so async watchers of the result fire on any runtime flavor.
pub fn computed_async<S, T, G, Fut, E>(
    source: &S,
    initial: T,
    getter: G,
    options: ComputedAsyncOptions,
) -> ReadonlyRef<T>
where
    S: ReactiveSource,
    T: Data,
    G: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    computed_async_with(source, initial, getter, options, |err: E| {
        warn!(%err, "async computed evaluation failed");
    })
}

/// [`computed_async`] with a custom error handler.
pub fn computed_async_with<S, T, G, Fut, E, H>(
    source: &S,
    initial: T,
    getter: G,
    options: ComputedAsyncOptions,
    on_error: H,
) -> ReadonlyRef<T>
where
    S: ReactiveSource,
    T: Data,
    G: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Send + 'static,
    H: Fn(E) + Send + Sync + 'static,
{
    let target = Ref::new(initial);
    let writer = target.clone();
    let on_error = Arc::new(on_error);

    watch(
        source,
        move |_, _| {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!("async computed evaluation skipped: no tokio runtime");
                return;
            };
            let pending = getter();
            let writer = writer.clone();
            let on_error = Arc::clone(&on_error);
            runtime.spawn(async move {
                match pending.await {
                    Ok(value) => {
                        writer.set(value);
                        // Deferred watchers of the result were queued on this worker.
                        flush_microtasks();
                    }
                    Err(err) => on_error(err),
                }
            });
        },
        WatchOptions::new().immediate(!options.lazy),
    );

    target.readonly()
}
