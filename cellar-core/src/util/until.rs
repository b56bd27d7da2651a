//! Wait for a source to satisfy a condition.
//!
//! ```rust,ignore
//! let status = Ref::new("loading");
//! until(&status)
//!     .to_be("ready", UntilOptions::default().timeout(Duration::from_millis(50)))
//!     .await?;
//! ```
//!
//! The condition is checked right away and then after every change. A zero
//! timeout waits forever. The internal watcher is stopped however the wait
//! ends.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::timeout::promise_timeout;
use crate::error::{Error, Result};
use crate::reactive::{watch, ReactiveSource, Truthy, WatchOptions};

/// Options for an `until` wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UntilOptions {
    /// Milliseconds before giving up. `0` never times out.
    pub timeout_ms: u64,
    /// Fail with [`Error::Timeout`] on expiry instead of resolving.
    pub throw_on_timeout: bool,
    /// Message carried by the timeout error.
    pub timeout_reason: Option<String>,
}

impl Default for UntilOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            throw_on_timeout: true,
            timeout_reason: None,
        }
    }
}

impl UntilOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn throw_on_timeout(mut self, throw: bool) -> Self {
        self.throw_on_timeout = throw;
        self
    }

    pub fn timeout_reason(mut self, reason: impl Into<String>) -> Self {
        self.timeout_reason = Some(reason.into());
        self
    }

    fn deadline(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Start an `until` wait on `source`.
pub fn until<S: ReactiveSource>(source: &S) -> Until<S> {
    Until {
        source: source.clone(),
    }
}

/// Condition builder returned by [`until`].
#[derive(Clone)]
pub struct Until<S: ReactiveSource> {
    source: S,
}

impl<S: ReactiveSource> Until<S> {
    /// Resolve once `condition` holds for the source's value.
    pub async fn to_match<P>(&self, condition: P, options: UntilOptions) -> Result<()>
    where
        P: Fn(&S::Value) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));

        let handle = watch(
            &self.source,
            move |value, _| {
                if condition(value) {
                    if let Some(tx) = tx.lock().take() {
                        let _ = tx.send(());
                    }
                }
            },
            WatchOptions::new().immediate(true),
        );

        let outcome = match options.deadline() {
            None => rx.await.map_err(|_| Error::Disconnected),
            Some(limit) => {
                tokio::select! {
                    received = rx => received.map_err(|_| Error::Disconnected),
                    expired = promise_timeout(
                        limit,
                        options.throw_on_timeout,
                        options.timeout_reason.as_deref(),
                    ) => expired,
                }
            }
        };

        handle.stop();
        outcome
    }

    /// Resolve once the value equals `expected`.
    pub async fn to_be(&self, expected: S::Value, options: UntilOptions) -> Result<()> {
        self.to_match(move |value| *value == expected, options).await
    }

    pub async fn to_be_truthy(&self, options: UntilOptions) -> Result<()>
    where
        S::Value: Truthy,
    {
        self.to_match(|value: &S::Value| value.is_truthy(), options).await
    }

    pub async fn to_be_falsy(&self, options: UntilOptions) -> Result<()>
    where
        S::Value: Truthy,
    {
        self.to_match(|value: &S::Value| !value.is_truthy(), options).await
    }
}

impl<S, V> Until<S>
where
    S: ReactiveSource<Value = Option<V>>,
    V: 'static,
{
    /// Resolve once the value is `None`.
    pub async fn to_be_none(&self, options: UntilOptions) -> Result<()> {
        self.to_match(|value: &Option<V>| value.is_none(), options).await
    }
}
