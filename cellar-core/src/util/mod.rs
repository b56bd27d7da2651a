//! Helpers built on the public reactive API.
//!
//! Nothing here reaches into internals: each helper is a watcher plus a bit
//! of async plumbing on tokio.

mod computed_async;
mod timeout;
mod until;

pub use computed_async::{computed_async, computed_async_with, ComputedAsyncOptions};
pub use timeout::{promise_timeout, DEFAULT_TIMEOUT_REASON};
pub use until::{until, Until, UntilOptions};
