//! Cellar Core
//!
//! This crate provides a small reactive-state engine. It implements:
//!
//! - Reactive primitives (refs, computed refs, effects, watchers)
//! - Named stores with guarded access, bulk patches and detached snapshots
//! - Helpers built on watchers (`until`, async computed values, timeouts)
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: refs, computed refs, effects and the microtask queue
//! - `store`: the store façade and the registry that names stores
//! - `util`: waiters and async helpers built only on `reactive`
//! - `error`: the crate-wide error type
//!
//! # Example
//!
//! ```rust,ignore
//! use cellar_core::reactive::{computed, watch, Ref, WatchOptions};
//!
//! // Create a ref
//! let count = Ref::new(1);
//!
//! // Derive a value from it
//! let source = count.clone();
//! let doubled = computed(&[&count], move || source.get() * 2);
//!
//! // Watch the derived value
//! watch(&doubled, |new, old| println!("{old:?} -> {new}"), WatchOptions::new());
//!
//! // Update the ref
//! count.set(5);
//! // The watcher runs before `set` returns, printing "Some(2) -> 10"
//! ```

pub mod error;
pub mod reactive;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use reactive::{
    computed, readonly, watch, Computed, ReadonlyRef, Ref, WatchHandle, WatchOptions,
};
pub use store::{store_to_refs, Registry, Store};
pub use util::{until, UntilOptions};
