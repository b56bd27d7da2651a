//! Reactive Primitives
//!
//! This module implements the core reactive system: refs, computed refs,
//! effects and watchers.
//!
//! # Concepts
//!
//! ## Refs
//!
//! A [`Ref`] is a container for mutable state. Writing a new value runs every
//! effect subscribed to the ref, synchronously and in subscription order.
//! Writing an equal value does nothing.
//!
//! ## Computed Refs
//!
//! A [`Computed`] is a readonly value derived from sources the caller lists
//! explicitly. It recomputes eagerly whenever one of them changes and has
//! subscribers of its own, so computed refs chain.
//!
//! ## Effects and Watchers
//!
//! An [`Effect`] is a callback plus a run policy (sync or deferred, once or
//! repeating). [`watch`] and its variants attach one to a source and return
//! a [`WatchHandle`] to stop it.
//!
//! # Implementation Notes
//!
//! There is no automatic dependency tracking, no batching and no cycle
//! detection. Deferred effects go to a thread-local microtask queue that is
//! drained at explicit checkpoints ([`flush_microtasks`], [`tick`]).

mod computed;
mod effect;
mod microtask;
mod reference;
mod source;
mod subscriber;
mod watch;

pub use computed::{computed, Computed};
pub use effect::{Effect, EffectCallback, EffectOptions};
pub use microtask::{flush_microtasks, pending_microtasks, queue_microtask, tick};
pub use reference::{readonly, ReadonlyRef, Ref, ValidationPolicy};
pub use source::{is_readonly, is_ref, unref, Dependency, MaybeRef, ReactiveSource, SourceRef};
pub use subscriber::{EffectId, SourceId, Subscribers};
pub use watch::{
    watch, watch_async, watch_immediate, watch_once, whenever, whenever_async,
    whenever_immediate, Truthy, WatchHandle, WatchOptions,
};

/// Bound shared by every value a reactive cell can hold.
///
/// Equality decides whether a write is a change; `Clone` lets reads and
/// deferred effects take owned copies.
pub trait Data: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Data for T where T: Clone + PartialEq + Send + Sync + 'static {}
