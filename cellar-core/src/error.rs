//! Error types shared by the reactive primitives and the store layer.
//!
//! Every failure is raised synchronously at the point of misuse. There is no
//! retry layer: callers either avoid the precondition or match on the variant.

use thiserror::Error;

/// Errors produced by refs, computed refs, watchers and stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A store with this name is already registered.
    #[error("store \"{name}\" is already defined")]
    DuplicateStore { name: String },

    /// No store with this name is registered.
    #[error("store \"{name}\" is not defined")]
    StoreNotDefined { name: String },

    /// The store has no entry with this key.
    #[error("store \"{store}\" does not have property \"{key}\"")]
    NoSuchProperty { store: String, key: String },

    /// The entry exists but is a computed ref, a readonly ref or an action.
    #[error("cannot set value of non-ref property \"{key}\" on store \"{store}\"")]
    ReadonlyProperty { store: String, key: String },

    /// The key is one of the façade's own names (`$patch`, `$raw`, the raw sentinel).
    #[error("property \"{key}\" is reserved by the store")]
    ReservedProperty { key: String },

    /// The entry is an action, so it has no value to read.
    #[error("property \"{key}\" on store \"{store}\" is an action, not a value")]
    NotAValue { store: String, key: String },

    /// The entry exists but is not callable.
    #[error("property \"{key}\" on store \"{store}\" is not an action")]
    NotAnAction { store: String, key: String },

    /// A computed ref's internal update was attempted with a foreign token.
    #[error("computed ref update token does not match")]
    TokenMismatch,

    /// A validated ref refused a write under [`ValidationPolicy::Reject`].
    ///
    /// [`ValidationPolicy::Reject`]: crate::reactive::ValidationPolicy::Reject
    #[error("value rejected by validator: {reason}")]
    ValidationRejected { reason: String },

    /// An `until` wait reached its deadline.
    #[error("{reason}")]
    Timeout { reason: String },

    /// An async operation was requested outside a tokio runtime.
    #[error("no tokio runtime is running on this thread")]
    NoRuntime,

    /// The watched source was dropped before the wait could resolve.
    #[error("watched source was dropped before the condition matched")]
    Disconnected,
}

impl Error {
    /// True for the "not found" family (missing store or missing property).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::StoreNotDefined { .. } | Error::NoSuchProperty { .. })
    }

    /// True for the "access violation" family.
    pub fn is_access_violation(&self) -> bool {
        matches!(
            self,
            Error::ReadonlyProperty { .. }
                | Error::ReservedProperty { .. }
                | Error::NotAnAction { .. }
                | Error::TokenMismatch
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
