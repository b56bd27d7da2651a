//! Named Stores
//!
//! A store groups refs, computed refs and actions under one name and guards
//! access to them. Stores live in a [`Registry`].
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = Registry::new();
//! let mut entries = StoreRefs::new();
//! entries.insert("foo".into(), Ref::new(json!("foo")).into());
//! entries.insert("bar".into(), Ref::new(json!("bar")).into());
//! let use_main = registry.define("main", entries)?;
//!
//! let store = use_main.get();
//! store.patch([("foo", json!("baz"))])?;
//! assert_eq!(store.value("foo")?, json!("baz"));
//! ```

mod entry;
mod facade;
mod registry;
mod snapshot;

pub use entry::{Action, Entry, Field, StoreRefs};
pub use facade::{is_reserved, store_to_refs, Store, PATCH_KEY, RAW_KEY, RAW_METHOD_KEY};
pub use registry::{Patch, Registry, UseStore};
pub use snapshot::{RawOptions, Snapshot};
