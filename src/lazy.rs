// src/lazy.rs

//! Deferred field resolution
//!
//! Content parts sometimes carry values that are expensive to materialize,
//! such as the full option items behind a selection field. `LazyField` holds
//! either a loader closure or the resolved value, runs the loader at most
//! once on first access, and caches the result for every later read.

use std::fmt;
use std::sync::{Mutex, OnceLock};

type Loader<T> = Box<dyn FnOnce() -> T>;

/// A value that is either already resolved or produced on first access.
///
/// Resolution is serialized: even if the holder is shared, the loader runs
/// at most once and every reader observes the same cached value. Mirrors
/// the semantics of `std::sync::LazyLock` with a runtime-supplied loader.
pub struct LazyField<T> {
    cell: OnceLock<T>,
    loader: Mutex<Option<Loader<T>>>,
}

impl<T> LazyField<T> {
    /// Create an unresolved field that will run `loader` on first access.
    pub fn new(loader: impl FnOnce() -> T + 'static) -> Self {
        LazyField {
            cell: OnceLock::new(),
            loader: Mutex::new(Some(Box::new(loader))),
        }
    }

    /// Create a field that is already resolved to `value`.
    pub fn resolved(value: T) -> Self {
        LazyField {
            cell: OnceLock::from(value),
            loader: Mutex::new(None),
        }
    }

    /// Whether the value has been materialized yet.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The resolved value, running the loader if this is the first access.
    ///
    /// Panics if a previous load panicked, matching `LazyLock` semantics.
    pub fn value(&self) -> &T {
        self.cell.get_or_init(|| {
            let loader = match self.loader.lock() {
                Ok(mut guard) => guard.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            };
            match loader {
                Some(load) => load(),
                None => panic!("lazy field loader already consumed"),
            }
        })
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("LazyField").field(value).finish(),
            None => f.write_str("LazyField(<unresolved>)"),
        }
    }
}
