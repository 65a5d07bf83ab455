#![forbid(unsafe_code)]

//! Scoped access to a [`SettingsStore`] for the current thread.
//!
//! Host code makes a store available to everything beneath it by entering a
//! provider scope; descendants call [`use_settings`] instead of threading the
//! handle through every constructor.
//!
//! ```
//! use albumcard_core::card::{self, keys};
//! use albumcard_runtime::provider::{SettingsProvider, use_settings};
//! use albumcard_runtime::SettingsStore;
//!
//! let store = SettingsStore::new(card::defaults());
//! {
//!     let _scope = SettingsProvider::enter(store.clone());
//!     use_settings().set(keys::SHOW_QR, false).unwrap();
//! }
//! assert_eq!(store.current().get_bool(keys::SHOW_QR), Some(false));
//! ```
//!
//! # Invariants
//!
//! 1. Scopes nest; the innermost store wins.
//! 2. Leaving a scope restores the enclosing one, even on unwind.
//! 3. [`use_settings`] outside every scope panics. Use [`try_settings`] where
//!    absence is expected.

use std::cell::RefCell;
use std::marker::PhantomData;

use tracing::trace;

use crate::store::SettingsStore;

thread_local! {
    static PROVIDERS: RefCell<Vec<SettingsStore>> = const { RefCell::new(Vec::new()) };
}

/// Guard keeping a store provided until dropped.
#[must_use = "the store is only provided while the scope guard lives"]
#[derive(Debug)]
pub struct SettingsProvider {
    /// Stack depth including this scope.
    depth: usize,
    // Scopes are per-thread.
    _not_send: PhantomData<*const ()>,
}

impl SettingsProvider {
    /// Provide `store` until the returned guard is dropped.
    pub fn enter(store: SettingsStore) -> Self {
        let depth = PROVIDERS.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(store);
            stack.len()
        });
        trace!(depth, "settings provider entered");
        Self {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Nesting depth of this scope (1 for the outermost).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for SettingsProvider {
    fn drop(&mut self) {
        // Take the popped handles out before dropping them so no store drop
        // runs while the stack is borrowed.
        let popped = PROVIDERS.with(|stack| {
            let mut stack = stack.borrow_mut();
            let keep = self.depth.saturating_sub(1).min(stack.len());
            stack.split_off(keep)
        });
        trace!(depth = self.depth, "settings provider left");
        drop(popped);
    }
}

/// Run `f` with `store` provided.
pub fn provide<R>(store: SettingsStore, f: impl FnOnce() -> R) -> R {
    let _scope = SettingsProvider::enter(store);
    f()
}

/// The innermost provided store.
///
/// # Panics
///
/// Panics when called outside every provider scope.
#[must_use]
pub fn use_settings() -> SettingsStore {
    try_settings().unwrap_or_else(|| {
        panic!("use_settings() called outside a settings provider scope")
    })
}

/// The innermost provided store, or `None` outside every scope.
#[must_use]
pub fn try_settings() -> Option<SettingsStore> {
    PROVIDERS.with(|stack| stack.borrow().last().cloned())
}

/// Number of active provider scopes on this thread.
#[must_use]
pub fn provider_depth() -> usize {
    PROVIDERS.with(|stack| stack.borrow().len())
}
