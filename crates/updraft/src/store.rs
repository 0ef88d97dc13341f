//! Minimal state container over patch application.
//!
//! `Store` is the collaborator the applier's output feeds: it holds the
//! current value, computes successor states with [`apply`], and leans on
//! allocation sharing to skip version bumps when a patch touched nothing.

use crate::{
    patch::{PatchError, Settings, apply},
    value::Value,
};

///
/// Store
///
/// Single-threaded by design: patch application is pure and callers that
/// need concurrency wrap the store themselves. A failed update leaves the
/// state and version untouched.
///

#[derive(Clone, Debug)]
pub struct Store {
    state: Value,
    version: u64,
}

impl Store {
    #[must_use]
    pub const fn new(initial: Value) -> Self {
        Self {
            state: initial,
            version: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &Value {
        &self.state
    }

    /// Monotonically increasing change counter; bumped only by updates
    /// that produced a different state.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Apply a settings description to the current state.
    ///
    /// Returns whether anything changed. When the successor state shares
    /// the previous state's allocation the store is left untouched and
    /// the call reports `false`.
    pub fn update(&mut self, settings: &Settings) -> Result<bool, PatchError> {
        let next = apply(&self.state, settings)?;
        let changed = !next.shares(&self.state);
        if changed {
            self.state = next;
            self.version += 1;
        }
        Ok(changed)
    }

    /// Cheap copy of the current state (containers share allocations).
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.state.clone()
    }

    #[must_use]
    pub fn into_state(self) -> Value {
        self.state
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Value::empty_map())
    }
}

///
/// TESTS
///
