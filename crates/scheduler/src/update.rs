//! Repeating per-frame callbacks.
//!
//! [`UpdateList`] holds zero-argument callbacks that run once per host frame.
//! Only stateless callbacks are accepted: function items and non-capturing
//! closures, i.e. zero-sized types. A callback's identity is its type, so
//! registering the same function twice is a no-op.

use std::any::TypeId;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, warn};

use crate::scheduler::routine::panic_message;

/// Error type for callback registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error("Update callbacks must be stateless (a function item or non-capturing closure), got {0}")]
    StatefulCallback(&'static str),
}

struct Registered {
    id: TypeId,
    name: &'static str,
    callback: Box<dyn Fn() + Send>,
}

/// Ordered list of stateless callbacks invoked every frame.
#[derive(Default)]
pub struct UpdateList {
    callbacks: Vec<Registered>,
}

impl UpdateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Returns `Ok(false)` (with a warning) when it is
    /// already registered.
    ///
    /// Pass the function itself (`list.register(on_update)`), not a function
    /// pointer value: `on_update as fn()` carries an address and is rejected.
    pub fn register<F>(&mut self, callback: F) -> Result<bool, UpdateError>
    where
        F: Fn() + Send + 'static,
    {
        let name = std::any::type_name::<F>();
        if std::mem::size_of::<F>() != 0 {
            error!(callback = name, "Update list only supports stateless callbacks");
            return Err(UpdateError::StatefulCallback(name));
        }
        let id = TypeId::of::<F>();
        if self.position(id).is_some() {
            warn!(callback = name, "Callback has already been added to the update list");
            return Ok(false);
        }
        self.callbacks.push(Registered {
            id,
            name,
            callback: Box::new(callback),
        });
        Ok(true)
    }

    /// Remove a callback. Silently does nothing if it is not registered.
    pub fn unregister<F>(&mut self, _callback: F) -> bool
    where
        F: Fn() + Send + 'static,
    {
        match self.position(TypeId::of::<F>()) {
            Some(index) => {
                self.callbacks.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains<F>(&self, _callback: &F) -> bool
    where
        F: Fn() + Send + 'static,
    {
        self.position(TypeId::of::<F>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke every callback in registration order. A panicking callback is
    /// logged and stays registered; the rest still run. Returns how many
    /// callbacks panicked.
    pub fn tick(&self) -> usize {
        let mut failed = 0;
        for entry in &self.callbacks {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (entry.callback)())) {
                failed += 1;
                error!(
                    callback = entry.name,
                    error = %panic_message(payload.as_ref()),
                    "Update callback panicked"
                );
            }
        }
        failed
    }

    fn position(&self, id: TypeId) -> Option<usize> {
        self.callbacks.iter().position(|entry| entry.id == id)
    }
}
