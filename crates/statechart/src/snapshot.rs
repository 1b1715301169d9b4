//! # Snapshots
//!
//! The sole read interface the interpreter exposes outward. A new snapshot is
//! published on the watch channel after every processed envelope; UI layers
//! subscribe and re-render from it.

use crate::chart::Statechart;
use std::fmt;

/// Externally observable machine state after processing an event.
pub struct Snapshot<M: Statechart> {
    /// Active state ids, root to leaf — exactly one per compound nesting
    /// level.
    pub configuration: Vec<M::StateId>,
    /// Clone of the machine context at publication time.
    pub context: M::Context,
    /// Diagnostic messages of all active states that declare one.
    pub meta: Vec<String>,
    /// True once the machine reached a root-level final state (or was halted);
    /// no further events will be processed.
    pub done: bool,
}

impl<M: Statechart> Snapshot<M> {
    /// True if `state` is active at any nesting level.
    pub fn matches(&self, state: M::StateId) -> bool {
        self.configuration.contains(&state)
    }

    /// The deepest active state, if the machine has started.
    pub fn leaf(&self) -> Option<M::StateId> {
        self.configuration.last().copied()
    }
}

impl<M: Statechart> Clone for Snapshot<M> {
    fn clone(&self) -> Self {
        Self {
            configuration: self.configuration.clone(),
            context: self.context.clone(),
            meta: self.meta.clone(),
            done: self.done,
        }
    }
}

impl<M: Statechart> fmt::Debug for Snapshot<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("configuration", &self.configuration)
            .field("context", &self.context)
            .field("meta", &self.meta)
            .field("done", &self.done)
            .finish()
    }
}
