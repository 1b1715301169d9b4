//! # Machine Handles
//!
//! The client half of an interpreter. [`MachineHandle`] is what the code that
//! constructed the machine keeps: it sends events, reads snapshots, and stops
//! the machine. [`ActorRef`] is the reduced handle a parent stores in its
//! context for a spawned child — sending events is its sole operation.
//!
//! Sends are fire-and-forget over an unbounded channel: they never block, and
//! an event sent to a stopped machine is silently discarded. Many events are
//! expected to arrive in states that do not care about them; drops are by
//! design, not errors.

use crate::chart::Statechart;
use crate::interpreter::Envelope;
use crate::snapshot::Snapshot;
use std::fmt;
use tokio::sync::{mpsc, oneshot, watch};

/// Full client handle for one interpreter instance. Cheap to clone and share.
pub struct MachineHandle<M: Statechart> {
    pub(crate) sender: mpsc::UnboundedSender<Envelope<M>>,
    pub(crate) snapshot: watch::Receiver<Snapshot<M>>,
}

impl<M: Statechart> MachineHandle<M> {
    /// Delivers an event to the machine's mailbox. Never blocks; dropped if
    /// the machine has stopped.
    pub fn send(&self, event: M::Event) {
        let _ = self.sender.send(Envelope::Event(event));
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot<M> {
        self.snapshot.borrow().clone()
    }

    /// Subscribes to snapshot publications. The receiver's `wait_for` is the
    /// idiomatic way to await a machine reaching a given configuration.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<M>> {
        self.snapshot.clone()
    }

    /// A send-only reference to this machine, suitable for storing in another
    /// machine's context.
    pub fn actor_ref(&self) -> ActorRef<M> {
        ActorRef {
            sender: self.sender.clone(),
        }
    }

    /// Stops the machine: exit actions run for all active states, spawned
    /// children are stopped, and the task terminates. Resolves once shutdown
    /// completed (immediately if the machine was already gone).
    pub async fn stop(&self) {
        let (ack, done) = oneshot::channel();
        if self
            .sender
            .send(Envelope::Stop { ack: Some(ack) })
            .is_ok()
        {
            let _ = done.await;
        }
    }
}

impl<M: Statechart> Clone for MachineHandle<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<M: Statechart> fmt::Debug for MachineHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineHandle").finish_non_exhaustive()
    }
}

/// Opaque reference to a spawned child machine. Supports sending events and
/// nothing else; parents never observe child state directly.
pub struct ActorRef<M: Statechart> {
    pub(crate) sender: mpsc::UnboundedSender<Envelope<M>>,
}

impl<M: Statechart> ActorRef<M> {
    /// Fire-and-forget event delivery.
    pub fn send(&self, event: M::Event) {
        let _ = self.sender.send(Envelope::Event(event));
    }

    pub(crate) fn stop(&self) {
        let _ = self.sender.send(Envelope::Stop { ack: None });
    }
}

impl<M: Statechart> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M: Statechart> fmt::Debug for ActorRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef").finish_non_exhaustive()
    }
}
