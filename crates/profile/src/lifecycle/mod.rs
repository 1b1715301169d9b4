//! # System Lifecycle & Orchestration
//!
//! Wiring one profile screen is the same dance every time: bundle the
//! collaborators into a [`ProfileDeps`], build the interpreter for the right
//! entity kind, spawn it, keep the handle. [`ProfileSystem`] is that dance in
//! one place, plus a graceful shutdown that stops the machine (which in turn
//! stops its spawned feed children) and awaits the task.
//!
//! Collaborators are injected as trait objects, so the same orchestration
//! serves the in-memory fixtures and a real transport unchanged.

use crate::clients::{ErrorReporter, Navigator, ProfileApi};
use crate::model::EntityKind;
use crate::profile::{community, member, ProfileChart, ProfileDeps};
use statechart::{DefinitionError, MachineHandle};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// One running profile screen: the machine task and its client handle.
pub struct ProfileSystem {
    pub handle: MachineHandle<ProfileChart>,
    task: JoinHandle<()>,
}

impl ProfileSystem {
    /// Wires the collaborators and starts the interpreter.
    pub fn new(
        kind: EntityKind,
        slug: impl Into<String>,
        api: Arc<dyn ProfileApi>,
        navigator: Arc<dyn Navigator>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, DefinitionError> {
        let slug = slug.into();
        let deps = ProfileDeps::new(api, navigator, reporter)?;
        let (interpreter, handle) = match kind {
            EntityKind::Community => community::new(slug.clone(), deps)?,
            EntityKind::Member => member::new(slug.clone(), deps)?,
        };
        let task = tokio::spawn(interpreter.run());
        info!(kind = kind.label(), slug = %slug, "profile system started");
        Ok(Self { handle, task })
    }

    /// Stops the machine and awaits its task. Feed children are stopped by
    /// the machine's own shutdown path.
    pub async fn shutdown(self) {
        self.handle.stop().await;
        let _ = self.task.await;
        info!("profile system stopped");
    }
}
