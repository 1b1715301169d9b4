//! Community profile factory.

use crate::profile::{ProfileChart, ProfileContext, ProfileDeps};
use crate::model::EntityKind;
use statechart::{DefinitionError, Interpreter, MachineHandle};

/// Builds a community profile interpreter for `slug`. Spawn it with
/// `tokio::spawn(interpreter.run())`.
pub fn new(
    slug: impl Into<String>,
    deps: ProfileDeps,
) -> Result<(Interpreter<ProfileChart>, MachineHandle<ProfileChart>), DefinitionError> {
    let machine = super::machine(EntityKind::Community)?;
    let context = ProfileContext::new(EntityKind::Community, slug);
    Ok(Interpreter::new(machine, context, deps))
}
