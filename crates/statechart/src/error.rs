//! # Definition Errors
//!
//! Construction-time validation failures. A definition that builds successfully
//! cannot reference an unknown state, guard, action or service at runtime.

/// Errors raised while validating a machine definition.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("machine '{machine}' declares no states")]
    Empty { machine: String },
    #[error("machine '{machine}' declares state '{state}' twice")]
    DuplicateState { machine: String, state: String },
    #[error("machine '{machine}' is missing an initial state")]
    NoInitial { machine: String },
    #[error("initial state '{state}' of machine '{machine}' is not declared")]
    UnknownInitial { machine: String, state: String },
    #[error("transition in machine '{machine}' targets undeclared state '{state}'")]
    UnknownTarget { machine: String, state: String },
    #[error("compound state '{state}' in machine '{machine}' has no initial substate")]
    MissingInitialChild { machine: String, state: String },
    #[error("state '{state}' in machine '{machine}' declares initial substate '{initial}' which is not one of its children")]
    InitialNotChild {
        machine: String,
        state: String,
        initial: String,
    },
    #[error("final state '{state}' in machine '{machine}' must not declare transitions, invocations or substates")]
    FinalWithOutgoing { machine: String, state: String },
    #[error("machine '{machine}' references unregistered guard '{guard}'")]
    UnknownGuard { machine: String, guard: String },
    #[error("machine '{machine}' references unregistered action '{action}'")]
    UnknownAction { machine: String, action: String },
    #[error("machine '{machine}' references unregistered service '{service}'")]
    UnknownService { machine: String, service: String },
}
