//! # Machine Definitions
//!
//! A machine definition is declarative data: states (possibly nested), guarded
//! transition candidates, eventless transitions, and service invocations. It
//! holds identifiers only — the closures behind them live in a
//! [`BehaviorRegistry`] — and is immutable once built.
//!
//! Definitions are authored as nested [`StateNode`] trees through
//! [`MachineBuilder`], then validated and flattened into an indexed form the
//! interpreter can walk cheaply. Validation happens once, at build time:
//! undeclared targets, missing compound initials, outgoing edges on final
//! states, and unregistered guard/action/service references are all rejected
//! before an interpreter ever runs.

use crate::chart::Statechart;
use crate::error::DefinitionError;
use crate::registry::BehaviorRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether a state accepts further transitions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateKind {
    Normal,
    /// Terminal. No outgoing transitions; a final state at the root halts the
    /// whole machine.
    Final,
}

/// One transition candidate: optional guard, optional target, ordered actions.
///
/// Candidates for the same event are tried in declaration order; the first
/// whose guard passes (or which has no guard) wins. A candidate without a
/// target is *internal*: its actions run without exiting or entering any
/// state.
pub struct Transition<M: Statechart> {
    pub(crate) guard: Option<M::GuardId>,
    pub(crate) target: Option<M::StateId>,
    pub(crate) actions: Vec<M::ActionId>,
}

impl<M: Statechart> Transition<M> {
    /// A candidate targeting `state`.
    pub fn to(state: M::StateId) -> Self {
        Self {
            guard: None,
            target: Some(state),
            actions: Vec::new(),
        }
    }

    /// An internal candidate: runs actions, changes no state.
    pub fn internal() -> Self {
        Self {
            guard: None,
            target: None,
            actions: Vec::new(),
        }
    }

    /// Gates the candidate on a registered guard.
    pub fn guard(mut self, guard: M::GuardId) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Appends a transition action.
    pub fn action(mut self, action: M::ActionId) -> Self {
        self.actions.push(action);
        self
    }
}

impl<M: Statechart> Clone for Transition<M> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard,
            target: self.target,
            actions: self.actions.clone(),
        }
    }
}

/// A state-scoped service invocation.
///
/// Started when the owning state is entered; the outcome is delivered back as
/// a synthetic completion. `on_done` candidates are evaluated in order with
/// guards seeing the resolved payload; `on_error` candidates see the failure.
pub struct Invoke<M: Statechart> {
    pub(crate) service: M::ServiceId,
    pub(crate) on_done: Vec<Transition<M>>,
    pub(crate) on_error: Vec<Transition<M>>,
}

impl<M: Statechart> Invoke<M> {
    pub fn new(service: M::ServiceId) -> Self {
        Self {
            service,
            on_done: Vec::new(),
            on_error: Vec::new(),
        }
    }

    /// Appends a success candidate.
    pub fn on_done(mut self, transition: Transition<M>) -> Self {
        self.on_done.push(transition);
        self
    }

    /// Appends a failure candidate.
    pub fn on_error(mut self, transition: Transition<M>) -> Self {
        self.on_error.push(transition);
        self
    }
}

/// Declarative description of one state, authored as a nested tree.
pub struct StateNode<M: Statechart> {
    pub(crate) id: M::StateId,
    pub(crate) kind: StateKind,
    pub(crate) meta: Option<String>,
    pub(crate) entry: Vec<M::ActionId>,
    pub(crate) exit: Vec<M::ActionId>,
    pub(crate) on: Vec<(M::EventKind, Transition<M>)>,
    pub(crate) always: Vec<Transition<M>>,
    pub(crate) invoke: Option<Invoke<M>>,
    pub(crate) initial: Option<M::StateId>,
    pub(crate) children: Vec<StateNode<M>>,
}

impl<M: Statechart> StateNode<M> {
    pub fn new(id: M::StateId) -> Self {
        Self {
            id,
            kind: StateKind::Normal,
            meta: None,
            entry: Vec::new(),
            exit: Vec::new(),
            on: Vec::new(),
            always: Vec::new(),
            invoke: None,
            initial: None,
            children: Vec::new(),
        }
    }

    /// A terminal state. Entry and exit actions are allowed; transitions,
    /// invocations and substates are not.
    pub fn final_state(id: M::StateId) -> Self {
        let mut node = Self::new(id);
        node.kind = StateKind::Final;
        node
    }

    /// Attaches a diagnostic message surfaced in snapshots while the state is
    /// active.
    pub fn meta(mut self, message: impl Into<String>) -> Self {
        self.meta = Some(message.into());
        self
    }

    /// Appends an entry action (run root-to-leaf on entry).
    pub fn entry(mut self, action: M::ActionId) -> Self {
        self.entry.push(action);
        self
    }

    /// Appends an exit action (run leaf-to-root on exit).
    pub fn exit(mut self, action: M::ActionId) -> Self {
        self.exit.push(action);
        self
    }

    /// Appends a transition candidate for `kind`. Declaration order is
    /// priority.
    pub fn on(mut self, kind: M::EventKind, transition: Transition<M>) -> Self {
        self.on.push((kind, transition));
        self
    }

    /// Appends an eventless candidate, re-evaluated whenever the state is
    /// entered or an internal action ran.
    pub fn always(mut self, transition: Transition<M>) -> Self {
        self.always.push(transition);
        self
    }

    /// Attaches a service invocation.
    pub fn invoke(mut self, invoke: Invoke<M>) -> Self {
        self.invoke = Some(invoke);
        self
    }

    /// Declares the initial substate of a compound state.
    pub fn initial(mut self, state: M::StateId) -> Self {
        self.initial = Some(state);
        self
    }

    /// Appends a substate, making this state compound.
    pub fn child(mut self, node: StateNode<M>) -> Self {
        self.children.push(node);
        self
    }
}

/// Validated, flattened form of a state.
pub(crate) struct CompiledState<M: Statechart> {
    pub(crate) kind: StateKind,
    pub(crate) meta: Option<String>,
    pub(crate) entry: Vec<M::ActionId>,
    pub(crate) exit: Vec<M::ActionId>,
    pub(crate) on: HashMap<M::EventKind, Vec<Transition<M>>>,
    pub(crate) always: Vec<Transition<M>>,
    pub(crate) invoke: Option<Invoke<M>>,
    pub(crate) initial: Option<M::StateId>,
}

impl<M: Statechart> CompiledState<M> {
    pub(crate) fn transitions_for(&self, kind: M::EventKind) -> &[Transition<M>] {
        self.on.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Validated, indexed machine definition. Shared read-only across interpreter
/// instances.
pub struct MachineDefinition<M: Statechart> {
    id: String,
    initial: M::StateId,
    nodes: HashMap<M::StateId, CompiledState<M>>,
    parent: HashMap<M::StateId, M::StateId>,
    handlers: HashMap<M::EventKind, Vec<Transition<M>>>,
}

impl<M: Statechart> MachineDefinition<M> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initial(&self) -> M::StateId {
        self.initial
    }

    pub fn has_state(&self, state: M::StateId) -> bool {
        self.nodes.contains_key(&state)
    }

    pub(crate) fn node(&self, state: M::StateId) -> &CompiledState<M> {
        self.nodes.get(&state).expect("state id validated at build")
    }

    pub(crate) fn parent_of(&self, state: M::StateId) -> Option<M::StateId> {
        self.parent.get(&state).copied()
    }

    pub(crate) fn handlers_for(&self, kind: M::EventKind) -> &[Transition<M>] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Immutable bundle of a validated definition and the registry it was
/// validated against. Cheap to clone into interpreters and child spawns.
pub struct Machine<M: Statechart> {
    pub(crate) definition: Arc<MachineDefinition<M>>,
    pub(crate) registry: Arc<BehaviorRegistry<M>>,
}

impl<M: Statechart> Machine<M> {
    pub fn definition(&self) -> &MachineDefinition<M> {
        &self.definition
    }
}

impl<M: Statechart> Clone for Machine<M> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Builder for [`Machine`]. Collects nested state nodes and machine-level
/// handlers, then validates everything against a [`BehaviorRegistry`].
pub struct MachineBuilder<M: Statechart> {
    id: String,
    initial: Option<M::StateId>,
    states: Vec<StateNode<M>>,
    handlers: Vec<(M::EventKind, Transition<M>)>,
}

impl<M: Statechart> MachineBuilder<M> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initial: None,
            states: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Declares the initial top-level state.
    pub fn initial(mut self, state: M::StateId) -> Self {
        self.initial = Some(state);
        self
    }

    /// Appends a top-level state (and, transitively, its substates).
    pub fn state(mut self, node: StateNode<M>) -> Self {
        self.states.push(node);
        self
    }

    /// Appends a machine-level handler, consulted after bubbling exhausts the
    /// active state chain. Useful for events that must be absorbed in every
    /// state (e.g. an authentication status push arriving mid-load).
    pub fn on(mut self, kind: M::EventKind, transition: Transition<M>) -> Self {
        self.handlers.push((kind, transition));
        self
    }

    /// Validates the definition against `registry` and seals both into a
    /// [`Machine`].
    pub fn build(self, registry: BehaviorRegistry<M>) -> Result<Machine<M>, DefinitionError> {
        let machine = self.id.clone();
        if self.states.is_empty() {
            return Err(DefinitionError::Empty { machine });
        }
        let initial = self.initial.ok_or_else(|| DefinitionError::NoInitial {
            machine: machine.clone(),
        })?;

        // Flatten the node tree, recording parents and rejecting duplicates.
        let mut nodes: HashMap<M::StateId, CompiledState<M>> = HashMap::new();
        let mut parent: HashMap<M::StateId, M::StateId> = HashMap::new();
        let mut pending: Vec<(Option<M::StateId>, StateNode<M>)> =
            self.states.into_iter().map(|n| (None, n)).collect();
        while let Some((parent_id, node)) = pending.pop() {
            let id = node.id;
            if nodes.contains_key(&id) {
                return Err(DefinitionError::DuplicateState {
                    machine: machine.clone(),
                    state: format!("{id:?}"),
                });
            }
            if let Some(parent_id) = parent_id {
                parent.insert(id, parent_id);
            }
            let child_ids: Vec<M::StateId> = node.children.iter().map(|c| c.id).collect();
            match (node.initial, child_ids.is_empty()) {
                (Some(init), false) if !child_ids.contains(&init) => {
                    return Err(DefinitionError::InitialNotChild {
                        machine: machine.clone(),
                        state: format!("{id:?}"),
                        initial: format!("{init:?}"),
                    });
                }
                (Some(init), true) => {
                    return Err(DefinitionError::InitialNotChild {
                        machine: machine.clone(),
                        state: format!("{id:?}"),
                        initial: format!("{init:?}"),
                    });
                }
                (None, false) => {
                    return Err(DefinitionError::MissingInitialChild {
                        machine: machine.clone(),
                        state: format!("{id:?}"),
                    });
                }
                _ => {}
            }
            if node.kind == StateKind::Final
                && !(node.on.is_empty()
                    && node.always.is_empty()
                    && node.invoke.is_none()
                    && node.children.is_empty())
            {
                return Err(DefinitionError::FinalWithOutgoing {
                    machine: machine.clone(),
                    state: format!("{id:?}"),
                });
            }
            let mut on: HashMap<M::EventKind, Vec<Transition<M>>> = HashMap::new();
            for (kind, transition) in node.on {
                on.entry(kind).or_default().push(transition);
            }
            for child in node.children {
                pending.push((Some(id), child));
            }
            nodes.insert(
                id,
                CompiledState {
                    kind: node.kind,
                    meta: node.meta,
                    entry: node.entry,
                    exit: node.exit,
                    on,
                    always: node.always,
                    invoke: node.invoke,
                    initial: node.initial,
                },
            );
        }

        if !nodes.contains_key(&initial) {
            return Err(DefinitionError::UnknownInitial {
                machine,
                state: format!("{initial:?}"),
            });
        }

        let mut handlers: HashMap<M::EventKind, Vec<Transition<M>>> = HashMap::new();
        for (kind, transition) in self.handlers {
            handlers.entry(kind).or_default().push(transition);
        }

        let definition = MachineDefinition {
            id: self.id,
            initial,
            nodes,
            parent,
            handlers,
        };
        validate_references(&definition, &registry)?;

        Ok(Machine {
            definition: Arc::new(definition),
            registry: Arc::new(registry),
        })
    }
}

/// Checks every transition target against the state set and every
/// guard/action/service identifier against the registry.
fn validate_references<M: Statechart>(
    definition: &MachineDefinition<M>,
    registry: &BehaviorRegistry<M>,
) -> Result<(), DefinitionError> {
    let machine = definition.id.clone();

    let check_actions = |actions: &[M::ActionId]| -> Result<(), DefinitionError> {
        for &action in actions {
            if !registry.has_action(action) {
                return Err(DefinitionError::UnknownAction {
                    machine: machine.clone(),
                    action: format!("{action:?}"),
                });
            }
        }
        Ok(())
    };
    let check_transition = |transition: &Transition<M>| -> Result<(), DefinitionError> {
        if let Some(guard) = transition.guard {
            if !registry.has_guard(guard) {
                return Err(DefinitionError::UnknownGuard {
                    machine: machine.clone(),
                    guard: format!("{guard:?}"),
                });
            }
        }
        if let Some(target) = transition.target {
            if !definition.nodes.contains_key(&target) {
                return Err(DefinitionError::UnknownTarget {
                    machine: machine.clone(),
                    state: format!("{target:?}"),
                });
            }
        }
        check_actions(&transition.actions)
    };

    for node in definition.nodes.values() {
        check_actions(&node.entry)?;
        check_actions(&node.exit)?;
        for candidates in node.on.values() {
            for transition in candidates {
                check_transition(transition)?;
            }
        }
        for transition in &node.always {
            check_transition(transition)?;
        }
        if let Some(invoke) = &node.invoke {
            if !registry.has_service(invoke.service) {
                return Err(DefinitionError::UnknownService {
                    machine: machine.clone(),
                    service: format!("{:?}", invoke.service),
                });
            }
            for transition in invoke.on_done.iter().chain(&invoke.on_error) {
                check_transition(transition)?;
            }
        }
    }
    for candidates in definition.handlers.values() {
        for transition in candidates {
            check_transition(transition)?;
        }
    }
    Ok(())
}
