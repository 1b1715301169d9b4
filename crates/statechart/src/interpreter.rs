//! # Statechart Interpreter
//!
//! The server half of a machine: owns the context, the active state
//! configuration, and the receiving end of the mailbox. It implements the
//! statechart semantics — guarded transitions, compound states, eventless
//! resolution, service invocations and child actors — as a sequential event
//! loop in its own Tokio task.
//!
//! # Concurrency Model
//! Exactly one envelope (external event, service completion, or stop command)
//! is processed to completion before the next is accepted, so context is never
//! concurrently mutated. Invoking a service does not block the loop: the
//! service future runs in its own task and its outcome re-enters the mailbox
//! as a synthetic completion envelope. Completions arrive in settlement order,
//! not invocation order; epoch tagging keeps late completions from abandoned
//! states harmless.
//!
//! # Transition Semantics
//! Event dispatch walks the active configuration leaf to root; the first state
//! with an enabled candidate for the event wins, then machine-level handlers
//! are consulted. A taken transition exits every active state below the
//! transition domain (leaf to root, retiring pending invocations and stopping
//! owned children), runs the transition actions, enters the target path (root
//! to leaf, starting invocations), and finally re-resolves eventless
//! transitions until the configuration is stable.

use crate::chart::Statechart;
use crate::definition::{Invoke, Machine, MachineDefinition, StateKind, Transition};
use crate::handle::{ActorRef, MachineHandle};
use crate::registry::{ActionScope, BehaviorRegistry, Trigger};
use crate::snapshot::Snapshot;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Upper bound on chained eventless transitions per settlement pass. A
/// hand-authored table that exceeds this is cyclic; the interpreter halts the
/// machine instead of spinning.
const MAX_EVENTLESS_STEPS: usize = 32;

/// Mailbox message for one interpreter.
pub(crate) enum Envelope<M: Statechart> {
    Event(M::Event),
    ServiceDone {
        state: M::StateId,
        epoch: u64,
        outcome: Result<M::ServiceOutput, M::ServiceError>,
    },
    Stop {
        ack: Option<oneshot::Sender<()>>,
    },
}

/// Stops a spawned child without knowing its concrete machine type.
pub(crate) trait ChildStopper: Send {
    fn stop(&self);
}

impl<M: Statechart> ChildStopper for ActorRef<M> {
    fn stop(&self) {
        ActorRef::stop(self);
    }
}

struct ChildEntry<M: Statechart> {
    role: &'static str,
    owner: Option<M::StateId>,
    stopper: Box<dyn ChildStopper>,
}

/// Registry of spawned children, keyed by role. The parent owns every child's
/// lifecycle: a child is stopped when its owning state exits, when its role is
/// re-spawned, and when the parent stops.
pub(crate) struct ChildRegistry<M: Statechart> {
    entries: Vec<ChildEntry<M>>,
}

impl<M: Statechart> ChildRegistry<M> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(
        &mut self,
        role: &'static str,
        owner: Option<M::StateId>,
        stopper: Box<dyn ChildStopper>,
    ) {
        // Replace semantics: one live child per role.
        self.entries.retain(|entry| {
            if entry.role == role {
                entry.stopper.stop();
                false
            } else {
                true
            }
        });
        self.entries.push(ChildEntry {
            role,
            owner,
            stopper,
        });
    }

    fn stop_owned_by(&mut self, state: M::StateId) {
        self.entries.retain(|entry| {
            if entry.owner == Some(state) {
                debug!(role = entry.role, owner = ?state, "child stopped with owning state");
                entry.stopper.stop();
                false
            } else {
                true
            }
        });
    }

    fn stop_all(&mut self) {
        for entry in self.entries.drain(..) {
            debug!(role = entry.role, "child stopped");
            entry.stopper.stop();
        }
    }
}

/// The interpreter task for one machine instance.
///
/// Created together with its [`MachineHandle`] and driven by spawning
/// [`Interpreter::run`]:
///
/// ```rust,ignore
/// let (interpreter, handle) = Interpreter::new(machine, context, deps);
/// tokio::spawn(interpreter.run());
/// handle.send(event);
/// ```
pub struct Interpreter<M: Statechart> {
    definition: Arc<MachineDefinition<M>>,
    registry: Arc<BehaviorRegistry<M>>,
    context: M::Context,
    deps: M::Deps,
    configuration: Vec<M::StateId>,
    receiver: mpsc::UnboundedReceiver<Envelope<M>>,
    self_tx: mpsc::WeakUnboundedSender<Envelope<M>>,
    snapshot_tx: watch::Sender<Snapshot<M>>,
    epochs: HashMap<M::StateId, u64>,
    epoch_counter: u64,
    children: ChildRegistry<M>,
    done: bool,
}

impl<M: Statechart> Interpreter<M> {
    /// Creates an interpreter and its handle. `context` seeds the machine's
    /// private state; `deps` is the opaque dependency handle passed through to
    /// services and spawned children.
    ///
    /// The machine does not run until [`Interpreter::run`] is spawned.
    pub fn new(machine: Machine<M>, context: M::Context, deps: M::Deps) -> (Self, MachineHandle<M>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot {
            configuration: Vec::new(),
            context: context.clone(),
            meta: Vec::new(),
            done: false,
        });
        let interpreter = Self {
            definition: machine.definition,
            registry: machine.registry,
            context,
            deps,
            configuration: Vec::new(),
            receiver,
            self_tx: sender.downgrade(),
            snapshot_tx,
            epochs: HashMap::new(),
            epoch_counter: 0,
            children: ChildRegistry::new(),
            done: false,
        };
        let handle = MachineHandle {
            sender,
            snapshot: snapshot_rx,
        };
        (interpreter, handle)
    }

    /// Runs the event loop until every handle is dropped or a stop command
    /// arrives. Entering the initial state (compound initials and eventless
    /// transitions included) happens before the first envelope is read.
    pub async fn run(mut self) {
        let machine = self.definition.id().to_string();
        info!(machine = %machine, "interpreter started");

        self.enter_initial();
        self.publish();

        let mut stop_ack = None;
        while let Some(envelope) = self.receiver.recv().await {
            match envelope {
                Envelope::Event(event) => self.handle_event(event),
                Envelope::ServiceDone {
                    state,
                    epoch,
                    outcome,
                } => self.handle_completion(state, epoch, outcome),
                Envelope::Stop { ack } => {
                    stop_ack = ack;
                    break;
                }
            }
            self.publish();
        }

        self.exit_to(None, &Trigger::Always);
        self.children.stop_all();
        self.publish();
        if let Some(ack) = stop_ack {
            let _ = ack.send(());
        }
        info!(machine = %machine, "interpreter stopped");
    }

    // --- Dispatch ---

    fn handle_event(&mut self, event: M::Event) {
        if self.done {
            debug!(machine = %self.definition.id(), event = ?event, "event dropped; machine is done");
            return;
        }
        let def = Arc::clone(&self.definition);
        let kind = M::kind_of(&event);
        let trigger = Trigger::Event(&event);

        // Leaf-level match wins; ancestors' handlers are inherited by their
        // substates.
        let configuration = self.configuration.clone();
        for &state in configuration.iter().rev() {
            let candidates = def.node(state).transitions_for(kind);
            if let Some(transition) = self.first_enabled(candidates, &trigger) {
                debug!(machine = %def.id(), state = ?state, event = ?kind, target = ?transition.target, "transition");
                self.take_transition(Some(state), transition, &trigger);
                self.settle();
                return;
            }
        }
        if let Some(transition) = self.first_enabled(def.handlers_for(kind), &trigger) {
            debug!(machine = %def.id(), event = ?kind, target = ?transition.target, "machine-level transition");
            self.take_transition(None, transition, &trigger);
            self.settle();
            return;
        }
        // Intentional permissiveness: many events arrive in states that do
        // not care about them.
        debug!(machine = %def.id(), event = ?kind, "event ignored");
    }

    fn handle_completion(
        &mut self,
        state: M::StateId,
        epoch: u64,
        outcome: Result<M::ServiceOutput, M::ServiceError>,
    ) {
        if self.done || self.epochs.get(&state) != Some(&epoch) {
            // The invoking state was exited (or re-entered with a fresh
            // invocation) before this settled. Discarding is mandatory: a late
            // completion from an abandoned branch must not touch context.
            debug!(machine = %self.definition.id(), state = ?state, epoch, "stale completion discarded");
            return;
        }
        self.epochs.remove(&state);

        let def = Arc::clone(&self.definition);
        let Some(invoke) = &def.node(state).invoke else {
            return;
        };
        match outcome {
            Ok(output) => {
                let trigger = Trigger::Done(&output);
                match self.first_enabled(&invoke.on_done, &trigger) {
                    Some(transition) => {
                        debug!(machine = %def.id(), state = ?state, service = ?invoke.service, "invocation resolved");
                        self.take_transition(Some(state), transition, &trigger);
                        self.settle();
                    }
                    None => {
                        debug!(machine = %def.id(), state = ?state, "completion ignored; no candidate enabled")
                    }
                }
            }
            Err(failure) => {
                warn!(machine = %def.id(), state = ?state, service = ?invoke.service, error = %failure, "invocation failed");
                let trigger = Trigger::Failed(&failure);
                match self.first_enabled(&invoke.on_error, &trigger) {
                    Some(transition) => {
                        self.take_transition(Some(state), transition, &trigger);
                        self.settle();
                    }
                    None => {
                        debug!(machine = %def.id(), state = ?state, "failure ignored; no candidate enabled")
                    }
                }
            }
        }
    }

    fn first_enabled(
        &self,
        candidates: &[Transition<M>],
        trigger: &Trigger<'_, M>,
    ) -> Option<Transition<M>> {
        candidates
            .iter()
            .find(|transition| match transition.guard {
                None => true,
                Some(guard) => self.registry.eval_guard(guard, &self.context, trigger),
            })
            .cloned()
    }

    // --- Transition execution ---

    fn take_transition(
        &mut self,
        source: Option<M::StateId>,
        transition: Transition<M>,
        trigger: &Trigger<'_, M>,
    ) {
        let Some(target) = transition.target else {
            self.run_actions(&transition.actions, trigger, None);
            return;
        };
        let domain = self.domain_for(source, target);
        self.exit_to(domain, trigger);
        self.run_actions(&transition.actions, trigger, None);
        self.enter_from(domain, target, trigger);
    }

    /// The deepest common proper ancestor of source and target; `None` means
    /// root scope. Everything strictly below the domain is exited. Targeting a
    /// descendant keeps the source active and tears down only the substate
    /// chain below it; a self-transition exits and re-enters its source.
    fn domain_for(&self, source: Option<M::StateId>, target: M::StateId) -> Option<M::StateId> {
        let Some(source) = source else {
            return None;
        };
        if source == target {
            return self.definition.parent_of(source);
        }
        let mut target_chain = HashSet::new();
        let mut cursor = Some(target);
        while let Some(state) = cursor {
            target_chain.insert(state);
            cursor = self.definition.parent_of(state);
        }
        let mut cursor = Some(source);
        while let Some(state) = cursor {
            if state == target {
                return self.definition.parent_of(state);
            }
            if target_chain.contains(&state) {
                return Some(state);
            }
            cursor = self.definition.parent_of(state);
        }
        None
    }

    fn exit_to(&mut self, domain: Option<M::StateId>, trigger: &Trigger<'_, M>) {
        while let Some(&leaf) = self.configuration.last() {
            if Some(leaf) == domain {
                break;
            }
            self.exit_state(leaf, trigger);
        }
    }

    fn exit_state(&mut self, state: M::StateId, trigger: &Trigger<'_, M>) {
        let def = Arc::clone(&self.definition);
        // Retire any pending invocation first so a completion racing this exit
        // is already stale.
        self.epochs.remove(&state);
        self.run_actions(&def.node(state).exit, trigger, None);
        self.children.stop_owned_by(state);
        self.configuration.pop();
        debug!(machine = %def.id(), state = ?state, "state exited");
    }

    fn enter_from(
        &mut self,
        domain: Option<M::StateId>,
        target: M::StateId,
        trigger: &Trigger<'_, M>,
    ) {
        let def = Arc::clone(&self.definition);
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(state) = cursor {
            if Some(state) == domain {
                break;
            }
            path.push(state);
            cursor = def.parent_of(state);
        }
        for &state in path.iter().rev() {
            self.enter_state(state, trigger);
        }
        // Compound targets settle on their initial substate chain.
        let mut leaf = target;
        while let Some(initial) = def.node(leaf).initial {
            self.enter_state(initial, trigger);
            leaf = initial;
        }
    }

    fn enter_state(&mut self, state: M::StateId, trigger: &Trigger<'_, M>) {
        let def = Arc::clone(&self.definition);
        let node = def.node(state);
        self.configuration.push(state);
        debug!(machine = %def.id(), state = ?state, "state entered");
        self.run_actions(&node.entry, trigger, Some(state));
        if let Some(invoke) = &node.invoke {
            self.start_invocation(state, invoke);
        }
        if node.kind == StateKind::Final && def.parent_of(state).is_none() {
            info!(machine = %def.id(), state = ?state, "machine reached final state");
            self.done = true;
            self.children.stop_all();
        }
    }

    fn run_actions(
        &mut self,
        actions: &[M::ActionId],
        trigger: &Trigger<'_, M>,
        owner: Option<M::StateId>,
    ) {
        if actions.is_empty() {
            return;
        }
        let registry = Arc::clone(&self.registry);
        let mut scope = ActionScope {
            context: &mut self.context,
            deps: &self.deps,
            children: &mut self.children,
            owner,
        };
        for &action in actions {
            registry.run_action(action, &mut scope, trigger);
        }
    }

    /// Resolves eventless transitions until the configuration is stable.
    /// Bounded: a cyclic table halts the machine with an error instead of
    /// spinning forever.
    fn settle(&mut self) {
        let def = Arc::clone(&self.definition);
        for _ in 0..MAX_EVENTLESS_STEPS {
            if self.done {
                return;
            }
            let configuration = self.configuration.clone();
            let mut taken = false;
            for &state in configuration.iter().rev() {
                let candidates = &def.node(state).always;
                if let Some(transition) = self.first_enabled(candidates, &Trigger::Always) {
                    debug!(machine = %def.id(), state = ?state, target = ?transition.target, "eventless transition");
                    self.take_transition(Some(state), transition, &Trigger::Always);
                    taken = true;
                    break;
                }
            }
            if !taken {
                return;
            }
        }
        error!(machine = %def.id(), limit = MAX_EVENTLESS_STEPS, "eventless transitions did not settle; halting machine");
        self.done = true;
        self.children.stop_all();
    }

    fn enter_initial(&mut self) {
        let initial = self.definition.initial();
        self.enter_from(None, initial, &Trigger::Always);
        self.settle();
    }

    // --- Services ---

    fn start_invocation(&mut self, state: M::StateId, invoke: &Invoke<M>) {
        self.epoch_counter += 1;
        let epoch = self.epoch_counter;
        self.epochs.insert(state, epoch);
        debug!(machine = %self.definition.id(), state = ?state, service = ?invoke.service, epoch, "invocation started");

        let future = self
            .registry
            .start_service(invoke.service, &self.context, &self.deps);
        let mailbox = self.self_tx.clone();
        tokio::spawn(async move {
            let outcome = future.await;
            if let Some(mailbox) = mailbox.upgrade() {
                let _ = mailbox.send(Envelope::ServiceDone {
                    state,
                    epoch,
                    outcome,
                });
            }
        });
    }

    // --- Observation ---

    fn publish(&self) {
        let meta = self
            .configuration
            .iter()
            .filter_map(|&state| self.definition.node(state).meta.clone())
            .collect();
        self.snapshot_tx.send_replace(Snapshot {
            configuration: self.configuration.clone(),
            context: self.context.clone(),
            meta,
            done: self.done,
        });
    }
}
