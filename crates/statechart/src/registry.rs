//! # Behavior Registry
//!
//! Machine definitions are pure data; the closures behind their guard, action
//! and service identifiers live here. The registry is built up front and handed
//! to [`MachineBuilder::build`](crate::MachineBuilder::build), which rejects
//! any identifier the definition references but the registry does not carry.
//!
//! # Execution Model
//! - **Guards** are pure predicates over `(context, trigger)`. They may run
//!   several times per dispatch (once per candidate, in declaration order) and
//!   must not mutate context or perform side effects.
//! - **Actions** come in two flavors sharing one signature: *assign* actions
//!   mutate the context through [`ActionScope::context`], *effect* actions call
//!   out through [`ActionScope::deps`] (navigation, reporting) or spawn child
//!   actors. Context mutations are visible to later actions in the same batch.
//! - **Services** take a read-only view of `(context, deps)` and return a boxed
//!   future resolving exactly once to success or failure. The interpreter
//!   delivers the outcome back to the machine as a synthetic completion.
//!
//! # Failure Policy
//! Guards, actions and services are infallible closures; anything that can go
//! wrong is modeled as a service failure and routed through `on_error`
//! transitions. A panic inside a closure tears down the interpreter task, and
//! observers see the snapshot channel close.

use crate::chart::Statechart;
use crate::definition::Machine;
use crate::handle::ActorRef;
use crate::interpreter::{ChildRegistry, Interpreter};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// What a guard or action is being evaluated against.
pub enum Trigger<'a, M: Statechart> {
    /// An external event, payload included.
    Event(&'a M::Event),
    /// A service resolved successfully; guards on `on_done` candidates inspect
    /// the payload.
    Done(&'a M::ServiceOutput),
    /// A service failed.
    Failed(&'a M::ServiceError),
    /// No trigger: eventless transitions, initial entry, shutdown.
    Always,
}

impl<'a, M: Statechart> Trigger<'a, M> {
    /// The external event, if that is what fired.
    pub fn event(&self) -> Option<&'a M::Event> {
        match self {
            Trigger::Event(event) => Some(event),
            _ => None,
        }
    }

    /// The resolved service payload, if a completion fired.
    pub fn output(&self) -> Option<&'a M::ServiceOutput> {
        match self {
            Trigger::Done(output) => Some(output),
            _ => None,
        }
    }

    /// The service failure, if one fired.
    pub fn error(&self) -> Option<&'a M::ServiceError> {
        match self {
            Trigger::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl<'a, M: Statechart> Clone for Trigger<'a, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, M: Statechart> Copy for Trigger<'a, M> {}

/// Mutable view handed to actions.
///
/// Splits the interpreter state an action may touch: the machine context
/// (assign flavor), the injected dependencies (effect flavor), and the child
/// actor registry (via [`ActionScope::spawn_child`]).
pub struct ActionScope<'a, M: Statechart> {
    /// The machine's private context, patched in place.
    pub context: &'a mut M::Context,
    /// The external dependency handle injected at construction.
    pub deps: &'a M::Deps,
    pub(crate) children: &'a mut ChildRegistry<M>,
    pub(crate) owner: Option<M::StateId>,
}

impl<'a, M: Statechart> ActionScope<'a, M> {
    /// Spawns a child interpreter and registers it under `role`.
    ///
    /// The child runs in its own task and is reachable only through the
    /// returned [`ActorRef`] (fire-and-forget sends). The parent owns its
    /// lifecycle: the child is stopped when the state that spawned it exits,
    /// when the parent stops, or when another child is spawned under the same
    /// role. Store the ref in the context if later actions need to message it.
    pub fn spawn_child<C: Statechart>(
        &mut self,
        role: &'static str,
        machine: Machine<C>,
        context: C::Context,
        deps: C::Deps,
    ) -> ActorRef<C> {
        let (interpreter, handle) = Interpreter::new(machine, context, deps);
        tokio::spawn(interpreter.run());
        let actor = handle.actor_ref();
        self.children.insert(role, self.owner, Box::new(actor.clone()));
        actor
    }
}

pub(crate) type GuardFn<M> = Box<
    dyn Fn(&<M as Statechart>::Context, &Trigger<'_, M>) -> bool + Send + Sync,
>;

pub(crate) type ActionFn<M> =
    Box<dyn Fn(&mut ActionScope<'_, M>, &Trigger<'_, M>) + Send + Sync>;

/// Boxed future returned by a registered service.
pub type ServiceFuture<M> = Pin<
    Box<
        dyn Future<
                Output = Result<
                    <M as Statechart>::ServiceOutput,
                    <M as Statechart>::ServiceError,
                >,
            > + Send,
    >,
>;

pub(crate) type ServiceFn<M> = Box<
    dyn Fn(&<M as Statechart>::Context, &<M as Statechart>::Deps) -> ServiceFuture<M>
        + Send
        + Sync,
>;

/// Registration map resolving guard, action and service identifiers to their
/// implementations.
pub struct BehaviorRegistry<M: Statechart> {
    guards: HashMap<M::GuardId, GuardFn<M>>,
    actions: HashMap<M::ActionId, ActionFn<M>>,
    services: HashMap<M::ServiceId, ServiceFn<M>>,
}

impl<M: Statechart> Default for BehaviorRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Statechart> BehaviorRegistry<M> {
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
            actions: HashMap::new(),
            services: HashMap::new(),
        }
    }

    /// Registers a guard predicate. Guards must be pure.
    pub fn guard(
        mut self,
        id: M::GuardId,
        guard: impl Fn(&M::Context, &Trigger<'_, M>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.guards.insert(id, Box::new(guard));
        self
    }

    /// Registers an action handler.
    pub fn action(
        mut self,
        id: M::ActionId,
        action: impl Fn(&mut ActionScope<'_, M>, &Trigger<'_, M>) + Send + Sync + 'static,
    ) -> Self {
        self.actions.insert(id, Box::new(action));
        self
    }

    /// Registers a service factory.
    pub fn service(
        mut self,
        id: M::ServiceId,
        service: impl Fn(&M::Context, &M::Deps) -> ServiceFuture<M> + Send + Sync + 'static,
    ) -> Self {
        self.services.insert(id, Box::new(service));
        self
    }

    pub(crate) fn has_guard(&self, id: M::GuardId) -> bool {
        self.guards.contains_key(&id)
    }

    pub(crate) fn has_action(&self, id: M::ActionId) -> bool {
        self.actions.contains_key(&id)
    }

    pub(crate) fn has_service(&self, id: M::ServiceId) -> bool {
        self.services.contains_key(&id)
    }

    // Identifier presence is validated at build time, so lookups below cannot
    // fail for a definition that was accepted.

    pub(crate) fn eval_guard(
        &self,
        id: M::GuardId,
        context: &M::Context,
        trigger: &Trigger<'_, M>,
    ) -> bool {
        let guard = self.guards.get(&id).expect("guard validated at build");
        guard(context, trigger)
    }

    pub(crate) fn run_action(
        &self,
        id: M::ActionId,
        scope: &mut ActionScope<'_, M>,
        trigger: &Trigger<'_, M>,
    ) {
        let action = self.actions.get(&id).expect("action validated at build");
        action(scope, trigger);
    }

    pub(crate) fn start_service(
        &self,
        id: M::ServiceId,
        context: &M::Context,
        deps: &M::Deps,
    ) -> ServiceFuture<M> {
        let service = self.services.get(&id).expect("service validated at build");
        service(context, deps)
    }
}
