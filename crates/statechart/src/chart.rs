//! # Statechart Trait
//!
//! The `Statechart` trait is the contract a machine author implements to plug a
//! concrete machine into the generic interpreter. It names every type the
//! interpreter needs to know about — states, events, context, dependencies, and
//! the identifiers behind guards, actions and services — so the whole runtime
//! can be written *once* and reused for any machine.
//!
//! # Architecture Note
//! Why associated types instead of string lookups?
//! Transition tables reference guards, actions and services by identifier. With
//! enumerated identifier types, a reference that was never registered is
//! rejected when the machine is built (see
//! [`MachineBuilder::build`](crate::MachineBuilder::build)), not discovered at
//! runtime in the middle of a transition. The compiler also prevents wiring a
//! guard from one machine into the definition of another.
//!
//! # Events and Event Kinds
//! External events carry payloads (`Event`), but transition tables are keyed by
//! a payload-free discriminant (`EventKind`). [`Statechart::kind_of`] maps one
//! to the other; guards receive the full event and can inspect the payload.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Type bundle for one machine. Implemented on a marker type; the marker itself
/// is never instantiated.
///
/// # Example
///
/// ```rust,ignore
/// struct Lamp;
///
/// impl Statechart for Lamp {
///     type StateId = LampState;
///     type Event = LampEvent;
///     type EventKind = LampEventKind;
///     type Context = LampContext;
///     type Deps = ();
///     type GuardId = LampGuard;
///     type ActionId = LampAction;
///     type ServiceId = LampService;
///     type ServiceOutput = ();
///     type ServiceError = std::convert::Infallible;
///
///     fn kind_of(event: &LampEvent) -> LampEventKind { event.kind() }
/// }
/// ```
pub trait Statechart: Sized + 'static {
    /// Enumerated state identifiers. One flat enum covers every nesting level;
    /// hierarchy is described by the machine definition, not the identifier.
    type StateId: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// External events delivered through a handle, payload included.
    type Event: Debug + Send + 'static;

    /// Payload-free event discriminant used to key transition tables.
    type EventKind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Machine-private state. Mutated only by actions; guards and services see
    /// it read-only. Cloned into every published [`Snapshot`](crate::Snapshot).
    type Context: Clone + Debug + Send + Sync + 'static;

    /// Opaque external dependencies (API clients, navigation, reporting).
    /// Injected at construction, passed unchanged to services and spawned
    /// children, never inspected by the interpreter itself.
    type Deps: Clone + Send + Sync + 'static;

    /// Identifiers for guard predicates registered in a
    /// [`BehaviorRegistry`](crate::BehaviorRegistry).
    type GuardId: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Identifiers for registered actions.
    type ActionId: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Identifiers for registered services.
    type ServiceId: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Success payload produced by invoked services. Machines with several
    /// services typically use one enum with a variant per service.
    type ServiceOutput: Debug + Send + 'static;

    /// Failure payload produced by invoked services.
    type ServiceError: Debug + Display + Send + 'static;

    /// Maps an event to the discriminant transition tables are keyed by.
    fn kind_of(event: &Self::Event) -> Self::EventKind;
}
