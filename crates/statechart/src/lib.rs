//! # Statechart
//!
//! A hierarchical, actor-spawning statechart interpreter for Tokio. Machines
//! are declared as typed, validated transition tables; each instance runs as
//! its own actor task, processing one event at a time and publishing an
//! observable [`Snapshot`] after every step.
//!
//! ## Architecture Overview
//!
//! The crate separates concerns into three layers:
//!
//! 1. **Definition Layer** ([`MachineBuilder`], [`StateNode`], [`Transition`],
//!    [`Invoke`]) — declarative data describing states (nested compound states
//!    included), guarded transition candidates, eventless transitions and
//!    service invocations. Validated once, at build time.
//! 2. **Behavior Layer** ([`BehaviorRegistry`], [`Statechart`]) — the closures
//!    behind guard/action/service identifiers, resolved through a registration
//!    map. A definition referencing an unregistered identifier does not build.
//! 3. **Runtime Layer** ([`Interpreter`], [`MachineHandle`], [`ActorRef`]) —
//!    the event loop and its client handles. Handles send events
//!    fire-and-forget; observers subscribe to snapshot publications.
//!
//! ## Semantics in Brief
//!
//! - Transition candidates are tried in declaration order; the first whose
//!   guard passes wins. An event no active state handles is silently ignored.
//! - Events bubble leaf to root: the deepest active state gets first refusal,
//!   then its ancestors, then machine-level handlers.
//! - Eventless (`always`) transitions re-resolve after every step until the
//!   configuration is stable, with a bounded iteration count to fail fast on
//!   cyclic tables.
//! - A state's service invocation is started on entry; its outcome returns as
//!   a synthetic completion. Exiting the state first makes the completion
//!   stale, and stale completions are discarded without touching context.
//! - Actions may spawn child interpreters; the parent owns their lifecycle
//!   and stops them when the spawning state exits or the parent stops.
//!
//! ## Example
//!
//! ```rust
//! use statechart::{
//!     BehaviorRegistry, Interpreter, MachineBuilder, StateNode, Statechart, Transition,
//! };
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum S { Off, On }
//! #[derive(Debug)]
//! enum Ev { Toggle }
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum Kind { Toggle }
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum G {}
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum A { Count }
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum Svc {}
//! #[derive(Clone, Debug, Default)]
//! struct Ctx { toggles: u32 }
//!
//! struct Lamp;
//!
//! impl Statechart for Lamp {
//!     type StateId = S;
//!     type Event = Ev;
//!     type EventKind = Kind;
//!     type Context = Ctx;
//!     type Deps = ();
//!     type GuardId = G;
//!     type ActionId = A;
//!     type ServiceId = Svc;
//!     type ServiceOutput = ();
//!     type ServiceError = std::convert::Infallible;
//!
//!     fn kind_of(_: &Ev) -> Kind { Kind::Toggle }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = BehaviorRegistry::<Lamp>::new()
//!         .action(A::Count, |scope, _| scope.context.toggles += 1);
//!     let machine = MachineBuilder::<Lamp>::new("lamp")
//!         .initial(S::Off)
//!         .state(StateNode::new(S::Off).on(Kind::Toggle, Transition::to(S::On).action(A::Count)))
//!         .state(StateNode::new(S::On).on(Kind::Toggle, Transition::to(S::Off).action(A::Count)))
//!         .build(registry)
//!         .unwrap();
//!
//!     let (interpreter, handle) = Interpreter::new(machine, Ctx::default(), ());
//!     tokio::spawn(interpreter.run());
//!
//!     handle.send(Ev::Toggle);
//!     let mut snapshots = handle.subscribe();
//!     snapshots.wait_for(|s| s.matches(S::On)).await.unwrap();
//!     assert_eq!(handle.snapshot().context.toggles, 1);
//!     handle.stop().await;
//! }
//! ```

pub mod chart;
pub mod definition;
pub mod error;
pub mod handle;
pub mod interpreter;
pub mod registry;
pub mod snapshot;
pub mod tracing;

// Re-export core types for convenience
pub use chart::Statechart;
pub use definition::{Invoke, Machine, MachineBuilder, MachineDefinition, StateKind, StateNode, Transition};
pub use error::DefinitionError;
pub use handle::{ActorRef, MachineHandle};
pub use interpreter::Interpreter;
pub use registry::{ActionScope, BehaviorRegistry, ServiceFuture, Trigger};
pub use snapshot::Snapshot;
