//! # Observability & Tracing
//!
//! Structured logging for interpreter runtimes. The run loop traces machine
//! lifecycle (start, stop, final states), every transition with its source
//! state and event kind, invocation starts/completions, and stale-completion
//! drops — all as structured fields filterable via `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info cargo run      # lifecycle and final states
//! RUST_LOG=debug cargo run     # every transition, entry/exit, drop
//! ```

/// Initializes the subscriber for the whole process. Call once, early.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // machine ids carry the context instead
        .compact()
        .init();
}
