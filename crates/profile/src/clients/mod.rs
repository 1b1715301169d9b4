//! # Collaborators
//!
//! The interface boundary between the machines and the outside world. The
//! machines only ever see these traits through `ProfileDeps`; swapping the
//! implementations (real transport vs. the in-memory fixtures) changes no
//! machine code.

mod api;
mod fixture;
mod navigator;
mod reporter;

pub use api::{ApiError, ProfileApi};
pub use fixture::{FixtureApi, RecordingNavigator, RecordingReporter};
pub use navigator::Navigator;
pub use reporter::ErrorReporter;
