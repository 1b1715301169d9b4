//! # Profile Demo
//!
//! Drives one community profile screen end to end against the in-memory
//! fixtures: load by slug, sign in, follow, and show the resulting snapshot.
//!
//! ```bash
//! RUST_LOG=info cargo run -p profile      # lifecycle and transitions
//! RUST_LOG=debug cargo run -p profile     # every dispatch, entry/exit
//! ```

use profile::clients::{FixtureApi, RecordingNavigator, RecordingReporter};
use profile::lifecycle::ProfileSystem;
use profile::model::{Entity, EntityKind};
use profile::profile::{ProfileEvent, ProfileState};
use statechart::tracing::setup_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    info!("Starting profile demo");

    let entity = Entity {
        id: "c-1".to_string(),
        slug: "acme-co".to_string(),
        name: "Acme Co".to_string(),
        description: "A community for everything Acme".to_string(),
        follower_count: 41,
    };
    let api = Arc::new(FixtureApi::new().with_entity(EntityKind::Community, entity));
    let navigator = Arc::new(RecordingNavigator::new());
    let reporter = Arc::new(RecordingReporter::new());

    let system = ProfileSystem::new(
        EntityKind::Community,
        "acme-co",
        api.clone(),
        navigator,
        reporter,
    )?;
    let mut snapshots = system.handle.subscribe();

    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Loaded))
        .await?
        .clone();
    let name = snapshot
        .context
        .entity
        .as_ref()
        .map(|e| e.name.clone())
        .unwrap_or_default();
    info!(entity = %name, "Profile loaded");

    info!("Signing in");
    system.handle.send(ProfileEvent::Authenticated { status: true });
    snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await?;
    info!(
        is_following = system.handle.snapshot().context.is_following,
        "Follow status resolved"
    );

    info!("Following the community");
    system.handle.send(ProfileEvent::Follow);
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Ready) && s.context.is_following)
        .await?
        .clone();
    info!(
        configuration = ?snapshot.configuration,
        is_following = snapshot.context.is_following,
        "Follow completed"
    );

    system.shutdown().await;

    info!("Demo completed successfully");
    Ok(())
}
