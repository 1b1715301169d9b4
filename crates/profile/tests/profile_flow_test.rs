use profile::clients::{FixtureApi, RecordingNavigator, RecordingReporter};
use profile::lifecycle::ProfileSystem;
use profile::model::{Entity, EntityKind, FeedKind};
use profile::profile::{ProfileEvent, ProfileState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn acme() -> Entity {
    Entity {
        id: "c-1".to_string(),
        slug: "acme-co".to_string(),
        name: "Acme Co".to_string(),
        description: "A community for everything Acme".to_string(),
        follower_count: 41,
    }
}

struct Harness {
    system: ProfileSystem,
    api: Arc<FixtureApi>,
    navigator: Arc<RecordingNavigator>,
    reporter: Arc<RecordingReporter>,
}

fn start(slug: &str, api: FixtureApi) -> Harness {
    let api = Arc::new(api);
    let navigator = Arc::new(RecordingNavigator::new());
    let reporter = Arc::new(RecordingReporter::new());
    let system = ProfileSystem::new(
        EntityKind::Community,
        slug,
        api.clone(),
        navigator.clone(),
        reporter.clone(),
    )
    .unwrap();
    Harness {
        system,
        api,
        navigator,
        reporter,
    }
}

async fn wait_until(label: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {label}");
}

#[tokio::test]
async fn an_invalid_slug_is_not_found_without_touching_the_api() {
    for slug in ["", "Acme Co", "acme_co"] {
        let h = start(slug, FixtureApi::new().with_entity(EntityKind::Community, acme()));
        let mut snapshots = h.system.handle.subscribe();
        let snapshot = snapshots.wait_for(|s| s.done).await.unwrap().clone();
        assert_eq!(snapshot.leaf(), Some(ProfileState::NotFound), "slug {slug:?}");
        assert_eq!(snapshot.meta, vec!["profile not found".to_string()]);
        assert_eq!(h.api.entity_queries(), 0, "slug {slug:?}");
        assert_eq!(h.navigator.paths(), vec!["/communities/not-found".to_string()]);
    }
}

#[tokio::test]
async fn a_valid_slug_queries_the_entity_exactly_once() {
    let h = start("acme-co", FixtureApi::new().with_entity(EntityKind::Community, acme()));
    let mut snapshots = h.system.handle.subscribe();
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Loaded))
        .await
        .unwrap()
        .clone();

    // No auth status yet: the unknown branch falls through to unauthenticated.
    assert_eq!(
        snapshot.configuration,
        vec![ProfileState::Loaded, ProfileState::Unauthenticated]
    );
    assert_eq!(snapshot.context.entity.as_ref().map(|e| e.id.as_str()), Some("c-1"));
    assert_eq!(h.api.entity_queries(), 1);
    assert!(h.navigator.paths().is_empty());
}

#[tokio::test]
async fn an_unknown_slug_is_not_found_and_navigates_away() {
    let h = start("ghost-co", FixtureApi::new());
    let mut snapshots = h.system.handle.subscribe();
    let snapshot = snapshots.wait_for(|s| s.done).await.unwrap().clone();
    assert_eq!(snapshot.leaf(), Some(ProfileState::NotFound));
    assert_eq!(h.api.entity_queries(), 1);
    assert_eq!(h.navigator.paths(), vec!["/communities/not-found".to_string()]);
}

#[tokio::test]
async fn an_entity_query_failure_is_reported() {
    let h = start(
        "acme-co",
        FixtureApi::new()
            .with_entity(EntityKind::Community, acme())
            .with_failing_entity_queries(),
    );
    let mut snapshots = h.system.handle.subscribe();
    let snapshot = snapshots.wait_for(|s| s.done).await.unwrap().clone();
    assert_eq!(snapshot.leaf(), Some(ProfileState::Error));
    assert_eq!(snapshot.meta, vec!["profile load failed".to_string()]);

    let reports = h.reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, EntityKind::Community);
    assert_eq!(reports[0].1, "acme-co");
    assert!(h.navigator.paths().is_empty());
}

#[tokio::test]
async fn signing_in_loads_follow_status_and_both_feeds() {
    let h = start(
        "acme-co",
        FixtureApi::new()
            .with_entity(EntityKind::Community, acme())
            .with_following(EntityKind::Community, "c-1"),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();

    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap()
        .clone();
    assert_eq!(
        snapshot.configuration,
        vec![
            ProfileState::Loaded,
            ProfileState::Authenticated,
            ProfileState::Ready
        ]
    );
    assert!(snapshot.context.is_following);

    let api = Arc::clone(&h.api);
    wait_until("activities feed loaded", move || {
        api.feed_queries(FeedKind::Activities) == 1
    })
    .await;
    let api = Arc::clone(&h.api);
    wait_until("followers feed loaded", move || {
        api.feed_queries(FeedKind::Followers) == 1
    })
    .await;
}

#[tokio::test]
async fn an_auth_event_during_loading_is_recorded_not_lost() {
    let gate = Arc::new(Notify::new());
    let h = start(
        "acme-co",
        FixtureApi::new()
            .with_entity(EntityKind::Community, acme())
            .with_entity_gate(Arc::clone(&gate)),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Loading))
        .await
        .unwrap();

    // Arrives while the entity query is still in flight.
    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    snapshots
        .wait_for(|s| s.context.is_authenticated)
        .await
        .unwrap();
    gate.notify_one();

    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap()
        .clone();
    assert!(snapshot.matches(ProfileState::Authenticated));
}

#[tokio::test]
async fn repeated_auth_events_reresolve_the_auth_subtree() {
    let h = start(
        "acme-co",
        FixtureApi::new().with_entity(EntityKind::Community, acme()),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();

    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap();
    assert_eq!(h.api.following_queries(), 1);

    // Same status again: the subtree re-resolves and reloads follow status.
    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    let api = Arc::clone(&h.api);
    wait_until("follow status reloaded", move || api.following_queries() == 2).await;
    snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap();

    // Signing out drops the whole authenticated branch.
    h.system.handle.send(ProfileEvent::Authenticated { status: false });
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap()
        .clone();
    assert_eq!(
        snapshot.configuration,
        vec![ProfileState::Loaded, ProfileState::Unauthenticated]
    );
}

#[tokio::test]
async fn follow_outside_ready_is_a_silent_no_op() {
    let h = start(
        "acme-co",
        FixtureApi::new().with_entity(EntityKind::Community, acme()),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();

    h.system.handle.send(ProfileEvent::Follow);
    // The machine must still be responsive afterwards.
    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap();
    assert_eq!(h.api.toggle_calls(), 0);
}

#[tokio::test]
async fn following_toggles_and_refreshes_the_followers_feed() {
    let h = start(
        "acme-co",
        FixtureApi::new().with_entity(EntityKind::Community, acme()),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();
    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap();

    h.system.handle.send(ProfileEvent::Follow);
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Ready) && s.context.is_following)
        .await
        .unwrap()
        .clone();
    assert!(snapshot.context.is_following);
    assert_eq!(h.api.toggle_calls(), 1);

    // Initial load plus exactly one refresh.
    let api = Arc::clone(&h.api);
    wait_until("followers feed refreshed once", move || {
        api.feed_queries(FeedKind::Followers) == 2
    })
    .await;
}

#[tokio::test]
async fn a_toggle_resolving_false_unfollows_and_still_refreshes() {
    let h = start(
        "acme-co",
        FixtureApi::new()
            .with_entity(EntityKind::Community, acme())
            .with_following(EntityKind::Community, "c-1"),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();
    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap()
        .clone();
    assert!(snapshot.context.is_following);

    h.system.handle.send(ProfileEvent::Follow);
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::Ready) && !s.context.is_following)
        .await
        .unwrap()
        .clone();
    assert!(!snapshot.context.is_following);
    assert_eq!(h.api.toggle_calls(), 1);

    let api = Arc::clone(&h.api);
    wait_until("followers feed refreshed once", move || {
        api.feed_queries(FeedKind::Followers) == 2
    })
    .await;
}

#[tokio::test]
async fn a_late_toggle_completion_never_lands() {
    let gate = Arc::new(Notify::new());
    let h = start(
        "acme-co",
        FixtureApi::new()
            .with_entity(EntityKind::Community, acme())
            .with_toggle_gate(Arc::clone(&gate)),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();
    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    snapshots
        .wait_for(|s| s.matches(ProfileState::Ready))
        .await
        .unwrap();

    h.system.handle.send(ProfileEvent::Follow);
    snapshots
        .wait_for(|s| s.matches(ProfileState::TogglingFollow))
        .await
        .unwrap();

    // Sign out while the toggle is in flight, then let it resolve late.
    h.system.handle.send(ProfileEvent::Authenticated { status: false });
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = h.system.handle.snapshot();
    assert_eq!(
        snapshot.configuration,
        vec![ProfileState::Loaded, ProfileState::Unauthenticated]
    );
    assert!(!snapshot.context.is_following, "stale toggle must not assign");
}

#[tokio::test]
async fn a_follow_status_failure_parks_in_follow_error() {
    let h = start(
        "acme-co",
        FixtureApi::new()
            .with_entity(EntityKind::Community, acme())
            .with_failing_following_queries(),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Unauthenticated))
        .await
        .unwrap();

    h.system.handle.send(ProfileEvent::Authenticated { status: true });
    let snapshot = snapshots
        .wait_for(|s| s.matches(ProfileState::FollowError))
        .await
        .unwrap()
        .clone();

    // Nested final: the follow branch is dead but the profile is still shown.
    assert!(!snapshot.done);
    assert_eq!(h.reporter.reports().len(), 1);
}

#[tokio::test]
async fn the_member_flavor_navigates_to_its_own_not_found_path() {
    let api = Arc::new(FixtureApi::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let reporter = Arc::new(RecordingReporter::new());
    let system = ProfileSystem::new(
        EntityKind::Member,
        "ghost",
        api,
        navigator.clone(),
        reporter,
    )
    .unwrap();

    let mut snapshots = system.handle.subscribe();
    snapshots.wait_for(|s| s.done).await.unwrap();
    assert_eq!(navigator.paths(), vec!["/members/not-found".to_string()]);
    system.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_the_machine_task() {
    let h = start(
        "acme-co",
        FixtureApi::new().with_entity(EntityKind::Community, acme()),
    );
    let mut snapshots = h.system.handle.subscribe();
    snapshots
        .wait_for(|s| s.matches(ProfileState::Loaded))
        .await
        .unwrap();
    h.system.shutdown().await;
}
