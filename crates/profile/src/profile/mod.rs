//! # Profile Machine
//!
//! The statechart behind one profile screen. A single definition serves both
//! entity kinds; the thin [`community`] and [`member`] modules pin the kind
//! and hand back a ready-to-spawn interpreter.
//!
//! Flow: the slug is validated before anything touches the network, the
//! entity is loaded exactly once, and the authentication-dependent half
//! re-resolves from `Unknown` every time an `Authenticated` event lands.
//! While an entity is shown, two feed children run alongside: `activities`
//! for every visitor (owned by `Loaded`), `followers` only for signed-in
//! sessions (owned by `Authenticated`, so it is torn down on sign-out).
//!
//! ## Architecture Note
//!
//! Authentication can change at any moment, including mid-load. A top-level
//! internal handler records the status without moving states, so an event
//! arriving during `Loading` is not lost: once `Loaded.Unknown` is entered,
//! its eventless candidates route on the recorded value.

pub mod community;
pub mod member;

use crate::clients::{ApiError, ErrorReporter, Navigator, ProfileApi};
use crate::feed::{self, FeedChart, FeedContext, FeedEvent};
use crate::model::{slug_is_valid, Entity, EntityId, EntityKind, FeedKind};
use statechart::{
    ActorRef, BehaviorRegistry, DefinitionError, Invoke, Machine, MachineBuilder, StateNode,
    Statechart, Transition,
};
use std::sync::Arc;

pub struct ProfileChart;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProfileState {
    Validating,
    Loading,
    NotFound,
    Error,
    Loaded,
    Unknown,
    Unauthenticated,
    Authenticated,
    LoadingFollowStatus,
    Ready,
    TogglingFollow,
    FollowError,
}

#[derive(Debug)]
pub enum ProfileEvent {
    /// Session authentication status changed (or was first resolved).
    Authenticated { status: bool },
    /// The visitor asked to follow or unfollow the shown entity.
    Follow,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProfileEventKind {
    Authenticated,
    Follow,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProfileGuard {
    SlugValid,
    EntityFound,
    IsAuthenticated,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProfileAction {
    AssignEntity,
    AssignAuthStatus,
    AssignFollowStatus,
    AssignToggleResult,
    NotifyFollowersRefresh,
    SpawnActivities,
    SpawnFollowers,
    NavigateToNotFound,
    ReportError,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ProfileService {
    QueryEntity,
    QueryFollowing,
    ToggleFollow,
}

/// Payload of a resolved profile service.
#[derive(Debug)]
pub enum ProfileOutcome {
    Entity(Option<Entity>),
    Following(Vec<EntityId>),
    FollowToggled(bool),
}

#[derive(Clone, Debug)]
pub struct ProfileContext {
    pub kind: EntityKind,
    pub slug: String,
    pub entity: Option<Entity>,
    pub is_following: bool,
    pub is_authenticated: bool,
    pub followers: Option<ActorRef<FeedChart>>,
    pub activities: Option<ActorRef<FeedChart>>,
}

impl ProfileContext {
    pub fn new(kind: EntityKind, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
            entity: None,
            is_following: false,
            is_authenticated: false,
            followers: None,
            activities: None,
        }
    }
}

/// The one external handle every service and spawned child sees.
#[derive(Clone)]
pub struct ProfileDeps {
    pub api: Arc<dyn ProfileApi>,
    pub navigator: Arc<dyn Navigator>,
    pub reporter: Arc<dyn ErrorReporter>,
    /// Shared feed definition, cloned into each spawned child.
    pub feed: Machine<FeedChart>,
}

impl ProfileDeps {
    pub fn new(
        api: Arc<dyn ProfileApi>,
        navigator: Arc<dyn Navigator>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self, DefinitionError> {
        Ok(Self {
            api,
            navigator,
            reporter,
            feed: feed::machine()?,
        })
    }
}

impl Statechart for ProfileChart {
    type StateId = ProfileState;
    type Event = ProfileEvent;
    type EventKind = ProfileEventKind;
    type Context = ProfileContext;
    type Deps = ProfileDeps;
    type GuardId = ProfileGuard;
    type ActionId = ProfileAction;
    type ServiceId = ProfileService;
    type ServiceOutput = ProfileOutcome;
    type ServiceError = ApiError;

    fn kind_of(event: &ProfileEvent) -> ProfileEventKind {
        match event {
            ProfileEvent::Authenticated { .. } => ProfileEventKind::Authenticated,
            ProfileEvent::Follow => ProfileEventKind::Follow,
        }
    }
}

fn registry() -> BehaviorRegistry<ProfileChart> {
    use ProfileAction as A;
    use ProfileGuard as G;
    use ProfileService as Svc;

    BehaviorRegistry::<ProfileChart>::new()
        .guard(G::SlugValid, |ctx, _| slug_is_valid(&ctx.slug))
        .guard(G::EntityFound, |_, trigger| {
            matches!(trigger.output(), Some(ProfileOutcome::Entity(Some(_))))
        })
        .guard(G::IsAuthenticated, |ctx, _| ctx.is_authenticated)
        .action(A::AssignEntity, |scope, trigger| {
            if let Some(ProfileOutcome::Entity(entity)) = trigger.output() {
                scope.context.entity = entity.clone();
            }
        })
        .action(A::AssignAuthStatus, |scope, trigger| {
            if let Some(ProfileEvent::Authenticated { status }) = trigger.event() {
                scope.context.is_authenticated = *status;
            }
        })
        .action(A::AssignFollowStatus, |scope, trigger| {
            if let Some(ProfileOutcome::Following(ids)) = trigger.output() {
                scope.context.is_following = scope
                    .context
                    .entity
                    .as_ref()
                    .is_some_and(|entity| ids.contains(&entity.id));
            }
        })
        .action(A::AssignToggleResult, |scope, trigger| {
            if let Some(ProfileOutcome::FollowToggled(now_following)) = trigger.output() {
                scope.context.is_following = *now_following;
            }
        })
        .action(A::NotifyFollowersRefresh, |scope, _| {
            if let Some(followers) = &scope.context.followers {
                followers.send(FeedEvent::Refresh);
            }
        })
        .action(A::SpawnActivities, |scope, _| {
            let Some(entity) = scope.context.entity.clone() else {
                return;
            };
            let machine = scope.deps.feed.clone();
            let deps = scope.deps.clone();
            let context = FeedContext::new(scope.context.kind, FeedKind::Activities, entity.id);
            let actor = scope.spawn_child("activities", machine, context, deps);
            scope.context.activities = Some(actor);
        })
        .action(A::SpawnFollowers, |scope, _| {
            let Some(entity) = scope.context.entity.clone() else {
                return;
            };
            let machine = scope.deps.feed.clone();
            let deps = scope.deps.clone();
            let context = FeedContext::new(scope.context.kind, FeedKind::Followers, entity.id);
            let actor = scope.spawn_child("followers", machine, context, deps);
            scope.context.followers = Some(actor);
        })
        .action(A::NavigateToNotFound, |scope, _| {
            scope
                .deps
                .navigator
                .navigate_to(scope.context.kind.not_found_path());
        })
        .action(A::ReportError, |scope, trigger| {
            if let Some(error) = trigger.error() {
                scope
                    .deps
                    .reporter
                    .report(error, scope.context.kind, &scope.context.slug);
            }
        })
        .service(Svc::QueryEntity, |ctx, deps| {
            let api = Arc::clone(&deps.api);
            let kind = ctx.kind;
            let slug = ctx.slug.clone();
            Box::pin(async move {
                api.query_entity_by_slug(kind, &slug)
                    .await
                    .map(ProfileOutcome::Entity)
            })
        })
        .service(Svc::QueryFollowing, |ctx, deps| {
            let api = Arc::clone(&deps.api);
            let kind = ctx.kind;
            Box::pin(async move {
                api.query_my_following(kind)
                    .await
                    .map(ProfileOutcome::Following)
            })
        })
        .service(Svc::ToggleFollow, |ctx, deps| {
            let api = Arc::clone(&deps.api);
            let kind = ctx.kind;
            let id = ctx.entity.as_ref().map(|entity| entity.id.clone());
            Box::pin(async move {
                // Unreachable from the machine: ToggleFollow is only invoked
                // below Loaded, where an entity is always assigned.
                let Some(id) = id else {
                    return Err(ApiError::Rejected("no entity loaded".to_string()));
                };
                api.toggle_follow(kind, &id)
                    .await
                    .map(ProfileOutcome::FollowToggled)
            })
        })
}

/// Builds the profile machine for one entity kind's screen.
pub fn machine(kind: EntityKind) -> Result<Machine<ProfileChart>, DefinitionError> {
    use ProfileAction as A;
    use ProfileEventKind as Ev;
    use ProfileGuard as G;
    use ProfileService as Svc;
    use ProfileState as S;

    MachineBuilder::<ProfileChart>::new(kind.label())
        .initial(S::Validating)
        .state(
            StateNode::new(S::Validating)
                .always(Transition::to(S::Loading).guard(G::SlugValid))
                .always(Transition::to(S::NotFound)),
        )
        .state(
            StateNode::new(S::Loading).invoke(
                Invoke::new(Svc::QueryEntity)
                    .on_done(
                        Transition::to(S::Loaded)
                            .guard(G::EntityFound)
                            .action(A::AssignEntity),
                    )
                    .on_done(Transition::to(S::NotFound))
                    .on_error(Transition::to(S::Error).action(A::ReportError)),
            ),
        )
        .state(
            StateNode::final_state(S::NotFound)
                .meta("profile not found")
                .entry(A::NavigateToNotFound),
        )
        .state(StateNode::final_state(S::Error).meta("profile load failed"))
        .state(
            StateNode::new(S::Loaded)
                .entry(A::SpawnActivities)
                .initial(S::Unknown)
                .child(
                    StateNode::new(S::Unknown)
                        .always(Transition::to(S::Authenticated).guard(G::IsAuthenticated))
                        .always(Transition::to(S::Unauthenticated)),
                )
                .child(StateNode::new(S::Unauthenticated))
                .child(
                    StateNode::new(S::Authenticated)
                        .entry(A::SpawnFollowers)
                        .initial(S::LoadingFollowStatus)
                        .child(
                            StateNode::new(S::LoadingFollowStatus).invoke(
                                Invoke::new(Svc::QueryFollowing)
                                    .on_done(
                                        Transition::to(S::Ready).action(A::AssignFollowStatus),
                                    )
                                    .on_error(
                                        Transition::to(S::FollowError).action(A::ReportError),
                                    ),
                            ),
                        )
                        .child(
                            StateNode::new(S::Ready)
                                .on(Ev::Follow, Transition::to(S::TogglingFollow)),
                        )
                        .child(
                            StateNode::new(S::TogglingFollow).invoke(
                                Invoke::new(Svc::ToggleFollow)
                                    .on_done(
                                        Transition::to(S::Ready)
                                            .action(A::AssignToggleResult)
                                            .action(A::NotifyFollowersRefresh),
                                    )
                                    .on_error(
                                        Transition::to(S::FollowError).action(A::ReportError),
                                    ),
                            ),
                        )
                        .child(
                            StateNode::final_state(S::FollowError).meta("follow action failed"),
                        ),
                )
                // Any auth change re-resolves the whole auth subtree.
                .on(
                    Ev::Authenticated,
                    Transition::to(S::Unknown).action(A::AssignAuthStatus),
                ),
        )
        // Auth events arriving before Loaded only record the status.
        .on(
            Ev::Authenticated,
            Transition::internal().action(A::AssignAuthStatus),
        )
        .build(registry())
}
