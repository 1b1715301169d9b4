//! # Feed Machine
//!
//! The child actor a profile machine spawns per feed: one instance for the
//! activities list, one for the followers list. It loads its feed on start,
//! reloads on `Refresh`, and parks in a terminal `Stalled` state when the
//! load fails. It shares the parent's [`ProfileDeps`] handle; the parent only
//! ever talks to it through the `ActorRef` it got back from the spawn.

use crate::clients::ApiError;
use crate::model::{EntityId, EntityKind, FeedItem, FeedKind};
use crate::profile::ProfileDeps;
use statechart::{
    BehaviorRegistry, DefinitionError, Invoke, Machine, MachineBuilder, StateNode, Statechart,
    Transition,
};
use std::sync::Arc;

pub struct FeedChart;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeedState {
    Loading,
    Idle,
    Stalled,
}

#[derive(Debug)]
pub enum FeedEvent {
    Refresh,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeedEventKind {
    Refresh,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeedGuard {}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeedAction {
    AssignItems,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FeedService {
    LoadFeed,
}

#[derive(Clone, Debug)]
pub struct FeedContext {
    pub kind: EntityKind,
    pub feed: FeedKind,
    pub entity_id: EntityId,
    pub items: Vec<FeedItem>,
}

impl FeedContext {
    pub fn new(kind: EntityKind, feed: FeedKind, entity_id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            feed,
            entity_id: entity_id.into(),
            items: Vec::new(),
        }
    }
}

impl Statechart for FeedChart {
    type StateId = FeedState;
    type Event = FeedEvent;
    type EventKind = FeedEventKind;
    type Context = FeedContext;
    type Deps = ProfileDeps;
    type GuardId = FeedGuard;
    type ActionId = FeedAction;
    type ServiceId = FeedService;
    type ServiceOutput = Vec<FeedItem>;
    type ServiceError = ApiError;

    fn kind_of(event: &FeedEvent) -> FeedEventKind {
        match event {
            FeedEvent::Refresh => FeedEventKind::Refresh,
        }
    }
}

/// Builds the feed machine. One shared instance is carried in
/// [`ProfileDeps`] and cloned per spawn.
pub fn machine() -> Result<Machine<FeedChart>, DefinitionError> {
    let registry = BehaviorRegistry::<FeedChart>::new()
        .action(FeedAction::AssignItems, |scope, trigger| {
            if let Some(items) = trigger.output() {
                scope.context.items = items.clone();
            }
        })
        .service(FeedService::LoadFeed, |ctx, deps| {
            let api = Arc::clone(&deps.api);
            let kind = ctx.kind;
            let feed = ctx.feed;
            let id = ctx.entity_id.clone();
            Box::pin(async move { api.query_feed(kind, &id, feed).await })
        });

    MachineBuilder::<FeedChart>::new("feed")
        .initial(FeedState::Loading)
        .state(
            StateNode::new(FeedState::Loading).invoke(
                Invoke::new(FeedService::LoadFeed)
                    .on_done(Transition::to(FeedState::Idle).action(FeedAction::AssignItems))
                    .on_error(Transition::to(FeedState::Stalled)),
            ),
        )
        .state(
            StateNode::new(FeedState::Idle)
                .on(FeedEventKind::Refresh, Transition::to(FeedState::Loading)),
        )
        .state(StateNode::final_state(FeedState::Stalled).meta("feed load failed"))
        .build(registry)
}
