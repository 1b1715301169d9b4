//! # Profile API
//!
//! The async backend boundary. Absence is not an error: a slug that resolves
//! to nothing is `Ok(None)`, while `Err` means the call itself failed.

use crate::model::{Entity, EntityId, EntityKind, FeedItem, FeedKind};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of an API call, as opposed to a successful "nothing there" answer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Backend operations the profile and feed machines invoke as services.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Resolves a slug to an entity. `Ok(None)` means not found.
    async fn query_entity_by_slug(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> Result<Option<Entity>, ApiError>;

    /// Ids of all entities of `kind` the current session follows.
    async fn query_my_following(&self, kind: EntityKind) -> Result<Vec<EntityId>, ApiError>;

    /// Flips the follow relation for one entity; resolves to the new state.
    async fn toggle_follow(&self, kind: EntityKind, id: &EntityId) -> Result<bool, ApiError>;

    /// Loads one feed of an entity.
    async fn query_feed(
        &self,
        kind: EntityKind,
        id: &EntityId,
        feed: FeedKind,
    ) -> Result<Vec<FeedItem>, ApiError>;
}
