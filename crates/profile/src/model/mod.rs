//! # Domain Model
//!
//! Pure data structures shared by the profile and feed machines. No behavior
//! lives here; machines mutate these through actions only.

mod entity;
mod feed;

pub use entity::{slug_is_valid, Entity, EntityId, EntityKind};
pub use feed::{FeedItem, FeedKind};
