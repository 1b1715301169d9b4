use serde::{Deserialize, Serialize};

pub type EntityId = String;

/// A profile-like entity: a community or an individual member. Both flavors
/// share one shape; the machines treat them uniformly and only [`EntityKind`]
/// varies routing and API calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub follower_count: u32,
}

impl Entity {
    pub fn new(
        id: impl Into<EntityId>,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: name.into(),
            description: String::new(),
            follower_count: 0,
        }
    }
}

/// Which flavor of profile a machine instance serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Community,
    Member,
}

impl EntityKind {
    /// Where the navigator is pointed when the slug resolves to nothing.
    pub fn not_found_path(self) -> &'static str {
        match self {
            EntityKind::Community => "/communities/not-found",
            EntityKind::Member => "/members/not-found",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Community => "community",
            EntityKind::Member => "member",
        }
    }
}

/// A slug is routable when it is non-empty lowercase alphanumeric with
/// hyphens. Checked before any API call is made.
pub fn slug_is_valid(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
