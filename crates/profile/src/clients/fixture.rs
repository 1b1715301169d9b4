//! # In-Memory Fixtures
//!
//! Deterministic collaborator implementations for the demo binary and the
//! integration tests. [`FixtureApi`] keeps its data behind plain mutexes,
//! counts every call, and can hold individual calls open behind a
//! [`Notify`] gate so tests can interleave completions with events.

use crate::clients::{ApiError, ErrorReporter, Navigator, ProfileApi};
use crate::model::{Entity, EntityId, EntityKind, FeedItem, FeedKind};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// In-memory [`ProfileApi`] with call counters and completion gates.
#[derive(Default)]
pub struct FixtureApi {
    entities: Mutex<HashMap<(EntityKind, String), Entity>>,
    following: Mutex<HashSet<(EntityKind, EntityId)>>,
    fail_entity_queries: AtomicBool,
    fail_following_queries: AtomicBool,
    entity_gate: Option<Arc<Notify>>,
    toggle_gate: Option<Arc<Notify>>,
    entity_queries: AtomicUsize,
    following_queries: AtomicUsize,
    toggle_calls: AtomicUsize,
    followers_feed_queries: AtomicUsize,
    activities_feed_queries: AtomicUsize,
}

impl FixtureApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entity, keyed by its kind and slug.
    pub fn with_entity(self, kind: EntityKind, entity: Entity) -> Self {
        {
            let mut entities = self.entities.lock().unwrap();
            entities.insert((kind, entity.slug.clone()), entity);
        }
        self
    }

    /// Marks an entity as already followed by the current session.
    pub fn with_following(self, kind: EntityKind, id: impl Into<EntityId>) -> Self {
        {
            let mut following = self.following.lock().unwrap();
            following.insert((kind, id.into()));
        }
        self
    }

    /// Makes every entity query fail with a transport error.
    pub fn with_failing_entity_queries(self) -> Self {
        self.fail_entity_queries.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every following query fail with a transport error.
    pub fn with_failing_following_queries(self) -> Self {
        self.fail_following_queries.store(true, Ordering::SeqCst);
        self
    }

    /// Holds entity queries open until `gate` is notified.
    pub fn with_entity_gate(mut self, gate: Arc<Notify>) -> Self {
        self.entity_gate = Some(gate);
        self
    }

    /// Holds toggle calls open until `gate` is notified.
    pub fn with_toggle_gate(mut self, gate: Arc<Notify>) -> Self {
        self.toggle_gate = Some(gate);
        self
    }

    pub fn entity_queries(&self) -> usize {
        self.entity_queries.load(Ordering::SeqCst)
    }

    pub fn following_queries(&self) -> usize {
        self.following_queries.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }

    pub fn feed_queries(&self, feed: FeedKind) -> usize {
        match feed {
            FeedKind::Followers => self.followers_feed_queries.load(Ordering::SeqCst),
            FeedKind::Activities => self.activities_feed_queries.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl ProfileApi for FixtureApi {
    async fn query_entity_by_slug(
        &self,
        kind: EntityKind,
        slug: &str,
    ) -> Result<Option<Entity>, ApiError> {
        self.entity_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.entity_gate {
            gate.notified().await;
        }
        if self.fail_entity_queries.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("entity query failed".to_string()));
        }
        let entities = self.entities.lock().unwrap();
        Ok(entities.get(&(kind, slug.to_string())).cloned())
    }

    async fn query_my_following(&self, kind: EntityKind) -> Result<Vec<EntityId>, ApiError> {
        self.following_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_following_queries.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("following query failed".to_string()));
        }
        let following = self.following.lock().unwrap();
        Ok(following
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn toggle_follow(&self, kind: EntityKind, id: &EntityId) -> Result<bool, ApiError> {
        self.toggle_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.toggle_gate {
            gate.notified().await;
        }
        let mut following = self.following.lock().unwrap();
        let key = (kind, id.clone());
        if following.remove(&key) {
            Ok(false)
        } else {
            following.insert(key);
            Ok(true)
        }
    }

    async fn query_feed(
        &self,
        kind: EntityKind,
        id: &EntityId,
        feed: FeedKind,
    ) -> Result<Vec<FeedItem>, ApiError> {
        match feed {
            FeedKind::Followers => self.followers_feed_queries.fetch_add(1, Ordering::SeqCst),
            FeedKind::Activities => self.activities_feed_queries.fetch_add(1, Ordering::SeqCst),
        };
        let _ = kind;
        Ok((1..=3)
            .map(|n| FeedItem {
                id: format!("{id}-{}-{n}", feed.label()),
                title: format!("{} item {n}", feed.label()),
            })
            .collect())
    }
}

/// [`Navigator`] that records every path it was pointed at.
#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

/// [`ErrorReporter`] that records every report.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(EntityKind, String, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(kind, slug, rendered error)` triples, oldest first.
    pub fn reports(&self) -> Vec<(EntityKind, String, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &ApiError, kind: EntityKind, slug: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((kind, slug.to_string(), error.to_string()));
    }
}
