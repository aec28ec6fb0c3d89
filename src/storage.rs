//! Persistence interface
//!
//! One backend trait over every collection the core persists. All reads on
//! the turn path are wrapped by their subsystem so a failing backend
//! degrades to an empty/default contribution instead of aborting the turn.
//! Backends must provide per-row atomic upsert/update semantics; the core
//! itself takes no locks.

use crate::error::Result;
use crate::goals::{Goal, GoalStatus};
use crate::knowledge::{EntityType, KnowledgeEntity, KnowledgeRelationship};
use crate::learning::{FeedbackEntry, Learnings};
use crate::proactive::ProactiveInsight;
use crate::reflection::ReflectionRecord;
use crate::types::{ConversationTurn, Memory, Tenant, UserSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Aggregate counters for one tenant's persisted state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageStats {
    pub memories: usize,
    pub goals: usize,
    pub entities: usize,
    pub relationships: usize,
    pub feedback: usize,
    pub reflections: usize,
    pub insights: usize,
    pub turns: usize,
}

/// Storage backend trait - abstracts over the datastore
#[async_trait]
pub trait Storage: Send + Sync {
    // -- memories (written externally, read as context) --

    /// Insert a memory
    async fn add_memory(&self, memory: &Memory) -> Result<()>;

    /// Top memories by importance (descending)
    async fn top_memories(&self, tenant: &Tenant, limit: i64) -> Result<Vec<Memory>>;

    /// Delete a memory on explicit user request
    async fn delete_memory(&self, tenant: &Tenant, id: &str) -> Result<bool>;

    // -- goals --

    async fn insert_goal(&self, goal: &Goal) -> Result<()>;
    async fn update_goal(&self, goal: &Goal) -> Result<()>;
    async fn get_goal(&self, tenant: &Tenant, id: &str) -> Result<Option<Goal>>;
    async fn goals_by_status(&self, tenant: &Tenant, status: GoalStatus) -> Result<Vec<Goal>>;
    async fn all_goals(&self, tenant: &Tenant) -> Result<Vec<Goal>>;

    // -- knowledge entities --

    async fn insert_entity(&self, tenant: &Tenant, entity: &KnowledgeEntity) -> Result<()>;
    async fn update_entity(&self, tenant: &Tenant, entity: &KnowledgeEntity) -> Result<()>;

    /// Case-insensitive name lookup within the tenant
    async fn find_entity_by_name(
        &self,
        tenant: &Tenant,
        name: &str,
    ) -> Result<Option<KnowledgeEntity>>;

    /// Entities whose names contain any keyword (case-insensitive), most
    /// mentioned first
    async fn search_entities(
        &self,
        tenant: &Tenant,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<KnowledgeEntity>>;

    /// Entities ordered by mention count (descending)
    async fn most_mentioned_entities(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<Vec<KnowledgeEntity>>;

    /// Entity counts grouped by type
    async fn entity_type_counts(&self, tenant: &Tenant) -> Result<Vec<(EntityType, usize)>>;

    // -- knowledge relationships --

    async fn insert_relationship(
        &self,
        tenant: &Tenant,
        relationship: &KnowledgeRelationship,
    ) -> Result<()>;

    /// Whether the exact (source, target, type) tuple already exists
    async fn relationship_exists(
        &self,
        tenant: &Tenant,
        source_entity_id: &str,
        target_entity_id: &str,
        relationship_type: &str,
    ) -> Result<bool>;

    /// Relationships where the entity is either endpoint
    async fn relationships_for_entity(
        &self,
        tenant: &Tenant,
        entity_id: &str,
    ) -> Result<Vec<KnowledgeRelationship>>;

    async fn relationship_count(&self, tenant: &Tenant) -> Result<usize>;

    // -- feedback (append-only) --

    async fn insert_feedback(&self, entry: &FeedbackEntry) -> Result<()>;
    async fn feedback_count(&self, tenant: &Tenant) -> Result<usize>;

    /// Most recent feedback first
    async fn recent_feedback(&self, tenant: &Tenant, limit: i64) -> Result<Vec<FeedbackEntry>>;
    async fn all_feedback(&self, tenant: &Tenant) -> Result<Vec<FeedbackEntry>>;

    // -- learnings (one row per tenant, fully overwritten) --

    async fn upsert_learnings(&self, tenant: &Tenant, learnings: &Learnings) -> Result<()>;
    async fn get_learnings(&self, tenant: &Tenant) -> Result<Option<Learnings>>;

    // -- reflections (append-only audit records) --

    async fn insert_reflection(&self, record: &ReflectionRecord) -> Result<()>;
    async fn reflections_since(
        &self,
        tenant: &Tenant,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReflectionRecord>>;

    /// Most recent reflections first
    async fn recent_reflections(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<Vec<ReflectionRecord>>;

    // -- proactive insights (append-only, expiry-filtered reads) --

    async fn insert_insights(
        &self,
        tenant: &Tenant,
        insights: &[ProactiveInsight],
    ) -> Result<()>;

    /// Unexpired insights as of `now`, highest priority then newest first
    async fn pending_insights(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ProactiveInsight>>;

    // -- user settings --

    async fn get_settings(&self, tenant: &Tenant) -> Result<Option<UserSettings>>;
    async fn upsert_settings(&self, tenant: &Tenant, settings: &UserSettings) -> Result<()>;

    // -- conversation turns (written by the turn boundary) --

    async fn record_turn(&self, turn: &ConversationTurn) -> Result<()>;

    /// Most recent user-authored messages first
    async fn recent_user_messages(&self, tenant: &Tenant, limit: i64) -> Result<Vec<String>>;

    /// Timestamp of the tenant's most recent turn
    async fn last_turn_at(&self, tenant: &Tenant) -> Result<Option<DateTime<Utc>>>;

    /// Number of turns recorded for a session
    async fn session_turn_count(&self, session_id: &str) -> Result<usize>;

    // -- aggregates --

    async fn stats(&self, tenant: &Tenant) -> Result<StorageStats>;
}
