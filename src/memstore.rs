//! In-process storage backend
//!
//! Backs the full [`Storage`] trait with plain collections behind a single
//! async lock. Used by the test suite and useful for demos or embedded
//! setups where durability does not matter.

use crate::error::Result;
use crate::goals::{Goal, GoalStatus};
use crate::knowledge::{EntityType, KnowledgeEntity, KnowledgeRelationship};
use crate::learning::{FeedbackEntry, Learnings};
use crate::proactive::ProactiveInsight;
use crate::reflection::ReflectionRecord;
use crate::storage::{Storage, StorageStats};
use crate::types::{ConversationTurn, Memory, Tenant, TurnRole, UserSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    memories: Vec<Memory>,
    goals: Vec<Goal>,
    entities: HashMap<String, Vec<KnowledgeEntity>>,
    relationships: HashMap<String, Vec<KnowledgeRelationship>>,
    feedback: Vec<FeedbackEntry>,
    learnings: HashMap<String, Learnings>,
    reflections: Vec<ReflectionRecord>,
    insights: HashMap<String, Vec<ProactiveInsight>>,
    settings: HashMap<(String, String), UserSettings>,
    turns: Vec<ConversationTurn>,
}

/// Volatile [`Storage`] implementation
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_tenant(tenant: &Tenant, tenant_id: &str, user_id: &str) -> bool {
    tenant.tenant_id == tenant_id && tenant.user_id == user_id
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn add_memory(&self, memory: &Memory) -> Result<()> {
        self.inner.write().await.memories.push(memory.clone());
        Ok(())
    }

    async fn top_memories(&self, tenant: &Tenant, limit: i64) -> Result<Vec<Memory>> {
        let inner = self.inner.read().await;
        let mut memories: Vec<Memory> = inner
            .memories
            .iter()
            .filter(|m| same_tenant(tenant, &m.tenant_id, &m.user_id))
            .cloned()
            .collect();
        memories.sort_by(|a, b| b.importance.cmp(&a.importance));
        memories.truncate(limit.max(0) as usize);
        Ok(memories)
    }

    async fn delete_memory(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.memories.len();
        inner
            .memories
            .retain(|m| !(m.id == id && same_tenant(tenant, &m.tenant_id, &m.user_id)));
        Ok(inner.memories.len() < before)
    }

    async fn insert_goal(&self, goal: &Goal) -> Result<()> {
        self.inner.write().await.goals.push(goal.clone());
        Ok(())
    }

    async fn update_goal(&self, goal: &Goal) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.goals.iter_mut().find(|g| g.id == goal.id) {
            *existing = goal.clone();
        }
        Ok(())
    }

    async fn get_goal(&self, tenant: &Tenant, id: &str) -> Result<Option<Goal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .goals
            .iter()
            .find(|g| g.id == id && g.tenant_id == tenant.tenant_id)
            .cloned())
    }

    async fn goals_by_status(&self, tenant: &Tenant, status: GoalStatus) -> Result<Vec<Goal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .goals
            .iter()
            .filter(|g| g.tenant_id == tenant.tenant_id && g.status == status)
            .cloned()
            .collect())
    }

    async fn all_goals(&self, tenant: &Tenant) -> Result<Vec<Goal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .goals
            .iter()
            .filter(|g| g.tenant_id == tenant.tenant_id)
            .cloned()
            .collect())
    }

    async fn insert_entity(&self, tenant: &Tenant, entity: &KnowledgeEntity) -> Result<()> {
        self.inner
            .write()
            .await
            .entities
            .entry(tenant.tenant_id.clone())
            .or_default()
            .push(entity.clone());
        Ok(())
    }

    async fn update_entity(&self, tenant: &Tenant, entity: &KnowledgeEntity) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(entities) = inner.entities.get_mut(&tenant.tenant_id) {
            if let Some(existing) = entities.iter_mut().find(|e| e.id == entity.id) {
                *existing = entity.clone();
            }
        }
        Ok(())
    }

    async fn find_entity_by_name(
        &self,
        tenant: &Tenant,
        name: &str,
    ) -> Result<Option<KnowledgeEntity>> {
        let inner = self.inner.read().await;
        let lowered = name.to_lowercase();
        Ok(inner
            .entities
            .get(&tenant.tenant_id)
            .and_then(|entities| {
                entities
                    .iter()
                    .find(|e| e.name.to_lowercase() == lowered)
                    .cloned()
            }))
    }

    async fn search_entities(
        &self,
        tenant: &Tenant,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<KnowledgeEntity>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<KnowledgeEntity> = inner
            .entities
            .get(&tenant.tenant_id)
            .map(|entities| {
                entities
                    .iter()
                    .filter(|e| {
                        let name = e.name.to_lowercase();
                        keywords.iter().any(|k| name.contains(&k.to_lowercase()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matches.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
        matches.truncate(limit.max(0) as usize);
        Ok(matches)
    }

    async fn most_mentioned_entities(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<Vec<KnowledgeEntity>> {
        let inner = self.inner.read().await;
        let mut entities: Vec<KnowledgeEntity> = inner
            .entities
            .get(&tenant.tenant_id)
            .cloned()
            .unwrap_or_default();
        entities.sort_by(|a, b| b.mention_count.cmp(&a.mention_count));
        entities.truncate(limit.max(0) as usize);
        Ok(entities)
    }

    async fn entity_type_counts(&self, tenant: &Tenant) -> Result<Vec<(EntityType, usize)>> {
        let inner = self.inner.read().await;
        let mut counts: HashMap<EntityType, usize> = HashMap::new();
        for entity in inner.entities.get(&tenant.tenant_id).into_iter().flatten() {
            *counts.entry(entity.entity_type).or_insert(0) += 1;
        }
        let mut counts: Vec<(EntityType, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(counts)
    }

    async fn insert_relationship(
        &self,
        tenant: &Tenant,
        relationship: &KnowledgeRelationship,
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .relationships
            .entry(tenant.tenant_id.clone())
            .or_default()
            .push(relationship.clone());
        Ok(())
    }

    async fn relationship_exists(
        &self,
        tenant: &Tenant,
        source_entity_id: &str,
        target_entity_id: &str,
        relationship_type: &str,
    ) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .relationships
            .get(&tenant.tenant_id)
            .map(|rels| {
                rels.iter().any(|r| {
                    r.source_entity_id == source_entity_id
                        && r.target_entity_id == target_entity_id
                        && r.relationship_type == relationship_type
                })
            })
            .unwrap_or(false))
    }

    async fn relationships_for_entity(
        &self,
        tenant: &Tenant,
        entity_id: &str,
    ) -> Result<Vec<KnowledgeRelationship>> {
        let inner = self.inner.read().await;
        Ok(inner
            .relationships
            .get(&tenant.tenant_id)
            .map(|rels| {
                rels.iter()
                    .filter(|r| {
                        r.source_entity_id == entity_id || r.target_entity_id == entity_id
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn relationship_count(&self, tenant: &Tenant) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .relationships
            .get(&tenant.tenant_id)
            .map(|rels| rels.len())
            .unwrap_or(0))
    }

    async fn insert_feedback(&self, entry: &FeedbackEntry) -> Result<()> {
        self.inner.write().await.feedback.push(entry.clone());
        Ok(())
    }

    async fn feedback_count(&self, tenant: &Tenant) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .feedback
            .iter()
            .filter(|f| f.tenant_id == tenant.tenant_id)
            .count())
    }

    async fn recent_feedback(&self, tenant: &Tenant, limit: i64) -> Result<Vec<FeedbackEntry>> {
        let inner = self.inner.read().await;
        let mut feedback: Vec<FeedbackEntry> = inner
            .feedback
            .iter()
            .filter(|f| f.tenant_id == tenant.tenant_id)
            .cloned()
            .collect();
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        feedback.truncate(limit.max(0) as usize);
        Ok(feedback)
    }

    async fn all_feedback(&self, tenant: &Tenant) -> Result<Vec<FeedbackEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .feedback
            .iter()
            .filter(|f| f.tenant_id == tenant.tenant_id)
            .cloned()
            .collect())
    }

    async fn upsert_learnings(&self, tenant: &Tenant, learnings: &Learnings) -> Result<()> {
        self.inner
            .write()
            .await
            .learnings
            .insert(tenant.tenant_id.clone(), learnings.clone());
        Ok(())
    }

    async fn get_learnings(&self, tenant: &Tenant) -> Result<Option<Learnings>> {
        let inner = self.inner.read().await;
        Ok(inner.learnings.get(&tenant.tenant_id).cloned())
    }

    async fn insert_reflection(&self, record: &ReflectionRecord) -> Result<()> {
        self.inner.write().await.reflections.push(record.clone());
        Ok(())
    }

    async fn reflections_since(
        &self,
        tenant: &Tenant,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReflectionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reflections
            .iter()
            .filter(|r| r.tenant_id == tenant.tenant_id && r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn recent_reflections(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<Vec<ReflectionRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<ReflectionRecord> = inner
            .reflections
            .iter()
            .filter(|r| r.tenant_id == tenant.tenant_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn insert_insights(
        &self,
        tenant: &Tenant,
        insights: &[ProactiveInsight],
    ) -> Result<()> {
        self.inner
            .write()
            .await
            .insights
            .entry(tenant.tenant_id.clone())
            .or_default()
            .extend(insights.iter().cloned());
        Ok(())
    }

    async fn pending_insights(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ProactiveInsight>> {
        let inner = self.inner.read().await;
        let mut pending: Vec<ProactiveInsight> = inner
            .insights
            .get(&tenant.tenant_id)
            .map(|insights| {
                insights
                    .iter()
                    .filter(|i| i.expires_at.map(|at| at > now).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        pending.sort_by(|a, b| {
            b.priority
                .rank()
                .cmp(&a.priority.rank())
                .then(b.created_at.cmp(&a.created_at))
        });
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }

    async fn get_settings(&self, tenant: &Tenant) -> Result<Option<UserSettings>> {
        let inner = self.inner.read().await;
        Ok(inner
            .settings
            .get(&(tenant.user_id.clone(), tenant.tenant_id.clone()))
            .cloned())
    }

    async fn upsert_settings(&self, tenant: &Tenant, settings: &UserSettings) -> Result<()> {
        self.inner
            .write()
            .await
            .settings
            .insert(
                (tenant.user_id.clone(), tenant.tenant_id.clone()),
                settings.clone(),
            );
        Ok(())
    }

    async fn record_turn(&self, turn: &ConversationTurn) -> Result<()> {
        self.inner.write().await.turns.push(turn.clone());
        Ok(())
    }

    async fn recent_user_messages(&self, tenant: &Tenant, limit: i64) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        let mut turns: Vec<&ConversationTurn> = inner
            .turns
            .iter()
            .filter(|t| t.tenant_id == tenant.tenant_id && t.role == TurnRole::User)
            .collect();
        turns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(turns
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|t| t.content.clone())
            .collect())
    }

    async fn last_turn_at(&self, tenant: &Tenant) -> Result<Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        Ok(inner
            .turns
            .iter()
            .filter(|t| t.tenant_id == tenant.tenant_id)
            .map(|t| t.created_at)
            .max())
    }

    async fn session_turn_count(&self, session_id: &str) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .count())
    }

    async fn stats(&self, tenant: &Tenant) -> Result<StorageStats> {
        let inner = self.inner.read().await;
        Ok(StorageStats {
            memories: inner
                .memories
                .iter()
                .filter(|m| m.tenant_id == tenant.tenant_id)
                .count(),
            goals: inner
                .goals
                .iter()
                .filter(|g| g.tenant_id == tenant.tenant_id)
                .count(),
            entities: inner
                .entities
                .get(&tenant.tenant_id)
                .map(|e| e.len())
                .unwrap_or(0),
            relationships: inner
                .relationships
                .get(&tenant.tenant_id)
                .map(|r| r.len())
                .unwrap_or(0),
            feedback: inner
                .feedback
                .iter()
                .filter(|f| f.tenant_id == tenant.tenant_id)
                .count(),
            reflections: inner
                .reflections
                .iter()
                .filter(|r| r.tenant_id == tenant.tenant_id)
                .count(),
            insights: inner
                .insights
                .get(&tenant.tenant_id)
                .map(|i| i.len())
                .unwrap_or(0),
            turns: inner
                .turns
                .iter()
                .filter(|t| t.tenant_id == tenant.tenant_id)
                .count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryType;

    fn tenant() -> Tenant {
        Tenant::new("u1", "t1")
    }

    #[tokio::test]
    async fn memories_come_back_by_importance() {
        let store = InMemoryStore::new();
        let tenant = tenant();
        store
            .add_memory(&Memory::new(&tenant, "minor", MemoryType::Other).with_importance(10))
            .await
            .unwrap();
        store
            .add_memory(&Memory::new(&tenant, "major", MemoryType::Fact).with_importance(90))
            .await
            .unwrap();
        store
            .add_memory(
                &Memory::new(&Tenant::new("u2", "t2"), "elsewhere", MemoryType::Fact)
                    .with_importance(99),
            )
            .await
            .unwrap();

        let memories = store.top_memories(&tenant, 10).await.unwrap();
        assert_eq!(memories.len(), 2);
        assert_eq!(memories[0].content, "major");
    }

    #[tokio::test]
    async fn delete_memory_is_tenant_scoped() {
        let store = InMemoryStore::new();
        let tenant = tenant();
        let memory = Memory::new(&tenant, "m", MemoryType::Fact);
        store.add_memory(&memory).await.unwrap();

        assert!(!store
            .delete_memory(&Tenant::new("u2", "t2"), &memory.id)
            .await
            .unwrap());
        assert!(store.delete_memory(&tenant, &memory.id).await.unwrap());
        assert!(store.top_memories(&tenant, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn settings_round_trip_per_user() {
        let store = InMemoryStore::new();
        let tenant = tenant();
        assert!(store.get_settings(&tenant).await.unwrap().is_none());

        let settings = UserSettings {
            engagement_level: crate::engagement::EngagementLevel::PersonalAssistant,
            last_interaction: Some(Utc::now()),
        };
        store.upsert_settings(&tenant, &settings).await.unwrap();
        assert_eq!(store.get_settings(&tenant).await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn session_turn_count_tracks_one_session() {
        let store = InMemoryStore::new();
        let tenant = tenant();
        for session in ["s1", "s1", "s2"] {
            store
                .record_turn(&ConversationTurn::new(&tenant, session, TurnRole::User, "m"))
                .await
                .unwrap();
        }
        assert_eq!(store.session_turn_count("s1").await.unwrap(), 2);
        assert_eq!(store.session_turn_count("s2").await.unwrap(), 1);
        assert_eq!(store.session_turn_count("s3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stats_count_per_tenant() {
        let store = InMemoryStore::new();
        let tenant = tenant();
        store
            .add_memory(&Memory::new(&tenant, "m", MemoryType::Fact))
            .await
            .unwrap();
        store
            .record_turn(&ConversationTurn::new(&tenant, "s1", TurnRole::User, "m"))
            .await
            .unwrap();

        let stats = store.stats(&tenant).await.unwrap();
        assert_eq!(stats.memories, 1);
        assert_eq!(stats.turns, 1);
        assert_eq!(stats.goals, 0);
    }
}
