//! Knowledge graph: entities and relationships extracted from conversation
//!
//! Extraction returns relationship endpoints by *name*; they are resolved to
//! entity ids after the entities themselves have been upserted. Candidates
//! below the confidence floor are dropped as noise. Relevance queries are
//! deliberately keyword-based - cheap retrieval without an index.

use crate::error::Result;
use crate::generation::{decode_json, TextGenerator};
use crate::storage::Storage;
use crate::types::Tenant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Minimum extraction confidence for an entity or relationship to be stored
pub const MIN_CONFIDENCE: u8 = 50;

/// Kinds of extracted entities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Project,
    Concept,
    Location,
    Date,
    Product,
    Other,
}

impl Default for EntityType {
    fn default() -> Self {
        EntityType::Other
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityType::Person => write!(f, "person"),
            EntityType::Organization => write!(f, "organization"),
            EntityType::Project => write!(f, "project"),
            EntityType::Concept => write!(f, "concept"),
            EntityType::Location => write!(f, "location"),
            EntityType::Date => write!(f, "date"),
            EntityType::Product => write!(f, "product"),
            EntityType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "person" => Ok(EntityType::Person),
            "organization" => Ok(EntityType::Organization),
            "project" => Ok(EntityType::Project),
            "concept" => Ok(EntityType::Concept),
            "location" => Ok(EntityType::Location),
            "date" => Ok(EntityType::Date),
            "product" => Ok(EntityType::Product),
            _ => Ok(EntityType::Other),
        }
    }
}

/// A named entity remembered across conversations
///
/// Identity is the case-insensitive name within a tenant. Re-mentions bump
/// `mention_count` and `last_mentioned` and can only raise `confidence`;
/// the first stored description wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeEntity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: HashMap<String, String>,
    /// 0 - 100
    pub confidence: u8,
    pub first_mentioned: DateTime<Utc>,
    pub last_mentioned: DateTime<Utc>,
    pub mention_count: u32,
}

impl KnowledgeEntity {
    pub fn new(name: impl Into<String>, entity_type: EntityType, confidence: u8) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            entity_type,
            description: None,
            attributes: HashMap::new(),
            confidence: confidence.min(100),
            first_mentioned: now,
            last_mentioned: now,
            mention_count: 1,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A directed, typed edge between two entities
///
/// Unique per (source, target, relationship_type) within a tenant;
/// duplicates are suppressed, not merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeRelationship {
    pub id: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub relationship_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 0 - 100
    pub confidence: u8,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRelationship {
    pub fn new(
        source_entity_id: impl Into<String>,
        target_entity_id: impl Into<String>,
        relationship_type: impl Into<String>,
        confidence: u8,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_entity_id: source_entity_id.into(),
            target_entity_id: target_entity_id.into(),
            relationship_type: relationship_type.into(),
            description: None,
            confidence: confidence.min(100),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Entity candidate as extracted from a conversation turn
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EntityDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: Option<EntityType>,
    pub description: Option<String>,
    pub attributes: Option<HashMap<String, String>>,
    pub confidence: Option<u8>,
}

/// Relationship candidate, endpoints still by name
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelationshipDraft {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub description: Option<String>,
    pub confidence: Option<u8>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ExtractionReply {
    entities: Vec<EntityDraft>,
    relationships: Vec<RelationshipDraft>,
}

/// Knowledge graph statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub entity_types: Vec<(EntityType, usize)>,
}

/// Builds and queries the per-tenant knowledge graph
pub struct KnowledgeGraph {
    tenant: Tenant,
    storage: Arc<dyn Storage>,
    generator: Arc<dyn TextGenerator>,
}

impl KnowledgeGraph {
    pub fn new(
        tenant: Tenant,
        storage: Arc<dyn Storage>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            tenant,
            storage,
            generator,
        }
    }

    /// Extract entity and relationship candidates from one turn
    ///
    /// Relationship endpoints are names, not ids. Malformed replies yield
    /// empty lists.
    pub async fn extract_knowledge(
        &self,
        user_message: &str,
        ai_response: &str,
    ) -> (Vec<EntityDraft>, Vec<RelationshipDraft>) {
        let prompt = format!(
            "Analyze this conversation and extract named entities and their relationships.\n\n\
             USER MESSAGE: {user_message}\n\n\
             AI RESPONSE: {ai_response}\n\n\
             Extract:\n\
             1. ENTITIES: People, organizations, projects, concepts, locations, dates, products mentioned\n\
             2. RELATIONSHIPS: How entities relate to each other or to the user\n\n\
             Respond ONLY with valid JSON:\n\
             {{\n\
               \"entities\": [\n\
                 {{\n\
                   \"name\": \"<entity name>\",\n\
                   \"type\": \"<person|organization|project|concept|location|date|product|other>\",\n\
                   \"description\": \"<brief description>\",\n\
                   \"attributes\": {{\"key\": \"value\"}},\n\
                   \"confidence\": <0-100>\n\
                 }}\n\
               ],\n\
               \"relationships\": [\n\
                 {{\n\
                   \"source\": \"<source entity name>\",\n\
                   \"target\": \"<target entity name>\",\n\
                   \"type\": \"<relationship type: works_for, owns, located_in, related_to, etc>\",\n\
                   \"description\": \"<brief description>\",\n\
                   \"confidence\": <0-100>\n\
                 }}\n\
               ]\n\
             }}\n\n\
             If no entities or relationships found, return empty arrays."
        );

        let text = match self.generator.generate(&prompt, 0.3).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("knowledge extraction call failed: {e}");
                return (Vec::new(), Vec::new());
            }
        };

        let reply = decode_json::<ExtractionReply>(&text).unwrap_or_default();
        (reply.entities, reply.relationships)
    }

    /// Upsert extracted entities
    ///
    /// Candidates below [`MIN_CONFIDENCE`] or without a name are dropped.
    /// Existing entities (case-insensitive name match) get a mention bump
    /// and a confidence raise to `max(existing, new)`.
    pub async fn store_entities(&self, entities: &[EntityDraft]) {
        let now = Utc::now();

        for draft in entities {
            if draft.name.is_empty() || draft.confidence.unwrap_or(MIN_CONFIDENCE) < MIN_CONFIDENCE
            {
                continue;
            }

            let result = self.upsert_entity(draft, now).await;
            if let Err(e) = result {
                tracing::warn!("failed to store entity {:?}: {e}", draft.name);
            }
        }
    }

    async fn upsert_entity(&self, draft: &EntityDraft, now: DateTime<Utc>) -> Result<()> {
        let confidence = draft.confidence.unwrap_or(MIN_CONFIDENCE).min(100);

        match self
            .storage
            .find_entity_by_name(&self.tenant, &draft.name)
            .await?
        {
            Some(mut existing) => {
                existing.mention_count += 1;
                existing.last_mentioned = now;
                existing.confidence = existing.confidence.max(confidence);
                self.storage.update_entity(&self.tenant, &existing).await
            }
            None => {
                let mut entity = KnowledgeEntity::new(
                    draft.name.clone(),
                    draft.entity_type.unwrap_or_default(),
                    confidence,
                );
                entity.description = draft.description.clone();
                entity.attributes = draft.attributes.clone().unwrap_or_default();
                entity.first_mentioned = now;
                entity.last_mentioned = now;
                self.storage.insert_entity(&self.tenant, &entity).await
            }
        }
    }

    /// Insert relationships whose endpoints are already resolved to ids
    ///
    /// Exact (source, target, type) duplicates and low-confidence
    /// candidates are skipped.
    pub async fn store_relationships(&self, relationships: &[KnowledgeRelationship]) {
        for rel in relationships {
            if rel.confidence < MIN_CONFIDENCE {
                continue;
            }

            let exists = match self
                .storage
                .relationship_exists(
                    &self.tenant,
                    &rel.source_entity_id,
                    &rel.target_entity_id,
                    &rel.relationship_type,
                )
                .await
            {
                Ok(exists) => exists,
                Err(e) => {
                    tracing::warn!("relationship lookup failed: {e}");
                    continue;
                }
            };

            if !exists {
                if let Err(e) = self.storage.insert_relationship(&self.tenant, rel).await {
                    tracing::warn!("failed to store relationship: {e}");
                }
            }
        }
    }

    /// Extract and persist knowledge from one conversation turn
    ///
    /// Fire-and-forget from the orchestrator: all failures are logged and
    /// swallowed. Relationships whose endpoints cannot be resolved to
    /// stored entities are skipped silently.
    pub async fn process_conversation(&self, user_message: &str, ai_response: &str) {
        let (entities, relationships) = self.extract_knowledge(user_message, ai_response).await;

        self.store_entities(&entities).await;

        let mut resolved = Vec::new();
        for draft in relationships {
            let source = self.resolve_entity_id(&draft.source).await;
            let target = self.resolve_entity_id(&draft.target).await;

            if let (Some(source_id), Some(target_id)) = (source, target) {
                let mut rel = KnowledgeRelationship::new(
                    source_id,
                    target_id,
                    draft.relationship_type,
                    draft.confidence.unwrap_or(MIN_CONFIDENCE),
                );
                rel.description = draft.description;
                resolved.push(rel);
            }
        }

        self.store_relationships(&resolved).await;
    }

    async fn resolve_entity_id(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        self.storage
            .find_entity_by_name(&self.tenant, name)
            .await
            .ok()
            .flatten()
            .map(|e| e.id)
    }

    /// Entities relevant to a query, by keyword match over names
    ///
    /// Tokens of more than 3 characters are matched; when the query has
    /// none, the most-mentioned entities are returned instead.
    pub async fn query_relevant_knowledge(&self, query: &str, limit: i64) -> Vec<KnowledgeEntity> {
        let keywords: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(|w| w.to_string())
            .collect();

        let result = if keywords.is_empty() {
            self.storage.most_mentioned_entities(&self.tenant, limit).await
        } else {
            self.storage.search_entities(&self.tenant, &keywords, limit).await
        };

        match result {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!("knowledge query failed: {e}");
                Vec::new()
            }
        }
    }

    /// Relationships touching an entity; empty on failure
    pub async fn entity_relationships(&self, entity_id: &str) -> Vec<KnowledgeRelationship> {
        match self
            .storage
            .relationships_for_entity(&self.tenant, entity_id)
            .await
        {
            Ok(rels) => rels,
            Err(e) => {
                tracing::warn!("failed to get relationships: {e}");
                Vec::new()
            }
        }
    }

    /// Prompt-injectable block of relevant entities; empty string when the
    /// graph has nothing for this query
    pub async fn knowledge_context(&self, query: &str) -> String {
        let entities = self.query_relevant_knowledge(query, 5).await;
        if entities.is_empty() {
            return String::new();
        }

        let mut context = String::from(
            "\n## KNOWLEDGE GRAPH CONTEXT\nRelevant entities from previous conversations:\n",
        );
        for entity in &entities {
            context.push_str(&format!(
                "- {} ({}): {}\n",
                entity.name,
                entity.entity_type,
                entity.description.as_deref().unwrap_or("No description")
            ));
            for rel in self.entity_relationships(&entity.id).await.iter().take(2) {
                context.push_str(&format!(
                    "  -> {}: {}\n",
                    rel.relationship_type,
                    rel.description.as_deref().unwrap_or("")
                ));
            }
        }
        context
    }

    /// Graph totals and per-type counts; zeroed on failure
    pub async fn stats(&self) -> KnowledgeStats {
        let entity_types = match self.storage.entity_type_counts(&self.tenant).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!("failed to get knowledge stats: {e}");
                return KnowledgeStats::default();
            }
        };
        let total_relationships = self
            .storage
            .relationship_count(&self.tenant)
            .await
            .unwrap_or(0);

        KnowledgeStats {
            total_entities: entity_types.iter().map(|(_, n)| n).sum(),
            total_relationships,
            entity_types,
        }
    }
}
