//! SQLite storage backend using sqlx

use crate::engagement::EngagementLevel;
use crate::error::Result;
use crate::goals::{Goal, GoalPriority, GoalStatus};
use crate::knowledge::{EntityType, KnowledgeEntity, KnowledgeRelationship};
use crate::learning::{FeedbackEntry, FeedbackKind, Learnings};
use crate::proactive::{InsightPriority, InsightType, ProactiveInsight};
use crate::reflection::{ReflectionRecord, ReflectionScores};
use crate::storage::{Storage, StorageStats};
use crate::types::{ConversationTurn, Memory, Tenant, UserSettings};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Durable [`Storage`] implementation over SQLite
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| crate::error::AgentError::Database(e.into()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (migrations are the caller's responsibility)
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_goal_status(s: &str) -> GoalStatus {
    match s {
        "completed" => GoalStatus::Completed,
        "paused" => GoalStatus::Paused,
        "abandoned" => GoalStatus::Abandoned,
        _ => GoalStatus::Active,
    }
}

fn parse_goal_priority(s: &str) -> GoalPriority {
    match s {
        "low" => GoalPriority::Low,
        "high" => GoalPriority::High,
        "critical" => GoalPriority::Critical,
        _ => GoalPriority::Medium,
    }
}

fn parse_feedback(s: &str) -> FeedbackKind {
    if s == "negative" {
        FeedbackKind::Negative
    } else {
        FeedbackKind::Positive
    }
}

fn parse_insight_type(s: &str) -> InsightType {
    match s {
        "reminder" => InsightType::Reminder,
        "suggestion" => InsightType::Suggestion,
        "check_in" => InsightType::CheckIn,
        "alert" => InsightType::Alert,
        "goal_update" => InsightType::GoalUpdate,
        _ => InsightType::Tip,
    }
}

fn parse_insight_priority(s: &str) -> InsightPriority {
    match s {
        "high" => InsightPriority::High,
        "medium" => InsightPriority::Medium,
        _ => InsightPriority::Low,
    }
}

fn row_to_memory(row: &sqlx::sqlite::SqliteRow) -> Memory {
    Memory {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tenant_id: row.get("tenant_id"),
        content: row.get("content"),
        memory_type: row
            .get::<String, _>("memory_type")
            .parse()
            .unwrap_or(crate::types::MemoryType::Other),
        importance: row.get::<i64, _>("importance").clamp(0, 100) as u8,
        created_at: row.get("created_at"),
    }
}

fn row_to_goal(row: &sqlx::sqlite::SqliteRow) -> Goal {
    Goal {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tenant_id: row.get("tenant_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: parse_goal_status(&row.get::<String, _>("status")),
        priority: parse_goal_priority(&row.get::<String, _>("priority")),
        category: row.get("category"),
        subtasks: serde_json::from_str(&row.get::<String, _>("subtasks")).unwrap_or_default(),
        progress: row.get::<i64, _>("progress").clamp(0, 100) as u8,
        target_date: row.get("target_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

fn row_to_entity(row: &sqlx::sqlite::SqliteRow) -> KnowledgeEntity {
    KnowledgeEntity {
        id: row.get("id"),
        name: row.get("name"),
        entity_type: row
            .get::<String, _>("entity_type")
            .parse()
            .unwrap_or_default(),
        description: row.get("description"),
        attributes: serde_json::from_str(&row.get::<String, _>("attributes")).unwrap_or_default(),
        confidence: row.get::<i64, _>("confidence").clamp(0, 100) as u8,
        first_mentioned: row.get("first_mentioned"),
        last_mentioned: row.get("last_mentioned"),
        mention_count: row.get::<i64, _>("mention_count").max(0) as u32,
    }
}

fn row_to_relationship(row: &sqlx::sqlite::SqliteRow) -> KnowledgeRelationship {
    KnowledgeRelationship {
        id: row.get("id"),
        source_entity_id: row.get("source_entity_id"),
        target_entity_id: row.get("target_entity_id"),
        relationship_type: row.get("relationship_type"),
        description: row.get("description"),
        confidence: row.get::<i64, _>("confidence").clamp(0, 100) as u8,
        created_at: row.get("created_at"),
    }
}

fn row_to_feedback(row: &sqlx::sqlite::SqliteRow) -> FeedbackEntry {
    FeedbackEntry {
        interaction_id: row.get("interaction_id"),
        user_id: row.get("user_id"),
        tenant_id: row.get("tenant_id"),
        feedback: parse_feedback(&row.get::<String, _>("feedback")),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
    }
}

fn row_to_reflection(row: &sqlx::sqlite::SqliteRow) -> ReflectionRecord {
    ReflectionRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        tenant_id: row.get("tenant_id"),
        user_query: row.get("user_query"),
        ai_response: row.get("ai_response"),
        scores: serde_json::from_str(&row.get::<String, _>("scores"))
            .unwrap_or_else(|_| ReflectionScores::neutral()),
        improvements: serde_json::from_str(&row.get::<String, _>("improvements"))
            .unwrap_or_default(),
        was_revised: row.get::<i64, _>("was_revised") != 0,
        revised_response: row.get("revised_response"),
        reasoning: row.get("reasoning"),
        created_at: row.get("created_at"),
    }
}

fn row_to_insight(row: &sqlx::sqlite::SqliteRow) -> ProactiveInsight {
    ProactiveInsight {
        id: row.get("id"),
        insight_type: parse_insight_type(&row.get::<String, _>("insight_type")),
        title: row.get("title"),
        content: row.get("content"),
        priority: parse_insight_priority(&row.get::<String, _>("priority")),
        related_goal_id: row.get("related_goal_id"),
        actionable: row.get::<i64, _>("actionable") != 0,
        suggested_action: row.get("suggested_action"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

#[async_trait]
impl Storage for SqliteStore {
    async fn add_memory(&self, memory: &Memory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memories (id, user_id, tenant_id, content, memory_type, importance, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&memory.id)
        .bind(&memory.user_id)
        .bind(&memory.tenant_id)
        .bind(&memory.content)
        .bind(memory.memory_type.to_string())
        .bind(memory.importance as i64)
        .bind(memory.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn top_memories(&self, tenant: &Tenant, limit: i64) -> Result<Vec<Memory>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, tenant_id, content, memory_type, importance, created_at
            FROM memories
            WHERE tenant_id = ? AND user_id = ?
            ORDER BY importance DESC
            LIMIT ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(&tenant.user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_memory).collect())
    }

    async fn delete_memory(&self, tenant: &Tenant, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM memories WHERE id = ? AND tenant_id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(&tenant.tenant_id)
        .bind(&tenant.user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_goal(&self, goal: &Goal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO goals (
                id, user_id, tenant_id, title, description, status, priority, category,
                subtasks, progress, target_date, created_at, updated_at, completed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&goal.id)
        .bind(&goal.user_id)
        .bind(&goal.tenant_id)
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.status.to_string())
        .bind(goal.priority.to_string())
        .bind(&goal.category)
        .bind(serde_json::to_string(&goal.subtasks)?)
        .bind(goal.progress as i64)
        .bind(goal.target_date)
        .bind(goal.created_at)
        .bind(goal.updated_at)
        .bind(goal.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_goal(&self, goal: &Goal) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE goals
            SET title = ?, description = ?, status = ?, priority = ?, category = ?,
                subtasks = ?, progress = ?, target_date = ?, updated_at = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.status.to_string())
        .bind(goal.priority.to_string())
        .bind(&goal.category)
        .bind(serde_json::to_string(&goal.subtasks)?)
        .bind(goal.progress as i64)
        .bind(goal.target_date)
        .bind(goal.updated_at)
        .bind(goal.completed_at)
        .bind(&goal.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_goal(&self, tenant: &Tenant, id: &str) -> Result<Option<Goal>> {
        let row = sqlx::query("SELECT * FROM goals WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(&tenant.tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_goal))
    }

    async fn goals_by_status(&self, tenant: &Tenant, status: GoalStatus) -> Result<Vec<Goal>> {
        let rows = sqlx::query("SELECT * FROM goals WHERE tenant_id = ? AND status = ?")
            .bind(&tenant.tenant_id)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_goal).collect())
    }

    async fn all_goals(&self, tenant: &Tenant) -> Result<Vec<Goal>> {
        let rows = sqlx::query("SELECT * FROM goals WHERE tenant_id = ?")
            .bind(&tenant.tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_goal).collect())
    }

    async fn insert_entity(&self, tenant: &Tenant, entity: &KnowledgeEntity) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_entities (
                id, user_id, tenant_id, name, entity_type, description, attributes,
                confidence, first_mentioned, last_mentioned, mention_count
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entity.id)
        .bind(&tenant.user_id)
        .bind(&tenant.tenant_id)
        .bind(&entity.name)
        .bind(entity.entity_type.to_string())
        .bind(&entity.description)
        .bind(serde_json::to_string(&entity.attributes)?)
        .bind(entity.confidence as i64)
        .bind(entity.first_mentioned)
        .bind(entity.last_mentioned)
        .bind(entity.mention_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_entity(&self, tenant: &Tenant, entity: &KnowledgeEntity) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE knowledge_entities
            SET name = ?, entity_type = ?, description = ?, attributes = ?,
                confidence = ?, last_mentioned = ?, mention_count = ?
            WHERE id = ? AND tenant_id = ?
            "#,
        )
        .bind(&entity.name)
        .bind(entity.entity_type.to_string())
        .bind(&entity.description)
        .bind(serde_json::to_string(&entity.attributes)?)
        .bind(entity.confidence as i64)
        .bind(entity.last_mentioned)
        .bind(entity.mention_count as i64)
        .bind(&entity.id)
        .bind(&tenant.tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_entity_by_name(
        &self,
        tenant: &Tenant,
        name: &str,
    ) -> Result<Option<KnowledgeEntity>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM knowledge_entities
            WHERE tenant_id = ? AND name = ? COLLATE NOCASE
            LIMIT 1
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_entity))
    }

    async fn search_entities(
        &self,
        tenant: &Tenant,
        keywords: &[String],
        limit: i64,
    ) -> Result<Vec<KnowledgeEntity>> {
        if keywords.is_empty() {
            return self.most_mentioned_entities(tenant, limit).await;
        }

        let clauses = keywords
            .iter()
            .map(|_| "name LIKE '%' || ? || '%' COLLATE NOCASE")
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT * FROM knowledge_entities WHERE tenant_id = ? AND ({clauses}) \
             ORDER BY mention_count DESC LIMIT ?"
        );

        let mut query = sqlx::query(&sql).bind(&tenant.tenant_id);
        for keyword in keywords {
            query = query.bind(keyword);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_entity).collect())
    }

    async fn most_mentioned_entities(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<Vec<KnowledgeEntity>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM knowledge_entities
            WHERE tenant_id = ?
            ORDER BY mention_count DESC
            LIMIT ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_entity).collect())
    }

    async fn entity_type_counts(&self, tenant: &Tenant) -> Result<Vec<(EntityType, usize)>> {
        let rows = sqlx::query(
            r#"
            SELECT entity_type, COUNT(*) AS n
            FROM knowledge_entities
            WHERE tenant_id = ?
            GROUP BY entity_type
            ORDER BY n DESC
            "#,
        )
        .bind(&tenant.tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<String, _>("entity_type").parse().unwrap_or_default(),
                    row.get::<i64, _>("n").max(0) as usize,
                )
            })
            .collect())
    }

    async fn insert_relationship(
        &self,
        tenant: &Tenant,
        relationship: &KnowledgeRelationship,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_relationships (
                id, tenant_id, source_entity_id, target_entity_id,
                relationship_type, description, confidence, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&relationship.id)
        .bind(&tenant.tenant_id)
        .bind(&relationship.source_entity_id)
        .bind(&relationship.target_entity_id)
        .bind(&relationship.relationship_type)
        .bind(&relationship.description)
        .bind(relationship.confidence as i64)
        .bind(relationship.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn relationship_exists(
        &self,
        tenant: &Tenant,
        source_entity_id: &str,
        target_entity_id: &str,
        relationship_type: &str,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 AS present FROM knowledge_relationships
            WHERE tenant_id = ? AND source_entity_id = ? AND target_entity_id = ?
              AND relationship_type = ?
            LIMIT 1
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(source_entity_id)
        .bind(target_entity_id)
        .bind(relationship_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn relationships_for_entity(
        &self,
        tenant: &Tenant,
        entity_id: &str,
    ) -> Result<Vec<KnowledgeRelationship>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM knowledge_relationships
            WHERE tenant_id = ? AND (source_entity_id = ? OR target_entity_id = ?)
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(entity_id)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_relationship).collect())
    }

    async fn relationship_count(&self, tenant: &Tenant) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM knowledge_relationships WHERE tenant_id = ?")
            .bind(&tenant.tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n").max(0) as usize)
    }

    async fn insert_feedback(&self, entry: &FeedbackEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (interaction_id, user_id, tenant_id, feedback, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.interaction_id)
        .bind(&entry.user_id)
        .bind(&entry.tenant_id)
        .bind(entry.feedback.to_string())
        .bind(&entry.comment)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn feedback_count(&self, tenant: &Tenant) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM feedback WHERE tenant_id = ?")
            .bind(&tenant.tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n").max(0) as usize)
    }

    async fn recent_feedback(&self, tenant: &Tenant, limit: i64) -> Result<Vec<FeedbackEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM feedback
            WHERE tenant_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_feedback).collect())
    }

    async fn all_feedback(&self, tenant: &Tenant) -> Result<Vec<FeedbackEntry>> {
        let rows = sqlx::query("SELECT * FROM feedback WHERE tenant_id = ?")
            .bind(&tenant.tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_feedback).collect())
    }

    async fn upsert_learnings(&self, tenant: &Tenant, learnings: &Learnings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learnings (tenant_id, user_id, patterns, preferences, feedback_count, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                patterns = excluded.patterns,
                preferences = excluded.preferences,
                feedback_count = excluded.feedback_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(&tenant.user_id)
        .bind(serde_json::to_string(&learnings.patterns)?)
        .bind(serde_json::to_string(&learnings.preferences)?)
        .bind(learnings.feedback_count as i64)
        .bind(learnings.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_learnings(&self, tenant: &Tenant) -> Result<Option<Learnings>> {
        let row = sqlx::query("SELECT * FROM learnings WHERE tenant_id = ?")
            .bind(&tenant.tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| Learnings {
            patterns: serde_json::from_str(&row.get::<String, _>("patterns")).unwrap_or_default(),
            preferences: serde_json::from_str(&row.get::<String, _>("preferences"))
                .unwrap_or_default(),
            feedback_count: row.get::<i64, _>("feedback_count").max(0) as usize,
            updated_at: row.get("updated_at"),
        }))
    }

    async fn insert_reflection(&self, record: &ReflectionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reflections (
                id, user_id, tenant_id, user_query, ai_response, scores,
                improvements, was_revised, revised_response, reasoning, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.tenant_id)
        .bind(&record.user_query)
        .bind(&record.ai_response)
        .bind(serde_json::to_string(&record.scores)?)
        .bind(serde_json::to_string(&record.improvements)?)
        .bind(record.was_revised as i64)
        .bind(&record.revised_response)
        .bind(&record.reasoning)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reflections_since(
        &self,
        tenant: &Tenant,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReflectionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM reflections
            WHERE tenant_id = ? AND created_at >= ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_reflection).collect())
    }

    async fn recent_reflections(
        &self,
        tenant: &Tenant,
        limit: i64,
    ) -> Result<Vec<ReflectionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM reflections
            WHERE tenant_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_reflection).collect())
    }

    async fn insert_insights(
        &self,
        tenant: &Tenant,
        insights: &[ProactiveInsight],
    ) -> Result<()> {
        for insight in insights {
            sqlx::query(
                r#"
                INSERT INTO proactive_insights (
                    id, user_id, tenant_id, insight_type, title, content, priority,
                    related_goal_id, actionable, suggested_action, created_at, expires_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&insight.id)
            .bind(&tenant.user_id)
            .bind(&tenant.tenant_id)
            .bind(insight.insight_type.to_string())
            .bind(&insight.title)
            .bind(&insight.content)
            .bind(insight.priority.to_string())
            .bind(&insight.related_goal_id)
            .bind(insight.actionable as i64)
            .bind(&insight.suggested_action)
            .bind(insight.created_at)
            .bind(insight.expires_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn pending_insights(
        &self,
        tenant: &Tenant,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ProactiveInsight>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM proactive_insights
            WHERE tenant_id = ? AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY
                CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
                created_at DESC
            LIMIT ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_insight).collect())
    }

    async fn get_settings(&self, tenant: &Tenant) -> Result<Option<UserSettings>> {
        let row = sqlx::query(
            "SELECT * FROM user_settings WHERE user_id = ? AND tenant_id = ?",
        )
        .bind(&tenant.user_id)
        .bind(&tenant.tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| UserSettings {
            engagement_level: EngagementLevel::from_number(
                row.get::<i64, _>("engagement_level").clamp(1, 3) as u8,
            ),
            last_interaction: row.get("last_interaction"),
        }))
    }

    async fn upsert_settings(&self, tenant: &Tenant, settings: &UserSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, tenant_id, engagement_level, last_interaction)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, tenant_id) DO UPDATE SET
                engagement_level = excluded.engagement_level,
                last_interaction = excluded.last_interaction
            "#,
        )
        .bind(&tenant.user_id)
        .bind(&tenant.tenant_id)
        .bind(settings.engagement_level.as_number() as i64)
        .bind(settings.last_interaction)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_turn(&self, turn: &ConversationTurn) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, tenant_id, session_id, role, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&turn.id)
        .bind(&turn.user_id)
        .bind(&turn.tenant_id)
        .bind(&turn.session_id)
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(turn.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_user_messages(&self, tenant: &Tenant, limit: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT content FROM conversations
            WHERE tenant_id = ? AND role = 'user'
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(&tenant.tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("content")).collect())
    }

    async fn last_turn_at(&self, tenant: &Tenant) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(created_at) AS last FROM conversations WHERE tenant_id = ?",
        )
        .bind(&tenant.tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("last"))
    }

    async fn session_turn_count(&self, session_id: &str) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM conversations WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n").max(0) as usize)
    }

    async fn stats(&self, tenant: &Tenant) -> Result<StorageStats> {
        let count = |table: &'static str| {
            let pool = self.pool.clone();
            let tenant_id = tenant.tenant_id.clone();
            async move {
                let sql = format!("SELECT COUNT(*) AS n FROM {table} WHERE tenant_id = ?");
                let row = sqlx::query(&sql).bind(tenant_id).fetch_one(&pool).await?;
                Ok::<usize, crate::error::AgentError>(row.get::<i64, _>("n").max(0) as usize)
            }
        };

        Ok(StorageStats {
            memories: count("memories").await?,
            goals: count("goals").await?,
            entities: count("knowledge_entities").await?,
            relationships: count("knowledge_relationships").await?,
            feedback: count("feedback").await?,
            reflections: count("reflections").await?,
            insights: count("proactive_insights").await?,
            turns: count("conversations").await?,
        })
    }
}
