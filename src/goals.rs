//! Goal tracking: detection, decomposition into subtasks, and progress

use crate::generation::{decode_json, TextGenerator};
use crate::storage::Storage;
use crate::types::Tenant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle state of a goal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Abandoned,
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalStatus::Active => write!(f, "active"),
            GoalStatus::Completed => write!(f, "completed"),
            GoalStatus::Paused => write!(f, "paused"),
            GoalStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Goal priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl GoalPriority {
    /// Sort rank, highest priority first
    pub fn rank(&self) -> u8 {
        match self {
            GoalPriority::Critical => 3,
            GoalPriority::High => 2,
            GoalPriority::Medium => 1,
            GoalPriority::Low => 0,
        }
    }
}

impl std::fmt::Display for GoalPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalPriority::Low => write!(f, "low"),
            GoalPriority::Medium => write!(f, "medium"),
            GoalPriority::High => write!(f, "high"),
            GoalPriority::Critical => write!(f, "critical"),
        }
    }
}

/// State of a single subtask
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

/// An atomic unit of a goal's decomposition, owned by its parent goal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subtask {
    pub id: String,
    pub description: String,
    pub status: SubtaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Subtask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: format!("st-{}", Uuid::new_v4()),
            description: description.into(),
            status: SubtaskStatus::Pending,
            estimated_time: None,
            completed_at: None,
            notes: None,
        }
    }

    pub fn with_estimated_time(mut self, estimated_time: impl Into<String>) -> Self {
        self.estimated_time = Some(estimated_time.into());
        self
    }
}

/// A tracked, multi-step objective
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub title: String,
    pub description: String,
    pub status: GoalStatus,
    pub priority: GoalPriority,
    pub category: String,
    pub subtasks: Vec<Subtask>,
    /// 0 - 100, always `round(100 * completed / total)` of the subtasks
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    pub fn new(
        tenant: &Tenant,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: GoalPriority,
        category: impl Into<String>,
        subtasks: Vec<Subtask>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: tenant.user_id.clone(),
            tenant_id: tenant.tenant_id.clone(),
            title: title.into(),
            description: description.into(),
            status: GoalStatus::Active,
            priority,
            category: category.into(),
            subtasks,
            progress: 0,
            target_date: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_target_date(mut self, target_date: DateTime<Utc>) -> Self {
        self.target_date = Some(target_date);
        self
    }

    /// Recompute `progress` from subtask states and keep `status` in sync:
    /// a goal is completed exactly when progress reaches 100
    pub fn recalculate_progress(&mut self) {
        let total = self.subtasks.len();
        let completed = self
            .subtasks
            .iter()
            .filter(|st| st.status == SubtaskStatus::Completed)
            .count();

        self.progress = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };

        if self.progress == 100 {
            if self.status != GoalStatus::Completed {
                self.status = GoalStatus::Completed;
                self.completed_at = Some(Utc::now());
            }
        } else if self.status == GoalStatus::Completed {
            self.status = GoalStatus::Active;
            self.completed_at = None;
        }
        self.updated_at = Utc::now();
    }

    /// First subtask still pending, if any
    pub fn next_pending_subtask(&self) -> Option<&Subtask> {
        self.subtasks
            .iter()
            .find(|st| st.status == SubtaskStatus::Pending)
    }
}

/// Extracted goal fields from a detection pass; all optional, defaults
/// applied at creation time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GoalDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<GoalPriority>,
    pub category: Option<String>,
}

/// Result of running goal detection over a user message
#[derive(Debug, Clone, Default)]
pub struct GoalDetection {
    pub is_goal: bool,
    pub confidence: u8,
    pub goal_data: Option<GoalDraft>,
}

/// Aggregate goal counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub average_progress: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectionReply {
    is_goal: bool,
    #[serde(default)]
    confidence: u8,
    #[serde(default)]
    goal_data: Option<GoalDraft>,
}

#[derive(Deserialize)]
struct DecompositionReply {
    #[serde(default)]
    subtasks: Vec<SubtaskDraft>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubtaskDraft {
    description: String,
    #[serde(default)]
    estimated_time: Option<String>,
}

#[derive(Deserialize)]
struct SuggestionsReply {
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Detects, creates, and tracks goals for one tenant
pub struct GoalManager {
    tenant: Tenant,
    storage: Arc<dyn Storage>,
    generator: Arc<dyn TextGenerator>,
}

impl GoalManager {
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

    /// Classify whether a user message expresses a trackable goal
    ///
    /// Accepts the detection only when the grader both flags it and reports
    /// confidence above 70; everything else (including unparseable replies)
    /// is a non-detection.
    pub async fn detect_goal(&self, message: &str) -> GoalDetection {
        let prompt = format!(
            "Analyze this user message to see if they are expressing a long-term goal or a \
             complex task that should be tracked.\n\n\
             USER MESSAGE: \"{message}\"\n\n\
             If it is a goal, extract a title, brief description, and estimated priority.\n\
             A goal is something that takes multiple steps or happens over time (e.g., \"I want \
             to learn Python\", \"Plan my wedding\", \"Build a startup\").\n\
             A simple command or question is NOT a goal (e.g., \"What time is it?\", \"Tell me \
             a joke\", \"Send an email\").\n\n\
             Respond ONLY with valid JSON:\n\
             {{\n\
               \"isGoal\": <boolean>,\n\
               \"confidence\": <0-100>,\n\
               \"goalData\": {{\n\
                 \"title\": \"<short descriptive title>\",\n\
                 \"description\": \"<brief description>\",\n\
                 \"priority\": \"<low|medium|high|critical>\",\n\
                 \"category\": \"<learning|project|personal|health|work|other>\"\n\
               }}\n\
             }}"
        );

        let text = match self.generator.generate(&prompt, 0.2).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("goal detection call failed: {e}");
                return GoalDetection::default();
            }
        };

        match decode_json::<DetectionReply>(&text) {
            Some(reply) => GoalDetection {
                is_goal: reply.is_goal && reply.confidence > 70,
                confidence: reply.confidence,
                goal_data: reply.goal_data,
            },
            None => GoalDetection::default(),
        }
    }

    /// Create a goal from a draft, decomposing it into subtasks first
    ///
    /// Decomposition is best-effort; a goal with zero subtasks is still
    /// created. Returns `None` when persistence fails.
    pub async fn create_goal(&self, draft: GoalDraft) -> Option<Goal> {
        let title = draft.title.unwrap_or_else(|| "Untitled Goal".to_string());
        let description = draft.description.unwrap_or_default();
        let subtasks = self.decompose_goal(&title, &description).await;

        let goal = Goal::new(
            &self.tenant,
            title,
            description,
            draft.priority.unwrap_or(GoalPriority::Medium),
            draft.category.unwrap_or_else(|| "other".to_string()),
            subtasks,
        );

        match self.storage.insert_goal(&goal).await {
            Ok(()) => Some(goal),
            Err(e) => {
                tracing::warn!("failed to create goal: {e}");
                None
            }
        }
    }

    /// Break a goal into 3-7 actionable subtasks; empty on any failure
    async fn decompose_goal(&self, title: &str, description: &str) -> Vec<Subtask> {
        let prompt = format!(
            "Break down this goal into 3-7 actionable subtasks.\n\n\
             GOAL: {title}\n\
             DESCRIPTION: {description}\n\n\
             Each subtask should be clear and specific.\n\
             Respond ONLY with valid JSON:\n\
             {{\n\
               \"subtasks\": [\n\
                 {{\"description\": \"<task description>\", \"estimatedTime\": \"<e.g. 2 hours, 1 week>\"}}\n\
               ]\n\
             }}"
        );

        let text = match self.generator.generate(&prompt, 0.3).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("goal decomposition call failed: {e}");
                return Vec::new();
            }
        };

        decode_json::<DecompositionReply>(&text)
            .map(|reply| {
                reply
                    .subtasks
                    .into_iter()
                    .map(|draft| {
                        let mut st = Subtask::new(draft.description);
                        st.estimated_time = draft.estimated_time;
                        st
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All active goals, highest priority first; empty on storage failure
    pub async fn active_goals(&self) -> Vec<Goal> {
        match self
            .storage
            .goals_by_status(&self.tenant, GoalStatus::Active)
            .await
        {
            Ok(mut goals) => {
                goals.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
                goals
            }
            Err(e) => {
                tracing::warn!("failed to fetch active goals: {e}");
                Vec::new()
            }
        }
    }

    /// Update one subtask's status, recompute progress, and persist
    ///
    /// Returns the updated goal, or `None` when the goal or subtask is
    /// missing or persistence fails.
    pub async fn update_subtask(
        &self,
        goal_id: &str,
        subtask_id: &str,
        status: SubtaskStatus,
        notes: Option<String>,
    ) -> Option<Goal> {
        let mut goal = match self.storage.get_goal(&self.tenant, goal_id).await {
            Ok(Some(goal)) => goal,
            Ok(None) => {
                tracing::warn!("subtask update: goal {goal_id} not found");
                return None;
            }
            Err(e) => {
                tracing::warn!("subtask update: fetch failed: {e}");
                return None;
            }
        };

        let subtask = match goal.subtasks.iter_mut().find(|st| st.id == subtask_id) {
            Some(subtask) => subtask,
            None => {
                tracing::warn!("subtask update: subtask {subtask_id} not found");
                return None;
            }
        };

        subtask.status = status;
        if let Some(notes) = notes {
            subtask.notes = Some(notes);
        }
        if status == SubtaskStatus::Completed {
            subtask.completed_at = Some(Utc::now());
        }

        goal.recalculate_progress();

        match self.storage.update_goal(&goal).await {
            Ok(()) => Some(goal),
            Err(e) => {
                tracing::warn!("subtask update: persist failed: {e}");
                None
            }
        }
    }

    /// Suggest 3 motivating next actions from pending/in-progress subtasks;
    /// empty when there is nothing active or the call fails
    pub async fn suggest_next_actions(&self) -> Vec<String> {
        let goals = self.active_goals().await;
        if goals.is_empty() {
            return Vec::new();
        }

        let active_subtasks: Vec<String> = goals
            .iter()
            .flat_map(|g| {
                g.subtasks
                    .iter()
                    .filter(|st| {
                        matches!(st.status, SubtaskStatus::Pending | SubtaskStatus::InProgress)
                    })
                    .map(move |st| format!("- [{}] {}", g.title, st.description))
            })
            .take(5)
            .collect();

        if active_subtasks.is_empty() {
            return Vec::new();
        }

        let prompt = format!(
            "Based on these active goal subtasks, suggest 3 concise, motivating next actions \
             for the user.\n\n\
             SUBTASKS:\n{}\n\n\
             Respond ONLY with valid JSON:\n\
             {{\n\
               \"suggestions\": [\"<suggestion 1>\", \"<suggestion 2>\", \"<suggestion 3>\"]\n\
             }}",
            active_subtasks.join("\n")
        );

        match self.generator.generate(&prompt, 0.7).await {
            Ok(text) => decode_json::<SuggestionsReply>(&text)
                .map(|r| r.suggestions)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Aggregate counters across all goals; zeroed on storage failure
    pub async fn goal_stats(&self) -> GoalStats {
        let goals = match self.storage.all_goals(&self.tenant).await {
            Ok(goals) => goals,
            Err(e) => {
                tracing::warn!("failed to fetch goal stats: {e}");
                return GoalStats::default();
            }
        };

        if goals.is_empty() {
            return GoalStats::default();
        }

        let total_progress: u32 = goals.iter().map(|g| g.progress as u32).sum();
        GoalStats {
            total: goals.len(),
            active: goals.iter().filter(|g| g.status == GoalStatus::Active).count(),
            completed: goals
                .iter()
                .filter(|g| g.status == GoalStatus::Completed)
                .count(),
            average_progress: (total_progress as f64 / goals.len() as f64).round() as u8,
        }
    }

    /// Prompt-injectable block of active goals; empty string when none
    pub async fn goal_context(&self) -> String {
        let goals = self.active_goals().await;
        if goals.is_empty() {
            return String::new();
        }

        let mut context = String::from("\n## ACTIVE GOALS\nThe user is working toward these goals:\n");
        for (i, goal) in goals.iter().enumerate() {
            context.push_str(&format!(
                "{}. {} ({}% complete, priority: {})",
                i + 1,
                goal.title,
                goal.progress,
                goal.priority
            ));
            if let Some(next) = goal.next_pending_subtask() {
                context.push_str(&format!(" - next up: {}", next.description));
            }
            context.push('\n');
        }
        context.push_str("\nReference these goals when relevant and encourage progress.\n");
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memstore::InMemoryStore;
    use crate::test_util::ScriptedGenerator;

    fn tenant() -> Tenant {
        Tenant::new("u1", "t1")
    }

    fn manager_with(replies: Vec<&str>) -> (GoalManager, Arc<InMemoryStore>) {
        let storage = Arc::new(InMemoryStore::new());
        let manager = GoalManager::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::new(replies)),
        );
        (manager, storage)
    }

    fn goal_with_subtasks(n: usize) -> Goal {
        let subtasks = (0..n).map(|i| Subtask::new(format!("step {i}"))).collect();
        Goal::new(
            &tenant(),
            "Learn Rust",
            "Become productive in Rust",
            GoalPriority::High,
            "learning",
            subtasks,
        )
    }

    #[tokio::test]
    async fn question_is_not_a_goal() {
        let (manager, _) = manager_with(vec![r#"{"isGoal": false, "confidence": 5}"#]);
        let detection = manager.detect_goal("What time is it?").await;
        assert!(!detection.is_goal);
    }

    #[tokio::test]
    async fn confident_detection_is_accepted_with_title() {
        let (manager, _) = manager_with(vec![
            r#"{"isGoal": true, "confidence": 88, "goalData": {"title": "Learn Python", "description": "Learn Python over 2 months", "priority": "medium", "category": "learning"}}"#,
        ]);
        let detection = manager
            .detect_goal("I want to learn Python over the next 2 months")
            .await;
        assert!(detection.is_goal);
        assert_eq!(
            detection.goal_data.unwrap().title.as_deref(),
            Some("Learn Python")
        );
    }

    #[tokio::test]
    async fn low_confidence_detection_is_suppressed() {
        let (manager, _) = manager_with(vec![r#"{"isGoal": true, "confidence": 60}"#]);
        let detection = manager.detect_goal("maybe I should exercise").await;
        assert!(!detection.is_goal);
        assert_eq!(detection.confidence, 60);
    }

    #[tokio::test]
    async fn garbage_reply_is_a_non_detection() {
        let (manager, _) = manager_with(vec!["definitely a goal, trust me"]);
        let detection = manager.detect_goal("I want to run a marathon").await;
        assert!(!detection.is_goal);
        assert_eq!(detection.confidence, 0);
    }

    #[tokio::test]
    async fn create_goal_decomposes_and_persists() {
        let (manager, storage) = manager_with(vec![
            r#"{"subtasks": [
                {"description": "Install the toolchain", "estimatedTime": "1 hour"},
                {"description": "Read the book"},
                {"description": "Build a small project", "estimatedTime": "2 weeks"}
            ]}"#,
        ]);

        let goal = manager
            .create_goal(GoalDraft {
                title: Some("Learn Rust".to_string()),
                description: Some("Become productive".to_string()),
                priority: Some(GoalPriority::High),
                category: Some("learning".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, 0);
        assert_eq!(goal.subtasks.len(), 3);
        assert_eq!(goal.subtasks[0].estimated_time.as_deref(), Some("1 hour"));

        let stored = storage.get_goal(&tenant(), &goal.id).await.unwrap().unwrap();
        assert_eq!(stored, goal);
    }

    #[tokio::test]
    async fn create_goal_survives_failed_decomposition() {
        let storage = Arc::new(InMemoryStore::new());
        let manager = GoalManager::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::failing()),
        );

        let goal = manager.create_goal(GoalDraft::default()).await.unwrap();
        assert_eq!(goal.title, "Untitled Goal");
        assert!(goal.subtasks.is_empty());
    }

    #[tokio::test]
    async fn progress_tracks_completed_subtasks() {
        let (manager, storage) = manager_with(vec![]);
        let goal = goal_with_subtasks(4);
        storage.insert_goal(&goal).await.unwrap();

        let updated = manager
            .update_subtask(&goal.id, &goal.subtasks[0].id, SubtaskStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(updated.progress, 25);
        assert_eq!(updated.status, GoalStatus::Active);

        for st in &goal.subtasks[1..] {
            manager
                .update_subtask(&goal.id, &st.id, SubtaskStatus::Completed, None)
                .await
                .unwrap();
        }

        let done = storage.get_goal(&tenant(), &goal.id).await.unwrap().unwrap();
        assert_eq!(done.progress, 100);
        assert_eq!(done.status, GoalStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn reopening_a_subtask_reopens_the_goal() {
        let (manager, storage) = manager_with(vec![]);
        let mut goal = goal_with_subtasks(2);
        for st in &mut goal.subtasks {
            st.status = SubtaskStatus::Completed;
        }
        goal.recalculate_progress();
        assert_eq!(goal.status, GoalStatus::Completed);
        storage.insert_goal(&goal).await.unwrap();

        let updated = manager
            .update_subtask(&goal.id, &goal.subtasks[0].id, SubtaskStatus::InProgress, None)
            .await
            .unwrap();
        assert_eq!(updated.progress, 50);
        assert_eq!(updated.status, GoalStatus::Active);
        assert!(updated.completed_at.is_none());
    }

    #[tokio::test]
    async fn update_subtask_returns_none_for_missing_records() {
        let (manager, storage) = manager_with(vec![]);
        assert!(manager
            .update_subtask("missing", "st-x", SubtaskStatus::Completed, None)
            .await
            .is_none());

        let goal = goal_with_subtasks(1);
        storage.insert_goal(&goal).await.unwrap();
        assert!(manager
            .update_subtask(&goal.id, "st-missing", SubtaskStatus::Completed, None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn subtask_notes_are_preserved_and_replaced() {
        let (manager, storage) = manager_with(vec![]);
        let goal = goal_with_subtasks(1);
        storage.insert_goal(&goal).await.unwrap();

        let updated = manager
            .update_subtask(
                &goal.id,
                &goal.subtasks[0].id,
                SubtaskStatus::InProgress,
                Some("waiting on review".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(
            updated.subtasks[0].notes.as_deref(),
            Some("waiting on review")
        );

        let updated = manager
            .update_subtask(&goal.id, &goal.subtasks[0].id, SubtaskStatus::Blocked, None)
            .await
            .unwrap();
        assert_eq!(
            updated.subtasks[0].notes.as_deref(),
            Some("waiting on review")
        );
    }

    #[tokio::test]
    async fn suggestions_require_active_subtasks() {
        let (manager, _) = manager_with(vec![]);
        assert!(manager.suggest_next_actions().await.is_empty());
    }

    #[tokio::test]
    async fn suggestions_come_from_the_generator() {
        let (manager, storage) = manager_with(vec![
            r#"{"suggestions": ["Start with step 0", "Block an hour today", "Tell a friend"]}"#,
        ]);
        storage.insert_goal(&goal_with_subtasks(3)).await.unwrap();

        let suggestions = manager.suggest_next_actions().await;
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0], "Start with step 0");
    }

    #[tokio::test]
    async fn goal_stats_aggregate_by_status() {
        let (manager, storage) = manager_with(vec![]);
        let mut done = goal_with_subtasks(1);
        done.subtasks[0].status = SubtaskStatus::Completed;
        done.recalculate_progress();
        storage.insert_goal(&done).await.unwrap();
        storage.insert_goal(&goal_with_subtasks(2)).await.unwrap();

        let stats = manager.goal_stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.average_progress, 50);
    }

    #[tokio::test]
    async fn goal_context_lists_active_goals_with_next_step() {
        let (manager, storage) = manager_with(vec![]);
        assert_eq!(manager.goal_context().await, "");

        storage.insert_goal(&goal_with_subtasks(2)).await.unwrap();
        let context = manager.goal_context().await;
        assert!(context.contains("ACTIVE GOALS"));
        assert!(context.contains("Learn Rust"));
        assert!(context.contains("next up: step 0"));
    }
}
