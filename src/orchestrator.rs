//! Top-level turn coordinator
//!
//! `build_context` fans out to every context source in parallel and
//! assembles the system prompt; `process_message` runs the draft response
//! through reflection, goal detection, proactive offers, and the
//! knowledge-graph update. Goal creation and knowledge processing are
//! dispatched as detached tasks - they start before the response is
//! returned but never delay or fail it. Each subsystem guarantees a safe
//! return value, so nothing here needs its own recovery wrapping: the
//! fully degraded turn is still a valid turn.

use crate::agents::MultiAgentSystem;
use crate::engagement::{EngagementLevel, EngagementManager};
use crate::generation::TextGenerator;
use crate::goals::{GoalManager, GoalStats};
use crate::knowledge::{KnowledgeGraph, KnowledgeStats};
use crate::learning::{ContinuousLearner, FeedbackKind, FeedbackStats};
use crate::proactive::ProactiveEngine;
use crate::reflection::{AverageScores, SelfReflection};
use crate::storage::Storage;
use crate::types::Tenant;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// How many memories are injected into the system prompt
const MEMORY_LIMIT: i64 = 15;

/// Per-turn composition of everything the assistant knows going in
#[derive(Debug, Clone)]
pub struct AgenticContext {
    pub tenant: Tenant,
    pub session_id: String,
    pub engagement_level: EngagementLevel,
    pub system_prompt: String,
    pub memories: String,
    pub goals: String,
    pub knowledge: String,
    pub proactive_insights: String,
    pub learnings: String,
    pub interaction_count: u64,
}

/// Metadata attached to every processed turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMetadata {
    pub engagement_level: EngagementLevel,
    pub engagement_name: String,
    pub session_id: String,
    pub interaction_count: u64,
}

/// The final response and what the pipeline did to it
#[derive(Debug, Clone)]
pub struct AgenticResponse {
    pub response: String,
    pub was_revised: bool,
    pub reflection_score: u8,
    pub detected_goal: bool,
    pub proactive_help_offered: bool,
    pub metadata: ResponseMetadata,
}

/// Read-only status aggregation for dashboards
#[derive(Debug, Clone)]
pub struct CapabilitiesStatus {
    pub engagement_level: EngagementLevel,
    pub engagement_name: String,
    pub reflection: AverageScores,
    pub learning: FeedbackStats,
    pub goals: GoalStats,
    pub knowledge: KnowledgeStats,
}

/// Coordinates all agentic subsystems for one user session
pub struct AgenticOrchestrator {
    tenant: Tenant,
    session_id: String,
    storage: Arc<dyn Storage>,
    engagement: EngagementManager,
    reflection: SelfReflection,
    learner: ContinuousLearner,
    goals: Arc<GoalManager>,
    proactive: ProactiveEngine,
    knowledge: Arc<KnowledgeGraph>,
    agents: MultiAgentSystem,
}

impl AgenticOrchestrator {
    pub fn new(
        tenant: Tenant,
        storage: Arc<dyn Storage>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let session_id = format!("session-{}-{}", tenant.user_id, Uuid::new_v4());
        Self {
            engagement: EngagementManager::new(tenant.clone(), Arc::clone(&storage)),
            reflection: SelfReflection::new(
                tenant.clone(),
                Arc::clone(&storage),
                Arc::clone(&generator),
            ),
            learner: ContinuousLearner::new(
                tenant.clone(),
                Arc::clone(&storage),
                Arc::clone(&generator),
            ),
            goals: Arc::new(GoalManager::new(
                tenant.clone(),
                Arc::clone(&storage),
                Arc::clone(&generator),
            )),
            proactive: ProactiveEngine::new(
                tenant.clone(),
                Arc::clone(&storage),
                Arc::clone(&generator),
            ),
            knowledge: Arc::new(KnowledgeGraph::new(
                tenant.clone(),
                Arc::clone(&storage),
                Arc::clone(&generator),
            )),
            agents: MultiAgentSystem::new(generator),
            tenant,
            session_id,
            storage,
        }
    }

    /// Resume an existing session instead of generating a fresh id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Load persisted settings and propagate them to the subsystems
    pub async fn initialize(&self) {
        self.engagement.initialize().await;
        self.proactive.set_level(self.engagement.level());
    }

    /// Build the complete agentic context for one turn
    ///
    /// The five context sources are independent reads and run
    /// concurrently; any one of them failing contributes an empty block.
    pub async fn build_context(&self, user_query: &str) -> AgenticContext {
        let engagement_level = self.engagement.level();

        let (goals, knowledge, proactive_insights, learnings, interaction_count) = tokio::join!(
            self.goals.goal_context(),
            self.knowledge.knowledge_context(user_query),
            self.proactive.proactive_context(),
            self.learner.personalization_context(),
            self.interaction_count(),
        );

        let memories = self.memory_context().await;

        let system_prompt = self.build_system_prompt(
            engagement_level,
            &memories,
            &goals,
            &knowledge,
            &proactive_insights,
            &learnings,
        );

        AgenticContext {
            tenant: self.tenant.clone(),
            session_id: self.session_id.clone(),
            engagement_level,
            system_prompt,
            memories,
            goals,
            knowledge,
            proactive_insights,
            learnings,
            interaction_count,
        }
    }

    /// Run a draft response through the full agentic pipeline
    pub async fn process_message(
        &self,
        user_query: &str,
        ai_response: &str,
        context: &AgenticContext,
    ) -> AgenticResponse {
        // 1. Self-reflection; may replace the draft
        let outcome = self
            .reflection
            .evaluate_and_revise(user_query, ai_response, Some(&context.system_prompt))
            .await;
        let mut final_response = outcome.response;
        let was_revised = outcome.was_revised;
        let reflection_score = outcome.reflection.scores.overall;

        // 2. Goal detection on the user query; creation is detached so
        //    decomposition latency never delays the turn
        let detection = self.goals.detect_goal(user_query).await;
        let detected_goal = detection.is_goal && detection.goal_data.is_some();
        if detected_goal {
            let goals = Arc::clone(&self.goals);
            let draft = detection.goal_data.unwrap_or_default();
            tokio::spawn(async move {
                if goals.create_goal(draft).await.is_none() {
                    tracing::warn!("detached goal creation failed");
                }
            });
        }

        // 3. Proactive help offer, appended once at most
        let mut proactive_help_offered = false;
        let state = self.engagement.analyze_user_state(user_query);
        if let Some(offer) = self.engagement.generate_help_offer(&state) {
            if !final_response.contains(&offer) {
                final_response.push_str(&format!("\n\n{offer}"));
                proactive_help_offered = true;
            }
        }

        // 4. Interaction-cadence check-in, same idempotence guard
        if self.engagement.should_check_in(context.interaction_count) {
            let check_in = self.engagement.check_in_message();
            if !final_response.contains(check_in) {
                final_response.push_str(&format!("\n\n{check_in}"));
            }
        }

        // 5. Knowledge-graph update, detached and log-only
        let knowledge = Arc::clone(&self.knowledge);
        let query = user_query.to_string();
        let response = final_response.clone();
        tokio::spawn(async move {
            knowledge.process_conversation(&query, &response).await;
        });

        // 6. Interaction bookkeeping
        self.touch_settings().await;

        AgenticResponse {
            response: final_response,
            was_revised,
            reflection_score,
            detected_goal,
            proactive_help_offered,
            metadata: ResponseMetadata {
                engagement_level: context.engagement_level,
                engagement_name: context.engagement_level.config().name.to_string(),
                session_id: self.session_id.clone(),
                interaction_count: context.interaction_count + 1,
            },
        }
    }

    fn build_system_prompt(
        &self,
        level: EngagementLevel,
        memories: &str,
        goals: &str,
        knowledge: &str,
        proactive: &str,
        learnings: &str,
    ) -> String {
        format!(
            "You are Eve, an intelligent AI assistant.\n\n\
             ## CORE IDENTITY\n\
             - You have persistent memory and remember information users share with you\n\
             - You adapt your communication style to match the user\n\
             - You help users achieve their goals proactively\n\
             - You learn from interactions and improve over time\n\n\
             {}\n\
             {memories}\n{goals}\n{knowledge}\n{proactive}\n{learnings}\n\
             ## CURRENT INTERACTION\n\
             Respond helpfully to the user's message. Apply your learned preferences and \
             remembered information to personalize your response.\n\n\
             Current Date: {}\n",
            level.config().prompt_additions,
            Utc::now().to_rfc3339()
        )
    }

    /// Top memories rendered for the system prompt; empty on failure
    async fn memory_context(&self) -> String {
        let memories = match self.storage.top_memories(&self.tenant, MEMORY_LIMIT).await {
            Ok(memories) => memories,
            Err(e) => {
                tracing::warn!("failed to get memories: {e}");
                return String::new();
            }
        };
        if memories.is_empty() {
            return String::new();
        }

        let mut context = String::from(
            "\n## REMEMBERED INFORMATION ABOUT THIS USER\n\
             You have learned the following from previous conversations:\n",
        );
        for (i, memory) in memories.iter().enumerate() {
            context.push_str(&format!(
                "{}. [{}] {}\n",
                i + 1,
                memory.memory_type,
                memory.content
            ));
        }
        context.push_str("\nUse this information to personalize your responses.\n");
        context
    }

    async fn interaction_count(&self) -> u64 {
        self.storage
            .session_turn_count(&self.session_id)
            .await
            .unwrap_or(0) as u64
    }

    async fn touch_settings(&self) {
        let mut settings = self
            .storage
            .get_settings(&self.tenant)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        settings.engagement_level = self.engagement.level();
        settings.last_interaction = Some(Utc::now());
        if let Err(e) = self.storage.upsert_settings(&self.tenant, &settings).await {
            tracing::warn!("failed to update interaction settings: {e}");
        }
    }

    /// Set and persist the engagement level, propagating to the proactive
    /// engine
    pub async fn set_engagement_level(&self, level: EngagementLevel) {
        self.engagement.set_level(level).await;
        self.proactive.set_level(level);
    }

    pub fn engagement_level(&self) -> EngagementLevel {
        self.engagement.level()
    }

    /// Record user feedback on an interaction
    pub async fn record_feedback(
        &self,
        interaction_id: &str,
        feedback: FeedbackKind,
        comment: Option<String>,
    ) {
        self.learner
            .record_feedback(interaction_id, feedback, comment)
            .await;
    }

    /// Joined subsystem stats for dashboards; not on the turn hot path
    pub async fn capabilities_status(&self) -> CapabilitiesStatus {
        let (reflection, learning, goals, knowledge) = tokio::join!(
            self.reflection.average_scores(30),
            self.learner.feedback_stats(),
            self.goals.goal_stats(),
            self.knowledge.stats(),
        );

        let level = self.engagement.level();
        CapabilitiesStatus {
            engagement_level: level,
            engagement_name: level.config().name.to_string(),
            reflection,
            learning,
            goals,
            knowledge,
        }
    }

    /// Delegate a complex objective to the multi-agent system
    pub async fn execute_complex_task(&self, objective: &str, context: &str) -> String {
        let plan = self.agents.create_plan(objective, context).await;
        let run = self.agents.execute_plan(&plan).await;
        run.final_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalStatus;
    use crate::memstore::InMemoryStore;
    use crate::test_util::ScriptedGenerator;
    use crate::types::{ConversationTurn, Memory, MemoryType, TurnRole};
    use std::time::Duration;

    const PASSING_EVALUATION: &str = r#"{"scores": {"accuracy": 85, "helpfulness": 85, "completeness": 85, "clarity": 85, "empathy": 85}, "improvements": [], "shouldRevise": false, "reasoning": "good"}"#;
    const NO_GOAL: &str = r#"{"isGoal": false, "confidence": 5}"#;

    fn tenant() -> Tenant {
        Tenant::new("u1", "t1")
    }

    fn orchestrator_with(replies: Vec<&str>) -> (AgenticOrchestrator, Arc<InMemoryStore>) {
        let storage = Arc::new(InMemoryStore::new());
        let orchestrator = AgenticOrchestrator::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::new(replies)),
        );
        (orchestrator, storage)
    }

    async fn wait_for<F, Fut>(mut probe: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..50 {
            if probe().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn context_carries_memories_verbatim() {
        let (orchestrator, storage) = orchestrator_with(vec![]);
        storage
            .add_memory(&Memory::new(
                &tenant(),
                "The user's favorite color is purple",
                MemoryType::Preference,
            ))
            .await
            .unwrap();
        storage
            .add_memory(&Memory::new(
                &tenant(),
                "The user's dog is named Max",
                MemoryType::Fact,
            ))
            .await
            .unwrap();

        let context = orchestrator
            .build_context("What is my favorite color and what is my dog's name?")
            .await;

        assert!(context.memories.contains("purple"));
        assert!(context.memories.contains("Max"));
        assert!(context.system_prompt.contains("purple"));
        assert!(context.system_prompt.contains("Max"));
        assert!(context.system_prompt.contains("ENGAGEMENT MODE: CO-WORKER"));
        assert_eq!(context.interaction_count, 0);
    }

    #[tokio::test]
    async fn context_degrades_to_empty_blocks() {
        let storage = Arc::new(InMemoryStore::new());
        let orchestrator = AgenticOrchestrator::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::failing()),
        );

        let context = orchestrator.build_context("hello").await;
        assert_eq!(context.memories, "");
        assert_eq!(context.goals, "");
        assert_eq!(context.knowledge, "");
        assert_eq!(context.proactive_insights, "");
        assert_eq!(context.learnings, "");
        assert!(context.system_prompt.contains("You are Eve"));
    }

    #[tokio::test]
    async fn clean_turn_passes_the_draft_through() {
        let (orchestrator, _) = orchestrator_with(vec![PASSING_EVALUATION, NO_GOAL]);
        let context = orchestrator.build_context("hello").await;

        let result = orchestrator
            .process_message("hello", "Hi! How can I help?", &context)
            .await;

        assert_eq!(result.response, "Hi! How can I help?");
        assert!(!result.was_revised);
        assert_eq!(result.reflection_score, 85);
        assert!(!result.detected_goal);
        assert!(!result.proactive_help_offered);
        assert_eq!(result.metadata.interaction_count, 1);
        assert_eq!(result.metadata.engagement_name, "Co-Worker");
    }

    #[tokio::test]
    async fn fully_degraded_turn_is_still_valid() {
        let storage = Arc::new(InMemoryStore::new());
        let orchestrator = AgenticOrchestrator::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::failing()),
        );
        let context = orchestrator.build_context("hello").await;

        let result = orchestrator
            .process_message("hello", "The draft.", &context)
            .await;

        assert_eq!(result.response, "The draft.");
        assert!(!result.was_revised);
        assert_eq!(result.reflection_score, 75);
        assert!(!result.detected_goal);
        assert!(!result.proactive_help_offered);
    }

    #[tokio::test]
    async fn revision_replaces_the_response() {
        let (orchestrator, _) = orchestrator_with(vec![
            r#"{"scores": {"accuracy": 55, "helpfulness": 55, "completeness": 55, "clarity": 55, "empathy": 55}, "improvements": ["be concrete"], "shouldRevise": true, "reasoning": "vague"}"#,
            "A concrete, improved answer.",
            NO_GOAL,
        ]);
        let context = orchestrator.build_context("help me plan").await;

        let result = orchestrator
            .process_message("help me plan", "Something vague.", &context)
            .await;

        assert!(result.was_revised);
        assert_eq!(result.reflection_score, 55);
        assert!(result.response.starts_with("A concrete, improved answer."));
    }

    #[tokio::test]
    async fn help_offer_is_appended_once() {
        let (orchestrator, _) = orchestrator_with(vec![
            PASSING_EVALUATION,
            NO_GOAL,
            PASSING_EVALUATION,
            NO_GOAL,
        ]);
        orchestrator
            .set_engagement_level(EngagementLevel::PersonalAssistant)
            .await;
        let context = orchestrator.build_context("I'm stuck on this").await;

        let first = orchestrator
            .process_message("I'm stuck on this", "Here is a hint.", &context)
            .await;
        assert!(first.proactive_help_offered);
        let offer_count = first.response.matches("show you how to approach").count();
        assert_eq!(offer_count, 1);

        // Feeding a draft that already contains the offer must not duplicate it
        let second = orchestrator
            .process_message("I'm stuck on this", &first.response, &context)
            .await;
        assert!(!second.proactive_help_offered);
        assert_eq!(
            second.response.matches("show you how to approach").count(),
            1
        );
    }

    #[tokio::test]
    async fn check_in_fires_on_the_interaction_interval() {
        let (orchestrator, storage) = orchestrator_with(vec![PASSING_EVALUATION, NO_GOAL]);
        for _ in 0..7 {
            storage
                .record_turn(&ConversationTurn::new(
                    &tenant(),
                    orchestrator.session_id(),
                    TurnRole::User,
                    "m",
                ))
                .await
                .unwrap();
        }

        let context = orchestrator.build_context("status?").await;
        assert_eq!(context.interaction_count, 7);

        let result = orchestrator
            .process_message("status?", "All green.", &context)
            .await;
        assert!(result
            .response
            .contains("any routine tasks I can take off your plate"));
    }

    #[tokio::test]
    async fn detected_goal_is_created_in_the_background() {
        let (orchestrator, storage) = orchestrator_with(vec![
            PASSING_EVALUATION,
            r#"{"isGoal": true, "confidence": 90, "goalData": {"title": "Learn Python", "description": "Over two months", "priority": "medium", "category": "learning"}}"#,
            r#"{"subtasks": [{"description": "Install Python"}, {"description": "Do a tutorial"}, {"description": "Build a project"}]}"#,
        ]);
        let context = orchestrator.build_context("I want to learn Python").await;

        let result = orchestrator
            .process_message(
                "I want to learn Python over the next 2 months",
                "Great plan!",
                &context,
            )
            .await;
        assert!(result.detected_goal);

        let created = wait_for(|| {
            let storage = Arc::clone(&storage);
            async move {
                storage
                    .goals_by_status(&tenant(), GoalStatus::Active)
                    .await
                    .map(|goals| goals.iter().any(|g| g.title == "Learn Python"))
                    .unwrap_or(false)
            }
        })
        .await;
        assert!(created, "background goal creation did not land");
    }

    #[tokio::test]
    async fn conversation_knowledge_is_processed_in_the_background() {
        let (orchestrator, storage) = orchestrator_with(vec![
            PASSING_EVALUATION,
            NO_GOAL,
            r#"{"entities": [{"name": "Max", "type": "other", "description": "the user's dog", "confidence": 90}], "relationships": []}"#,
        ]);
        let context = orchestrator.build_context("My dog is named Max").await;

        orchestrator
            .process_message("My dog is named Max", "Noted!", &context)
            .await;

        let stored = wait_for(|| {
            let storage = Arc::clone(&storage);
            async move {
                storage
                    .find_entity_by_name(&tenant(), "Max")
                    .await
                    .map(|e| e.is_some())
                    .unwrap_or(false)
            }
        })
        .await;
        assert!(stored, "background knowledge processing did not land");
    }

    #[tokio::test]
    async fn engagement_level_round_trips_through_initialize() {
        let (orchestrator, storage) = orchestrator_with(vec![]);
        orchestrator
            .set_engagement_level(EngagementLevel::PersonalAssistant)
            .await;

        let fresh = AgenticOrchestrator::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::new(vec![])),
        );
        assert_eq!(fresh.engagement_level(), EngagementLevel::CoWorker);
        fresh.initialize().await;
        assert_eq!(fresh.engagement_level(), EngagementLevel::PersonalAssistant);
        assert_eq!(fresh.proactive.level(), EngagementLevel::PersonalAssistant);
    }

    #[tokio::test]
    async fn capabilities_status_reports_across_subsystems() {
        let (orchestrator, _) = orchestrator_with(vec![PASSING_EVALUATION, NO_GOAL]);
        let context = orchestrator.build_context("hi").await;
        orchestrator.process_message("hi", "hello", &context).await;

        let status = orchestrator.capabilities_status().await;
        assert_eq!(status.engagement_name, "Co-Worker");
        assert_eq!(status.reflection.count, 1);
        assert_eq!(status.reflection.overall, 85);
        assert_eq!(status.learning.total, 0);
        assert_eq!(status.goals.total, 0);
    }

    #[tokio::test]
    async fn complex_tasks_run_through_the_multi_agent_system() {
        let (orchestrator, _) = orchestrator_with(vec![
            r#"{"tasks": [{"id": "task-1", "role": "researcher", "objective": "dig", "context": "c", "expectedOutput": "facts"}], "executionOrder": ["task-1"], "estimatedTime": "5m"}"#,
            r#"{"output": "facts found", "confidence": 90, "reasoning": "r"}"#,
            "The final synthesis.",
        ]);

        let output = orchestrator
            .execute_complex_task("research the market", "B2B context")
            .await;
        assert_eq!(output, "The final synthesis.");
    }

    #[tokio::test]
    async fn feedback_flows_through_to_the_learner() {
        let (orchestrator, storage) = orchestrator_with(vec![]);
        orchestrator
            .record_feedback("i1", FeedbackKind::Positive, Some("nice".to_string()))
            .await;
        assert_eq!(storage.feedback_count(&tenant()).await.unwrap(), 1);
    }
}
