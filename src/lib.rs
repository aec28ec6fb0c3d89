//! # eve-core - Agentic orchestration core for the Eve assistant
//!
//! Composes memory retrieval, goal tracking, knowledge-graph extraction,
//! proactive insights, self-reflection, and multi-agent task decomposition
//! into one response-generation cycle per user turn. The web surface,
//! authentication, and connector integrations live outside this crate; it
//! consumes a [`Storage`] backend and a [`TextGenerator`] and exposes the
//! [`AgenticOrchestrator`] to the turn-handling boundary.

pub mod agents;
pub mod config;
pub mod engagement;
pub mod error;
pub mod generation;
pub mod goals;
pub mod knowledge;
pub mod learning;
pub mod memstore;
pub mod orchestrator;
pub mod proactive;
pub mod rate_limit;
pub mod reflection;
pub mod storage;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use agents::{
    AgentResult, AgentRole, AgentTask, MultiAgentPlan, MultiAgentSystem, PlanRun,
};
pub use config::CoreConfig;
pub use engagement::{
    analyze_user_state, CheckInFrequency, EngagementConfig, EngagementLevel, EngagementManager,
    OfferHelp, QuestionDepth, UserState,
};
pub use error::{AgentError, Result};
pub use generation::{decode_json, extract_json_object, OpenRouterGenerator, TextGenerator};
pub use goals::{
    Goal, GoalDetection, GoalDraft, GoalManager, GoalPriority, GoalStats, GoalStatus, Subtask,
    SubtaskStatus,
};
pub use knowledge::{
    EntityDraft, EntityType, KnowledgeEntity, KnowledgeGraph, KnowledgeRelationship,
    KnowledgeStats, RelationshipDraft,
};
pub use learning::{
    ContinuousLearner, FeedbackEntry, FeedbackKind, FeedbackStats, LearningPattern, Learnings,
    PreferenceCategory, UserPreference,
};
pub use memstore::InMemoryStore;
pub use orchestrator::{
    AgenticContext, AgenticOrchestrator, AgenticResponse, CapabilitiesStatus, ResponseMetadata,
};
pub use proactive::{InsightPriority, InsightType, ProactiveEngine, ProactiveInsight};
pub use rate_limit::{RateDecision, RateLimiter};
pub use reflection::{
    AverageScores, ImprovementTrend, ReflectionOutcome, ReflectionRecord, ReflectionResult,
    ReflectionScores, SelfReflection,
};
pub use storage::{Storage, StorageStats};
pub use store::SqliteStore;
pub use types::{ConversationTurn, Memory, MemoryType, Tenant, TurnRole, UserSettings};
