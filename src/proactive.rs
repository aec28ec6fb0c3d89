//! Proactive insights: reminders, check-ins, tips, and anticipated needs
//!
//! A pure aggregator over goal state and conversation metadata, gated by
//! the engagement level's behavior flags: level 1 produces no insights,
//! level 2 adds contextual tips, level 3 additionally anticipates needs.
//! Every sub-generator is independently best-effort; a failing one simply
//! contributes nothing.

use crate::engagement::EngagementLevel;
use crate::generation::{decode_json, TextGenerator};
use crate::goals::{GoalManager, GoalPriority};
use crate::storage::Storage;
use crate::types::Tenant;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Minimum model confidence for an anticipated need to be surfaced
const MIN_ANTICIPATION_CONFIDENCE: u8 = 60;
/// Recent user messages needed before a contextual tip is attempted
const MIN_MESSAGES_FOR_TIP: usize = 3;
/// Recent user messages needed before anticipation is attempted
const MIN_MESSAGES_FOR_ANTICIPATION: usize = 10;

/// Kinds of proactive insights
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Reminder,
    Suggestion,
    CheckIn,
    Tip,
    Alert,
    GoalUpdate,
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightType::Reminder => write!(f, "reminder"),
            InsightType::Suggestion => write!(f, "suggestion"),
            InsightType::CheckIn => write!(f, "check_in"),
            InsightType::Tip => write!(f, "tip"),
            InsightType::Alert => write!(f, "alert"),
            InsightType::GoalUpdate => write!(f, "goal_update"),
        }
    }
}

/// Insight priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

impl InsightPriority {
    /// Sort rank, highest first
    pub fn rank(&self) -> u8 {
        match self {
            InsightPriority::High => 2,
            InsightPriority::Medium => 1,
            InsightPriority::Low => 0,
        }
    }
}

impl std::fmt::Display for InsightPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightPriority::Low => write!(f, "low"),
            InsightPriority::Medium => write!(f, "medium"),
            InsightPriority::High => write!(f, "high"),
        }
    }
}

/// A system-generated, time-bounded suggestion surfaced without being asked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProactiveInsight {
    pub id: String,
    pub insight_type: InsightType,
    pub title: String,
    pub content: String,
    pub priority: InsightPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_goal_id: Option<String>,
    pub actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Filtered at read time: `None` or a future instant means pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TipReply {
    tip: Option<TipDraft>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TipDraft {
    title: String,
    content: String,
    #[serde(default)]
    actionable: bool,
    #[serde(default)]
    suggested_action: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AnticipationReply {
    anticipation: Option<AnticipationDraft>,
}

#[derive(Deserialize)]
struct AnticipationDraft {
    title: String,
    content: String,
    #[serde(default)]
    confidence: u8,
}

/// Synthesizes goal reminders, check-ins, tips, and anticipated needs
pub struct ProactiveEngine {
    tenant: Tenant,
    storage: Arc<dyn Storage>,
    generator: Arc<dyn TextGenerator>,
    goals: GoalManager,
    level: AtomicU8,
}

impl ProactiveEngine {
    pub fn new(
        tenant: Tenant,
        storage: Arc<dyn Storage>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let goals = GoalManager::new(
            tenant.clone(),
            Arc::clone(&storage),
            Arc::clone(&generator),
        );
        Self {
            tenant,
            storage,
            generator,
            goals,
            level: AtomicU8::new(EngagementLevel::default().as_number()),
        }
    }

    pub fn set_level(&self, level: EngagementLevel) {
        self.level.store(level.as_number(), Ordering::Relaxed);
    }

    pub fn level(&self) -> EngagementLevel {
        EngagementLevel::from_number(self.level.load(Ordering::Relaxed))
    }

    /// Generate all insights the current engagement level allows
    ///
    /// Generated insights are persisted (append-only) before being
    /// returned.
    pub async fn generate_insights(&self) -> Vec<ProactiveInsight> {
        let level = self.level();
        let config = level.config();
        if !config.proactive_insights && !config.anticipate_needs {
            return Vec::new();
        }

        let mut insights = Vec::new();
        insights.extend(self.check_goal_progress().await);
        insights.extend(self.check_engagement().await);

        if config.proactive_insights {
            insights.extend(self.generate_contextual_tip().await);
        }
        if config.anticipate_needs {
            insights.extend(self.anticipate_needs().await);
        }

        if !insights.is_empty() {
            if let Err(e) = self.storage.insert_insights(&self.tenant, &insights).await {
                tracing::warn!("failed to store insights: {e}");
            }
        }

        insights
    }

    /// Goal-derived reminders: stalls, milestones, and deadlines
    async fn check_goal_progress(&self) -> Vec<ProactiveInsight> {
        let now = Utc::now();
        let mut insights = Vec::new();

        for goal in self.goals.active_goals().await {
            let days_since_update = (now - goal.updated_at).num_days();

            if days_since_update > 3 && goal.progress < 100 {
                let elevated = matches!(
                    goal.priority,
                    GoalPriority::High | GoalPriority::Critical
                );
                insights.push(ProactiveInsight {
                    id: format!("goal-stalled-{}", goal.id),
                    insight_type: InsightType::Reminder,
                    title: format!("Goal needs attention: {}", goal.title),
                    content: format!(
                        "You haven't made progress on \"{}\" in {days_since_update} days. \
                         Would you like to review your next steps?",
                        goal.title
                    ),
                    priority: if elevated {
                        InsightPriority::High
                    } else {
                        InsightPriority::Medium
                    },
                    related_goal_id: Some(goal.id.clone()),
                    actionable: true,
                    suggested_action: Some("Review goal subtasks".to_string()),
                    created_at: now,
                    expires_at: None,
                });
            }

            if (50..100).contains(&goal.progress) {
                if let Some(next) = goal.next_pending_subtask() {
                    insights.push(ProactiveInsight {
                        id: format!("goal-progress-{}", goal.id),
                        insight_type: InsightType::GoalUpdate,
                        title: format!("Great progress on \"{}\"!", goal.title),
                        content: format!(
                            "You're {}% done! Next up: {}",
                            goal.progress, next.description
                        ),
                        priority: InsightPriority::Low,
                        related_goal_id: Some(goal.id.clone()),
                        actionable: true,
                        suggested_action: Some(next.description.clone()),
                        created_at: now,
                        expires_at: None,
                    });
                }
            }

            if let Some(target) = goal.target_date {
                let days_until = (target - now).num_days();
                if (1..=7).contains(&days_until) && goal.progress < 80 {
                    insights.push(ProactiveInsight {
                        id: format!("goal-deadline-{}", goal.id),
                        insight_type: InsightType::Alert,
                        title: format!("Deadline approaching: {}", goal.title),
                        content: format!(
                            "Only {days_until} days left and you're at {}%. Let's prioritize this!",
                            goal.progress
                        ),
                        priority: InsightPriority::High,
                        related_goal_id: Some(goal.id.clone()),
                        actionable: true,
                        suggested_action: Some("Focus on completing remaining tasks".to_string()),
                        created_at: now,
                        expires_at: None,
                    });
                }
            }
        }

        insights
    }

    /// Day-based engagement check-in against the last stored turn
    async fn check_engagement(&self) -> Vec<ProactiveInsight> {
        let last = match self.storage.last_turn_at(&self.tenant).await {
            Ok(Some(last)) => last,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("engagement check failed: {e}");
                return Vec::new();
            }
        };

        let days = (Utc::now() - last).num_days();
        let threshold = self
            .level()
            .config()
            .check_in_frequency
            .inactivity_days();

        if days < threshold {
            return Vec::new();
        }

        vec![ProactiveInsight {
            id: format!("check-in-{}", Uuid::new_v4()),
            insight_type: InsightType::CheckIn,
            title: if days > 7 {
                "It's been a while!".to_string()
            } else {
                "Checking in".to_string()
            },
            content: check_in_content(days).to_string(),
            priority: InsightPriority::Low,
            related_goal_id: None,
            actionable: false,
            suggested_action: None,
            created_at: Utc::now(),
            expires_at: None,
        }]
    }

    /// One model-generated tip from recent topics; expires in 24 hours
    async fn generate_contextual_tip(&self) -> Vec<ProactiveInsight> {
        let recent = match self.storage.recent_user_messages(&self.tenant, 10).await {
            Ok(recent) => recent,
            Err(e) => {
                tracing::warn!("tip generation failed to read recent messages: {e}");
                return Vec::new();
            }
        };
        if recent.len() < MIN_MESSAGES_FOR_TIP {
            return Vec::new();
        }

        let topics = recent
            .iter()
            .map(|m| truncate_chars(m, 100))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Based on these recent user queries, suggest ONE helpful tip or resource that \
             would be valuable:\n\n\
             RECENT TOPICS:\n{topics}\n\n\
             Respond ONLY with valid JSON:\n\
             {{\n\
               \"tip\": {{\n\
                 \"title\": \"<short title - max 50 chars>\",\n\
                 \"content\": \"<helpful tip or suggestion - max 200 chars>\",\n\
                 \"actionable\": true/false,\n\
                 \"suggestedAction\": \"<specific action if actionable>\"\n\
               }}\n\
             }}"
        );

        let text = match self.generator.generate(&prompt, 0.7).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("tip generation call failed: {e}");
                return Vec::new();
            }
        };

        let tip = match decode_json::<TipReply>(&text).and_then(|r| r.tip) {
            Some(tip) => tip,
            None => return Vec::new(),
        };

        vec![ProactiveInsight {
            id: format!("tip-{}", Uuid::new_v4()),
            insight_type: InsightType::Tip,
            title: tip.title,
            content: tip.content,
            priority: InsightPriority::Low,
            related_goal_id: None,
            actionable: tip.actionable,
            suggested_action: tip.suggested_action,
            created_at: Utc::now(),
            expires_at: Some(Utc::now() + Duration::hours(24)),
        }]
    }

    /// Predict one upcoming need from query patterns (level 3 only);
    /// suppressed below the confidence floor
    async fn anticipate_needs(&self) -> Vec<ProactiveInsight> {
        let recent = match self.storage.recent_user_messages(&self.tenant, 50).await {
            Ok(recent) => recent,
            Err(e) => {
                tracing::warn!("anticipation failed to read recent messages: {e}");
                return Vec::new();
            }
        };
        if recent.len() < MIN_MESSAGES_FOR_ANTICIPATION {
            return Vec::new();
        }

        let queries = recent
            .iter()
            .take(20)
            .map(|m| format!("- {}", truncate_chars(m, 100)))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Analyze these user queries and anticipate what they might need help with next:\n\n\
             RECENT QUERIES:\n{queries}\n\n\
             Based on patterns, predict ONE thing the user might need soon. Respond ONLY with \
             valid JSON:\n\
             {{\n\
               \"anticipation\": {{\n\
                 \"title\": \"<what you anticipate - max 50 chars>\",\n\
                 \"content\": \"<why you think this and how you can help - max 200 chars>\",\n\
                 \"confidence\": <0-100>\n\
               }}\n\
             }}"
        );

        let text = match self.generator.generate(&prompt, 0.5).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("anticipation call failed: {e}");
                return Vec::new();
            }
        };

        let anticipation = match decode_json::<AnticipationReply>(&text).and_then(|r| r.anticipation)
        {
            Some(a) if a.confidence >= MIN_ANTICIPATION_CONFIDENCE => a,
            _ => return Vec::new(),
        };

        vec![ProactiveInsight {
            id: format!("anticipate-{}", Uuid::new_v4()),
            insight_type: InsightType::Suggestion,
            title: anticipation.title,
            content: anticipation.content,
            priority: InsightPriority::Medium,
            related_goal_id: None,
            actionable: true,
            suggested_action: Some("Would you like help with this?".to_string()),
            created_at: Utc::now(),
            expires_at: None,
        }]
    }

    /// Pending (non-expired) insights, highest priority first
    pub async fn pending_insights(&self, limit: i64) -> Vec<ProactiveInsight> {
        match self
            .storage
            .pending_insights(&self.tenant, Utc::now(), limit)
            .await
        {
            Ok(insights) => insights,
            Err(e) => {
                tracing::warn!("failed to get insights: {e}");
                Vec::new()
            }
        }
    }

    /// Prompt-injectable block of up to 3 pending insights; empty when the
    /// level disables proactivity or nothing is pending
    pub async fn proactive_context(&self) -> String {
        let config = self.level().config();
        if !config.proactive_insights && !config.anticipate_needs {
            return String::new();
        }

        let insights = self.pending_insights(3).await;
        if insights.is_empty() {
            return String::new();
        }

        let mut context = String::from(
            "\n## PROACTIVE INSIGHTS\nConsider mentioning these insights if relevant to the conversation:\n",
        );
        for (i, insight) in insights.iter().enumerate() {
            context.push_str(&format!(
                "{}. [{}] {}: {}\n",
                i + 1,
                insight.insight_type.to_string().to_uppercase(),
                insight.title,
                insight.content
            ));
        }
        context
    }
}

/// Check-in wording varies with how long the user has been away
fn check_in_content(days: i64) -> &'static str {
    if days > 14 {
        "I hope everything is going well! Is there anything I can help you with today?"
    } else if days > 7 {
        "It's been a little while since we chatted. How are your projects coming along?"
    } else if days > 3 {
        "Just checking in - is there anything I can help lighten your load?"
    } else {
        "How's everything going? Any tasks I can take off your plate?"
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::{Goal, Subtask, SubtaskStatus};
    use crate::memstore::InMemoryStore;
    use crate::test_util::ScriptedGenerator;
    use crate::types::{ConversationTurn, TurnRole};

    fn tenant() -> Tenant {
        Tenant::new("u1", "t1")
    }

    fn engine_with(
        level: EngagementLevel,
        replies: Vec<&str>,
    ) -> (ProactiveEngine, Arc<InMemoryStore>) {
        let storage = Arc::new(InMemoryStore::new());
        let engine = ProactiveEngine::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::new(replies)),
        );
        engine.set_level(level);
        (engine, storage)
    }

    fn stalled_goal(priority: GoalPriority) -> Goal {
        let mut goal = Goal::new(
            &tenant(),
            "Ship the report",
            "",
            priority,
            "work",
            vec![Subtask::new("outline"), Subtask::new("draft")],
        );
        goal.updated_at = Utc::now() - Duration::days(5);
        goal
    }

    async fn seed_user_messages(storage: &InMemoryStore, n: usize) {
        for i in 0..n {
            storage
                .record_turn(&ConversationTurn::new(
                    &tenant(),
                    "s1",
                    TurnRole::User,
                    format!("message {i}"),
                ))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn level_one_produces_zero_insights() {
        let (engine, storage) = engine_with(EngagementLevel::SoundingBoard, vec![]);
        storage
            .insert_goal(&stalled_goal(GoalPriority::Critical))
            .await
            .unwrap();

        assert!(engine.generate_insights().await.is_empty());
        assert_eq!(engine.proactive_context().await, "");
    }

    #[tokio::test]
    async fn stalled_goal_priority_follows_goal_priority() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        storage
            .insert_goal(&stalled_goal(GoalPriority::Critical))
            .await
            .unwrap();

        let insights = engine.generate_insights().await;
        let reminder = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Reminder)
            .unwrap();
        assert_eq!(reminder.priority, InsightPriority::High);
        assert!(reminder.content.contains("5 days"));

        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        storage
            .insert_goal(&stalled_goal(GoalPriority::Low))
            .await
            .unwrap();
        let insights = engine.generate_insights().await;
        let reminder = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Reminder)
            .unwrap();
        assert_eq!(reminder.priority, InsightPriority::Medium);
    }

    #[tokio::test]
    async fn milestone_insight_names_the_next_subtask() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        let mut goal = Goal::new(
            &tenant(),
            "Learn sourdough",
            "",
            GoalPriority::Medium,
            "personal",
            vec![Subtask::new("buy flour"), Subtask::new("first bake")],
        );
        goal.subtasks[0].status = SubtaskStatus::Completed;
        goal.recalculate_progress();
        assert_eq!(goal.progress, 50);
        storage.insert_goal(&goal).await.unwrap();

        let insights = engine.generate_insights().await;
        let milestone = insights
            .iter()
            .find(|i| i.insight_type == InsightType::GoalUpdate)
            .unwrap();
        assert!(milestone.content.contains("50% done"));
        assert_eq!(milestone.suggested_action.as_deref(), Some("first bake"));
    }

    #[tokio::test]
    async fn deadline_alert_requires_low_progress_and_near_date() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        let goal = Goal::new(
            &tenant(),
            "Conference talk",
            "",
            GoalPriority::Medium,
            "work",
            vec![Subtask::new("slides")],
        )
        .with_target_date(Utc::now() + Duration::days(4));
        storage.insert_goal(&goal).await.unwrap();

        let insights = engine.generate_insights().await;
        let alert = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Alert)
            .unwrap();
        assert_eq!(alert.priority, InsightPriority::High);

        // Far-out deadlines stay quiet
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        let goal = Goal::new(
            &tenant(),
            "Conference talk",
            "",
            GoalPriority::Medium,
            "work",
            vec![Subtask::new("slides")],
        )
        .with_target_date(Utc::now() + Duration::days(30));
        storage.insert_goal(&goal).await.unwrap();
        assert!(engine
            .generate_insights()
            .await
            .iter()
            .all(|i| i.insight_type != InsightType::Alert));
    }

    #[tokio::test]
    async fn check_in_fires_after_the_level_threshold() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        let mut turn = ConversationTurn::new(&tenant(), "s1", TurnRole::User, "hello");
        turn.created_at = Utc::now() - Duration::days(4);
        storage.record_turn(&turn).await.unwrap();

        let insights = engine.generate_insights().await;
        let check_in = insights
            .iter()
            .find(|i| i.insight_type == InsightType::CheckIn)
            .unwrap();
        assert!(check_in.content.contains("lighten your load"));
    }

    #[tokio::test]
    async fn recent_activity_suppresses_the_check_in() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        storage
            .record_turn(&ConversationTurn::new(&tenant(), "s1", TurnRole::User, "hi"))
            .await
            .unwrap();

        assert!(engine
            .generate_insights()
            .await
            .iter()
            .all(|i| i.insight_type != InsightType::CheckIn));
    }

    #[tokio::test]
    async fn tip_needs_three_messages_and_expires() {
        let tip_reply = r#"{"tip": {"title": "Batch your emails", "content": "Try a twice-daily email window.", "actionable": true, "suggestedAction": "Block two email slots"}}"#;

        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![tip_reply]);
        seed_user_messages(&storage, 2).await;
        assert!(engine
            .generate_insights()
            .await
            .iter()
            .all(|i| i.insight_type != InsightType::Tip));

        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![tip_reply]);
        seed_user_messages(&storage, 3).await;
        let insights = engine.generate_insights().await;
        let tip = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Tip)
            .unwrap();
        assert_eq!(tip.title, "Batch your emails");
        assert!(tip.expires_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn anticipation_respects_the_confidence_floor() {
        let low = r#"{"anticipation": {"title": "Maybe taxes", "content": "...", "confidence": 40}}"#;
        let high = r#"{"anticipation": {"title": "Quarterly review prep", "content": "You ask about metrics every quarter end.", "confidence": 75}}"#;

        // Tip call comes first at level 3, then anticipation
        let (engine, storage) = engine_with(
            EngagementLevel::PersonalAssistant,
            vec![r#"{"tip": null}"#, low],
        );
        seed_user_messages(&storage, 10).await;
        assert!(engine
            .generate_insights()
            .await
            .iter()
            .all(|i| i.insight_type != InsightType::Suggestion));

        let (engine, storage) = engine_with(
            EngagementLevel::PersonalAssistant,
            vec![r#"{"tip": null}"#, high],
        );
        seed_user_messages(&storage, 10).await;
        let insights = engine.generate_insights().await;
        let suggestion = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Suggestion)
            .unwrap();
        assert_eq!(suggestion.title, "Quarterly review prep");
    }

    #[tokio::test]
    async fn generated_insights_are_persisted_and_rendered() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        storage
            .insert_goal(&stalled_goal(GoalPriority::High))
            .await
            .unwrap();

        let generated = engine.generate_insights().await;
        assert!(!generated.is_empty());

        let pending = engine.pending_insights(5).await;
        assert_eq!(pending.len(), generated.len());

        let context = engine.proactive_context().await;
        assert!(context.contains("PROACTIVE INSIGHTS"));
        assert!(context.contains("[REMINDER]"));
    }

    #[tokio::test]
    async fn expired_insights_are_filtered_at_read_time() {
        let (engine, storage) = engine_with(EngagementLevel::CoWorker, vec![]);
        let expired = ProactiveInsight {
            id: "tip-old".to_string(),
            insight_type: InsightType::Tip,
            title: "Old tip".to_string(),
            content: "stale".to_string(),
            priority: InsightPriority::Low,
            related_goal_id: None,
            actionable: false,
            suggested_action: None,
            created_at: Utc::now() - Duration::days(2),
            expires_at: Some(Utc::now() - Duration::days(1)),
        };
        storage
            .insert_insights(&tenant(), &[expired])
            .await
            .unwrap();

        assert!(engine.pending_insights(5).await.is_empty());
        assert_eq!(engine.proactive_context().await, "");
    }
}
