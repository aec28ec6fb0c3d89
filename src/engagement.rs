//! Three-tier engagement system
//!
//! Level 1 (Sounding Board): minimal interruption, periodic check-ins.
//! Level 2 (Co-Worker): handles routine tasks, reports completion.
//! Level 3 (Personal Assistant): anticipates needs, proactive help.

use crate::storage::Storage;
use crate::types::Tenant;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// The user's selected interaction tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    SoundingBoard,
    CoWorker,
    PersonalAssistant,
}

impl Default for EngagementLevel {
    fn default() -> Self {
        EngagementLevel::CoWorker
    }
}

impl EngagementLevel {
    /// Numeric tier (1-3) as surfaced to callers and stored in settings
    pub fn as_number(&self) -> u8 {
        match self {
            EngagementLevel::SoundingBoard => 1,
            EngagementLevel::CoWorker => 2,
            EngagementLevel::PersonalAssistant => 3,
        }
    }

    /// Parse a numeric tier; out-of-range values fall back to the default
    pub fn from_number(n: u8) -> Self {
        match n {
            1 => EngagementLevel::SoundingBoard,
            3 => EngagementLevel::PersonalAssistant,
            _ => EngagementLevel::CoWorker,
        }
    }

    /// Behavior configuration for this level
    pub fn config(&self) -> &'static EngagementConfig {
        match self {
            EngagementLevel::SoundingBoard => &SOUNDING_BOARD,
            EngagementLevel::CoWorker => &CO_WORKER,
            EngagementLevel::PersonalAssistant => &PERSONAL_ASSISTANT,
        }
    }
}

impl std::fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config().name)
    }
}

/// How often the assistant checks in with the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckInFrequency {
    Rare,
    Moderate,
    Frequent,
}

impl CheckInFrequency {
    /// Days of inactivity before a check-in insight is warranted
    pub fn inactivity_days(&self) -> i64 {
        match self {
            CheckInFrequency::Rare => 7,
            CheckInFrequency::Moderate => 3,
            CheckInFrequency::Frequent => 1,
        }
    }

    /// In-conversation check-in cadence, in interactions
    pub fn interaction_interval(&self) -> u64 {
        match self {
            CheckInFrequency::Rare => 10,
            CheckInFrequency::Moderate => 7,
            CheckInFrequency::Frequent => 5,
        }
    }
}

/// When the assistant volunteers help
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferHelp {
    OnlyWhenAsked,
    WhenStruggling,
    Proactively,
}

/// How thoroughly the assistant asks clarifying questions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionDepth {
    Minimal,
    Moderate,
    Thorough,
}

/// Fixed behavior record for one engagement level
#[derive(Debug, Clone)]
pub struct EngagementConfig {
    pub level: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub proactive_check_ins: bool,
    pub check_in_frequency: CheckInFrequency,
    /// Whether the proactive engine generates and surfaces insights at all
    pub proactive_insights: bool,
    pub auto_execute_tasks: bool,
    pub anticipate_needs: bool,
    pub offer_help: OfferHelp,
    pub demonstrate_tasks: bool,
    pub clarifying_questions: QuestionDepth,
    /// Natural-language behavior block injected into the system prompt
    pub prompt_additions: &'static str,
}

static SOUNDING_BOARD: EngagementConfig = EngagementConfig {
    level: 1,
    name: "Sounding Board",
    description: "Minimal interruption. Light help when asked. Periodic check-ins.",
    proactive_check_ins: true,
    check_in_frequency: CheckInFrequency::Rare,
    proactive_insights: false,
    auto_execute_tasks: false,
    anticipate_needs: false,
    offer_help: OfferHelp::OnlyWhenAsked,
    demonstrate_tasks: false,
    clarifying_questions: QuestionDepth::Minimal,
    prompt_additions: "\
## ENGAGEMENT MODE: SOUNDING BOARD (Level 1)
Your role is to be a supportive listener and light helper.

BEHAVIOR GUIDELINES:
- Be responsive but not intrusive
- Only offer help when explicitly asked
- Keep responses concise and focused
- Periodically ask: \"Is there anything I can help lighten your load?\"
- Do NOT proactively suggest tasks or improvements unless asked
- Focus on listening, understanding, and providing requested information
- When the user shares something, acknowledge it warmly but briefly",
};

static CO_WORKER: EngagementConfig = EngagementConfig {
    level: 2,
    name: "Co-Worker",
    description: "Handles routine tasks. Reports completion. Asks clarifying questions.",
    proactive_check_ins: true,
    check_in_frequency: CheckInFrequency::Moderate,
    proactive_insights: true,
    auto_execute_tasks: true,
    anticipate_needs: false,
    offer_help: OfferHelp::WhenStruggling,
    demonstrate_tasks: false,
    clarifying_questions: QuestionDepth::Moderate,
    prompt_additions: "\
## ENGAGEMENT MODE: CO-WORKER (Level 2)
Your role is to be a reliable colleague who handles routine tasks.

BEHAVIOR GUIDELINES:
- Actively look for tasks you can help with
- When you identify a task the user could delegate, offer to handle it
- For any task you take on: ask clarifying questions before starting,
  complete the work efficiently, report back with a summary, and ask if
  the quality meets their expectations
- Handle routine tasks like drafting emails, summarizing documents,
  creating lists, scheduling suggestions, and research
- Keep the user informed of progress on longer tasks
- If you notice the user doing repetitive work, offer to take it over",
};

static PERSONAL_ASSISTANT: EngagementConfig = EngagementConfig {
    level: 3,
    name: "Personal Assistant",
    description: "Anticipates needs. Proactively offers help. Can demonstrate or complete tasks.",
    proactive_check_ins: true,
    check_in_frequency: CheckInFrequency::Frequent,
    proactive_insights: true,
    auto_execute_tasks: true,
    anticipate_needs: true,
    offer_help: OfferHelp::Proactively,
    demonstrate_tasks: true,
    clarifying_questions: QuestionDepth::Thorough,
    prompt_additions: "\
## ENGAGEMENT MODE: PERSONAL ASSISTANT (Level 3)
Your role is to be an always-ready assistant who anticipates needs and
proactively helps.

BEHAVIOR GUIDELINES:
- Actively monitor for signs the user needs help: confusion, struggle,
  or overwhelm
- When you detect these signs, proactively offer help
- For complex tasks, offer two options: walk them through it
  step-by-step, or handle it for them entirely
- Anticipate upcoming needs based on context: meetings, projects,
  approaching deadlines
- Take initiative on tasks that clearly need doing
- Always confirm before taking significant actions",
};

/// Heuristic read of the user's state from one message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub is_confused: bool,
    pub is_struggling: bool,
    pub is_overwhelmed: bool,
    /// 0.0 - 1.0; 0 when no indicator family matched
    pub confidence: f32,
}

static CONFUSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    pattern_family(&[
        r"(?i)i don'?t (know|understand|get)",
        r"(?i)\bwhat (do|does|is|are|should)\b",
        r"(?i)\bhow (do|does|can|should)\b",
        r"(?i)i'?m (confused|lost|unsure)",
        r"\?{2,}",
        r"(?i)help",
    ])
});

static STRUGGLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    pattern_family(&[
        r"(?i)i (can'?t|couldn'?t|won'?t)",
        r"(?i)this (is|isn'?t) working",
        r"(?i)i'?ve tried",
        r"(?i)still (not|doesn'?t|won'?t)",
        r"(?i)frustrated",
        r"(?i)stuck",
    ])
});

static OVERWHELM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    pattern_family(&[
        r"(?i)too (much|many)",
        r"(?i)overwhelm",
        r"(?i)so much to do",
        r"(?i)don'?t have time",
        r"(?i)stressed",
        r"(?i)deadline",
    ])
});

fn pattern_family(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
}

fn family_matches(family: &[Regex], message: &str) -> bool {
    family.iter().any(|p| p.is_match(message))
}

/// Analyze a message for signs of confusion, struggle, or overwhelm
///
/// Pure and deterministic: three independent pattern families, confidence
/// `min(matched * 0.4 + 0.3, 1.0)` (0 when nothing matched).
pub fn analyze_user_state(message: &str) -> UserState {
    let is_confused = family_matches(&CONFUSION_PATTERNS, message);
    let is_struggling = family_matches(&STRUGGLE_PATTERNS, message);
    let is_overwhelmed = family_matches(&OVERWHELM_PATTERNS, message);

    let matched = [is_confused, is_struggling, is_overwhelmed]
        .iter()
        .filter(|m| **m)
        .count();
    let confidence = if matched > 0 {
        (matched as f32 * 0.4 + 0.3).min(1.0)
    } else {
        0.0
    };

    UserState {
        is_confused,
        is_struggling,
        is_overwhelmed,
        confidence,
    }
}

/// Holds the current engagement level and derives behavior from it
pub struct EngagementManager {
    tenant: Tenant,
    storage: Arc<dyn Storage>,
    level: AtomicU8,
}

impl EngagementManager {
    pub fn new(tenant: Tenant, storage: Arc<dyn Storage>) -> Self {
        Self {
            tenant,
            storage,
            level: AtomicU8::new(EngagementLevel::default().as_number()),
        }
    }

    /// Load the persisted level; keeps the default when settings are absent
    /// or the read fails
    pub async fn initialize(&self) {
        match self.storage.get_settings(&self.tenant).await {
            Ok(Some(settings)) => {
                self.level
                    .store(settings.engagement_level.as_number(), Ordering::Relaxed);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("failed to load engagement settings: {e}"),
        }
    }

    /// Set and persist the engagement level
    pub async fn set_level(&self, level: EngagementLevel) {
        self.level.store(level.as_number(), Ordering::Relaxed);

        let mut settings = self
            .storage
            .get_settings(&self.tenant)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        settings.engagement_level = level;
        if let Err(e) = self.storage.upsert_settings(&self.tenant, &settings).await {
            tracing::warn!("failed to persist engagement level: {e}");
        }
    }

    pub fn level(&self) -> EngagementLevel {
        EngagementLevel::from_number(self.level.load(Ordering::Relaxed))
    }

    pub fn config(&self) -> &'static EngagementConfig {
        self.level().config()
    }

    /// Behavior block for the system prompt
    pub fn prompt_additions(&self) -> &'static str {
        self.config().prompt_additions
    }

    /// Analyze a message for signs of struggle or confusion
    pub fn analyze_user_state(&self, message: &str) -> UserState {
        analyze_user_state(message)
    }

    /// Whether to proactively offer help given the detected user state
    pub fn should_offer_help(&self, state: &UserState) -> bool {
        match self.config().offer_help {
            OfferHelp::OnlyWhenAsked => false,
            OfferHelp::WhenStruggling => state.is_struggling || state.is_confused,
            OfferHelp::Proactively => {
                state.confidence > 0.3
                    || state.is_confused
                    || state.is_struggling
                    || state.is_overwhelmed
            }
        }
    }

    /// Canned help offer for the detected state; `None` when help should
    /// not be offered. Confusion takes precedence over struggle, struggle
    /// over overwhelm.
    pub fn generate_help_offer(&self, state: &UserState) -> Option<String> {
        if !self.should_offer_help(state) {
            return None;
        }

        let demonstrate = self.config().demonstrate_tasks;

        if state.is_confused {
            return Some(if demonstrate {
                "I noticed you might be uncertain about this. Would you like me to walk you \
                 through it step-by-step, or would you prefer I just handle it for you?"
                    .to_string()
            } else {
                "I can help clarify that if you'd like.".to_string()
            });
        }

        if state.is_struggling {
            return Some(if demonstrate {
                "It looks like you're working through something challenging. I can either show \
                 you how to approach this, or take care of it entirely - whichever you prefer."
                    .to_string()
            } else {
                "Would you like some help with that?".to_string()
            });
        }

        if state.is_overwhelmed {
            return Some(
                "You seem to have a lot on your plate. Would you like me to help prioritize \
                 your tasks or take some of them off your hands?"
                    .to_string(),
            );
        }

        None
    }

    /// Whether this interaction warrants an in-conversation check-in
    pub fn should_check_in(&self, interaction_count: u64) -> bool {
        let config = self.config();
        if !config.proactive_check_ins || interaction_count == 0 {
            return false;
        }
        interaction_count % config.check_in_frequency.interaction_interval() == 0
    }

    /// Canned check-in line for the current level
    pub fn check_in_message(&self) -> &'static str {
        match self.level() {
            EngagementLevel::SoundingBoard => {
                "Is there anything I can help lighten your load?"
            }
            EngagementLevel::CoWorker => {
                "By the way - any routine tasks I can take off your plate?"
            }
            EngagementLevel::PersonalAssistant => {
                "How's everything else going? I'm happy to jump in wherever you need me."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memstore::InMemoryStore;

    fn manager_at(level: EngagementLevel) -> EngagementManager {
        let m = EngagementManager::new(
            Tenant::new("u1", "t1"),
            Arc::new(InMemoryStore::new()),
        );
        m.level.store(level.as_number(), Ordering::Relaxed);
        m
    }

    #[test]
    fn detects_confusion_and_struggle_together() {
        let state = analyze_user_state("I don't know how to do this, I'm stuck");
        assert!(state.is_confused);
        assert!(state.is_struggling);
        assert!(state.confidence >= 0.7);
    }

    #[test]
    fn confidence_is_zero_without_indicators() {
        let state = analyze_user_state("The quarterly report looks great.");
        assert!(!state.is_confused && !state.is_struggling && !state.is_overwhelmed);
        assert_eq!(state.confidence, 0.0);
    }

    #[test]
    fn confidence_clamps_at_one() {
        let state =
            analyze_user_state("I'm stuck, I don't understand, and there's too much to do");
        assert!(state.is_confused && state.is_struggling && state.is_overwhelmed);
        assert_eq!(state.confidence, 1.0);
    }

    #[test]
    fn level_one_never_offers_help() {
        let m = manager_at(EngagementLevel::SoundingBoard);
        for state in [
            analyze_user_state("I'm stuck and frustrated"),
            analyze_user_state("I don't understand any of this???"),
            analyze_user_state("too much to do, totally overwhelmed"),
            analyze_user_state("all fine here"),
        ] {
            assert!(!m.should_offer_help(&state));
            assert!(m.generate_help_offer(&state).is_none());
        }
    }

    #[test]
    fn level_two_offers_on_struggle_or_confusion_only() {
        let m = manager_at(EngagementLevel::CoWorker);
        assert!(m.should_offer_help(&analyze_user_state("I'm stuck")));
        assert!(m.should_offer_help(&analyze_user_state("I'm confused")));
        assert!(!m.should_offer_help(&analyze_user_state("so much to do, stressed out")));
    }

    #[test]
    fn level_three_offers_whenever_any_indicator_fires() {
        let m = manager_at(EngagementLevel::PersonalAssistant);
        for msg in [
            "I'm confused",
            "I'm stuck",
            "totally overwhelmed right now",
        ] {
            let state = analyze_user_state(msg);
            assert!(
                state.is_confused || state.is_struggling || state.is_overwhelmed,
                "indicator expected for {msg:?}"
            );
            assert!(m.should_offer_help(&state));
            assert!(m.generate_help_offer(&state).is_some());
        }
    }

    #[test]
    fn confusion_outranks_other_offers() {
        let m = manager_at(EngagementLevel::PersonalAssistant);
        let state = analyze_user_state("I'm confused and stuck and overwhelmed");
        let offer = m.generate_help_offer(&state).unwrap();
        assert!(offer.contains("step-by-step"));
    }

    #[test]
    fn check_in_follows_level_interval() {
        let m = manager_at(EngagementLevel::PersonalAssistant);
        assert!(!m.should_check_in(0));
        assert!(!m.should_check_in(4));
        assert!(m.should_check_in(5));
        assert!(m.should_check_in(10));

        let m = manager_at(EngagementLevel::SoundingBoard);
        assert!(!m.should_check_in(5));
        assert!(m.should_check_in(10));
    }

    #[tokio::test]
    async fn set_level_persists_and_reloads() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStore::new());
        let tenant = Tenant::new("u1", "t1");

        let m = EngagementManager::new(tenant.clone(), Arc::clone(&storage));
        m.set_level(EngagementLevel::PersonalAssistant).await;

        let m2 = EngagementManager::new(tenant, storage);
        assert_eq!(m2.level(), EngagementLevel::CoWorker);
        m2.initialize().await;
        assert_eq!(m2.level(), EngagementLevel::PersonalAssistant);
    }
}
