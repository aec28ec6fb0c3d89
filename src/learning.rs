//! Continuous learning from user feedback
//!
//! Feedback is append-only; every 10th accumulated entry for the tenant
//! triggers a distillation cycle inline. Distillation is skipped below 5
//! entries, and stays off the model entirely when there are fewer than 3
//! comments to learn from - the stored row then carries a single coarse
//! pattern derived from the positive/negative ratio.

use crate::generation::{decode_json, TextGenerator};
use crate::storage::Storage;
use crate::types::Tenant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How many feedback entries between distillation cycles
const LEARNING_BATCH: usize = 10;
/// Minimum feedback entries before distillation produces anything
const MIN_FEEDBACK: usize = 5;
/// Minimum comments before the model is consulted
const MIN_COMMENTS: usize = 3;

/// Thumbs up or down
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Positive,
    Negative,
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackKind::Positive => write!(f, "positive"),
            FeedbackKind::Negative => write!(f, "negative"),
        }
    }
}

/// One recorded piece of user feedback (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub interaction_id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub feedback: FeedbackKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn new(
        tenant: &Tenant,
        interaction_id: impl Into<String>,
        feedback: FeedbackKind,
        comment: Option<String>,
    ) -> Self {
        Self {
            interaction_id: interaction_id.into(),
            user_id: tenant.user_id.clone(),
            tenant_id: tenant.tenant_id.clone(),
            feedback,
            comment,
            created_at: Utc::now(),
        }
    }
}

/// A distilled communication pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearningPattern {
    pub pattern: String,
    pub frequency: u32,
    /// 0 - 100
    pub success_rate: u8,
    pub last_seen: DateTime<Utc>,
}

/// Preference category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceCategory {
    Tone,
    Format,
    Detail,
    Style,
    Other,
}

impl std::fmt::Display for PreferenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreferenceCategory::Tone => write!(f, "tone"),
            PreferenceCategory::Format => write!(f, "format"),
            PreferenceCategory::Detail => write!(f, "detail"),
            PreferenceCategory::Style => write!(f, "style"),
            PreferenceCategory::Other => write!(f, "other"),
        }
    }
}

/// A distilled user preference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPreference {
    pub category: PreferenceCategory,
    pub preference: String,
    /// 0 - 100
    pub confidence: u8,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// The single per-tenant learnings row, fully overwritten on recompute
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Learnings {
    pub patterns: Vec<LearningPattern>,
    pub preferences: Vec<UserPreference>,
    pub feedback_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Feedback counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    /// 0 - 100
    pub success_rate: u8,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PatternsReply {
    patterns: Vec<PatternDraft>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternDraft {
    pattern: String,
    #[serde(default)]
    frequency: u32,
    #[serde(default)]
    success_rate: u8,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PreferencesReply {
    preferences: Vec<PreferenceDraft>,
}

#[derive(Deserialize)]
struct PreferenceDraft {
    #[serde(default = "default_category")]
    category: PreferenceCategory,
    preference: String,
    #[serde(default)]
    confidence: u8,
}

fn default_category() -> PreferenceCategory {
    PreferenceCategory::Other
}

/// Accumulates feedback and periodically distills it into reusable
/// patterns and preferences
pub struct ContinuousLearner {
    tenant: Tenant,
    storage: Arc<dyn Storage>,
    generator: Arc<dyn TextGenerator>,
}

impl ContinuousLearner {
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

    /// Record one feedback entry; every [`LEARNING_BATCH`]th entry for the
    /// tenant runs a distillation cycle inline
    ///
    /// The batch boundary is a best-effort modulo check against the count
    /// read after insert; concurrent submissions around a boundary may
    /// double-run or skip one cycle.
    pub async fn record_feedback(
        &self,
        interaction_id: &str,
        feedback: FeedbackKind,
        comment: Option<String>,
    ) {
        let entry = FeedbackEntry::new(&self.tenant, interaction_id, feedback, comment);
        if let Err(e) = self.storage.insert_feedback(&entry).await {
            tracing::warn!("failed to record feedback: {e}");
            return;
        }
        tracing::debug!("recorded {feedback} feedback for interaction {interaction_id}");

        match self.storage.feedback_count(&self.tenant).await {
            Ok(count) if count > 0 && count % LEARNING_BATCH == 0 => {
                self.update_learnings().await;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("failed to check feedback count: {e}"),
        }
    }

    /// Distill recent feedback into the tenant's learnings row
    ///
    /// No-op below [`MIN_FEEDBACK`] entries. With fewer than
    /// [`MIN_COMMENTS`] comments the row carries one ratio-derived pattern
    /// and no model call is made.
    pub async fn update_learnings(&self) {
        let feedback = match self.storage.recent_feedback(&self.tenant, 100).await {
            Ok(feedback) => feedback,
            Err(e) => {
                tracing::warn!("failed to fetch feedback for learning: {e}");
                return;
            }
        };

        if feedback.len() < MIN_FEEDBACK {
            tracing::debug!("not enough feedback to extract patterns");
            return;
        }

        let patterns = self.extract_patterns(&feedback).await;
        let preferences = self.extract_preferences(&feedback).await;

        let learnings = Learnings {
            patterns,
            preferences,
            feedback_count: feedback.len(),
            updated_at: Some(Utc::now()),
        };

        match self.storage.upsert_learnings(&self.tenant, &learnings).await {
            Ok(()) => tracing::debug!(
                "updated learnings: {} patterns, {} preferences",
                learnings.patterns.len(),
                learnings.preferences.len()
            ),
            Err(e) => tracing::warn!("failed to store learnings: {e}"),
        }
    }

    async fn extract_patterns(&self, feedback: &[FeedbackEntry]) -> Vec<LearningPattern> {
        let positive = feedback
            .iter()
            .filter(|f| f.feedback == FeedbackKind::Positive)
            .count();
        let negative = feedback.len() - positive;
        let total = feedback.len();

        let comments: Vec<String> = feedback
            .iter()
            .filter_map(|f| {
                f.comment
                    .as_ref()
                    .map(|c| format!("[{}] {}", f.feedback, c))
            })
            .take(15)
            .collect();

        if comments.len() < MIN_COMMENTS {
            let success_rate = ((positive as f64 / total as f64) * 100.0).round() as u8;
            return vec![LearningPattern {
                pattern: if positive > negative {
                    "Generally positive responses".to_string()
                } else {
                    "Needs improvement in responses".to_string()
                },
                frequency: total as u32,
                success_rate,
                last_seen: Utc::now(),
            }];
        }

        let prompt = format!(
            "Analyze this user feedback and extract communication patterns that work or don't work.\n\n\
             FEEDBACK DATA:\n\
             - Total feedback: {total}\n\
             - Positive: {positive} ({}%)\n\
             - Negative: {negative} ({}%)\n\n\
             COMMENTS:\n{}\n\n\
             Extract 2-5 actionable patterns. Respond ONLY with valid JSON:\n\
             {{\n\
               \"patterns\": [\n\
                 {{\"pattern\": \"<what works or doesn't work>\", \"frequency\": <1-10>, \"successRate\": <0-100>}}\n\
               ]\n\
             }}",
            ((positive as f64 / total as f64) * 100.0).round(),
            ((negative as f64 / total as f64) * 100.0).round(),
            comments.join("\n")
        );

        let text = match self.generator.generate(&prompt, 0.3).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("pattern extraction call failed: {e}");
                return Vec::new();
            }
        };

        decode_json::<PatternsReply>(&text)
            .map(|reply| {
                reply
                    .patterns
                    .into_iter()
                    .map(|p| LearningPattern {
                        pattern: p.pattern,
                        frequency: p.frequency,
                        success_rate: p.success_rate.min(100),
                        last_seen: Utc::now(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn extract_preferences(&self, feedback: &[FeedbackEntry]) -> Vec<UserPreference> {
        let positive_comments: Vec<String> = feedback
            .iter()
            .filter(|f| f.feedback == FeedbackKind::Positive)
            .filter_map(|f| f.comment.clone())
            .collect();

        if positive_comments.len() < MIN_COMMENTS {
            return Vec::new();
        }

        let prompt = format!(
            "Analyze these positive feedback comments and extract user preferences for AI \
             communication.\n\n\
             POSITIVE FEEDBACK COMMENTS:\n{}\n\n\
             Extract 2-4 preferences. Respond ONLY with valid JSON:\n\
             {{\n\
               \"preferences\": [\n\
                 {{\"category\": \"<tone|format|detail|style>\", \"preference\": \"<specific preference>\", \"confidence\": <0-100>}}\n\
               ]\n\
             }}",
            positive_comments
                .iter()
                .take(10)
                .enumerate()
                .map(|(i, c)| format!("{}. \"{c}\"", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        );

        let text = match self.generator.generate(&prompt, 0.3).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("preference extraction call failed: {e}");
                return Vec::new();
            }
        };

        decode_json::<PreferencesReply>(&text)
            .map(|reply| {
                reply
                    .preferences
                    .into_iter()
                    .map(|p| UserPreference {
                        category: p.category,
                        preference: p.preference,
                        confidence: p.confidence.min(100),
                        examples: positive_comments.iter().take(3).cloned().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The stored learnings row; empty defaults when absent or on failure
    pub async fn learnings(&self) -> Learnings {
        self.storage
            .get_learnings(&self.tenant)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Prompt-injectable block of preferences and high-success patterns;
    /// empty string when nothing has been learned yet
    pub async fn personalization_context(&self) -> String {
        let learnings = self.learnings().await;
        if learnings.patterns.is_empty() && learnings.preferences.is_empty() {
            return String::new();
        }

        let mut context = String::from(
            "\n## LEARNED USER PREFERENCES\nBased on past interactions and feedback, this user prefers:\n",
        );

        for p in &learnings.preferences {
            context.push_str(&format!(
                "- {}: {} (confidence: {}%)\n",
                p.category.to_string().to_uppercase(),
                p.preference,
                p.confidence
            ));
        }

        let strong: Vec<&LearningPattern> = learnings
            .patterns
            .iter()
            .filter(|p| p.success_rate > 60)
            .take(3)
            .collect();
        if !strong.is_empty() {
            context.push_str("\nSuccessful communication patterns:\n");
            for p in strong {
                context.push_str(&format!(
                    "- {} (success rate: {}%)\n",
                    p.pattern, p.success_rate
                ));
            }
        }

        context.push_str("\nApply these learnings to personalize your responses.\n");
        context
    }

    /// Feedback counters; zeroed when empty or on failure
    pub async fn feedback_stats(&self) -> FeedbackStats {
        let feedback = match self.storage.all_feedback(&self.tenant).await {
            Ok(feedback) => feedback,
            Err(e) => {
                tracing::warn!("failed to fetch feedback stats: {e}");
                return FeedbackStats::default();
            }
        };

        if feedback.is_empty() {
            return FeedbackStats::default();
        }

        let positive = feedback
            .iter()
            .filter(|f| f.feedback == FeedbackKind::Positive)
            .count();
        let total = feedback.len();
        FeedbackStats {
            total,
            positive,
            negative: total - positive,
            success_rate: ((positive as f64 / total as f64) * 100.0).round() as u8,
        }
    }
}
