//! Self-reflection: rubric scoring of draft responses with optional revision
//!
//! The overall score is always computed locally as the rounded mean of the
//! five sub-scores; a model-supplied overall is never trusted. A failed
//! evaluation degrades to a neutral pass (75 across the board) so the turn
//! is never blocked, and every evaluation - including that default - is
//! persisted as an audit record.

use crate::generation::{decode_json, TextGenerator};
use crate::storage::Storage;
use crate::types::Tenant;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Default overall-score floor below which a revision pass is forced
pub const DEFAULT_REVISION_THRESHOLD: u8 = 70;

const NEUTRAL_SCORE: u8 = 75;

/// Scores on the five rubric dimensions plus the derived overall
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReflectionScores {
    pub accuracy: u8,
    pub helpfulness: u8,
    pub completeness: u8,
    pub clarity: u8,
    pub empathy: u8,
    /// Rounded mean of the five dimensions
    pub overall: u8,
}

impl ReflectionScores {
    /// Build scores with `overall` derived from the five dimensions
    pub fn from_dimensions(
        accuracy: u8,
        helpfulness: u8,
        completeness: u8,
        clarity: u8,
        empathy: u8,
    ) -> Self {
        let sum = accuracy as u32
            + helpfulness as u32
            + completeness as u32
            + clarity as u32
            + empathy as u32;
        Self {
            accuracy,
            helpfulness,
            completeness,
            clarity,
            empathy,
            overall: (sum as f64 / 5.0).round() as u8,
        }
    }

    /// Neutral pass used when evaluation fails
    pub fn neutral() -> Self {
        Self::from_dimensions(
            NEUTRAL_SCORE,
            NEUTRAL_SCORE,
            NEUTRAL_SCORE,
            NEUTRAL_SCORE,
            NEUTRAL_SCORE,
        )
    }
}

/// Result of evaluating one draft response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReflectionResult {
    pub scores: ReflectionScores,
    pub improvements: Vec<String>,
    pub should_revise: bool,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_response: Option<String>,
}

impl ReflectionResult {
    fn neutral_default() -> Self {
        Self {
            scores: ReflectionScores::neutral(),
            improvements: Vec::new(),
            should_revise: false,
            reasoning: "Evaluation failed, defaulting to pass".to_string(),
            revised_response: None,
        }
    }
}

/// Immutable audit record of one evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReflectionRecord {
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    pub user_query: String,
    pub ai_response: String,
    pub scores: ReflectionScores,
    pub improvements: Vec<String>,
    pub was_revised: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_response: Option<String>,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

/// The full reflection cycle's outcome as consumed by the orchestrator
#[derive(Debug, Clone)]
pub struct ReflectionOutcome {
    pub response: String,
    pub was_revised: bool,
    pub reflection: ReflectionResult,
}

/// Average scores over a window, with the sample size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub accuracy: u8,
    pub helpfulness: u8,
    pub completeness: u8,
    pub clarity: u8,
    pub empathy: u8,
    pub overall: u8,
    pub count: usize,
}

/// A recurring improvement area and how often it came up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementTrend {
    pub area: String,
    pub frequency: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationReply {
    scores: ScoresDraft,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    should_revise: bool,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Deserialize)]
struct ScoresDraft {
    accuracy: u8,
    helpfulness: u8,
    completeness: u8,
    clarity: u8,
    empathy: u8,
}

/// Scores a draft response and, when warranted, rewrites it
pub struct SelfReflection {
    tenant: Tenant,
    storage: Arc<dyn Storage>,
    generator: Arc<dyn TextGenerator>,
    threshold: u8,
}

impl SelfReflection {
    pub fn new(
        tenant: Tenant,
        storage: Arc<dyn Storage>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            tenant,
            storage,
            generator,
            threshold: DEFAULT_REVISION_THRESHOLD,
        }
    }

    /// Override the revision threshold
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Evaluate a response on the five rubric dimensions
    ///
    /// `should_revise` is true when the grader says so or the locally
    /// computed overall falls below the threshold. The result (including
    /// the neutral default on failure) is persisted as an audit record.
    pub async fn evaluate(
        &self,
        user_query: &str,
        ai_response: &str,
        context: Option<&str>,
    ) -> ReflectionResult {
        let context_block = context
            .map(|c| format!("CONTEXT: {c}\n\n"))
            .unwrap_or_default();
        let prompt = format!(
            "You are a strict quality evaluator for an AI assistant named Eve. Critically \
             analyze this response.\n\n\
             USER QUERY: {user_query}\n\n\
             EVE'S RESPONSE: {ai_response}\n\n\
             {context_block}\
             Evaluate on these criteria (0-100 each, be critical and honest):\n\
             1. ACCURACY - Is information factually correct? (Penalize guessing or uncertainty)\n\
             2. HELPFULNESS - Does it directly solve the user's problem? (Penalize vague answers)\n\
             3. COMPLETENESS - Are all aspects of the query addressed? (Penalize missing information)\n\
             4. CLARITY - Is it well-organized and easy to understand? (Penalize confusion or rambling)\n\
             5. EMPATHY - Does it acknowledge the user's situation appropriately? (Penalize cold/robotic responses)\n\n\
             Be strict. Most responses should score between 60-85. Only exceptional responses \
             score above 90.\n\n\
             Respond ONLY with valid JSON (no markdown, no explanation):\n\
             {{\n\
               \"scores\": {{\n\
                 \"accuracy\": <0-100>,\n\
                 \"helpfulness\": <0-100>,\n\
                 \"completeness\": <0-100>,\n\
                 \"clarity\": <0-100>,\n\
                 \"empathy\": <0-100>\n\
               }},\n\
               \"improvements\": [\"<specific actionable improvement 1>\", \"<specific actionable improvement 2>\"],\n\
               \"shouldRevise\": <true if any score below 70 or overall below 75>,\n\
               \"reasoning\": \"<one sentence explaining the evaluation>\"\n\
             }}"
        );

        let result = match self.generator.generate(&prompt, 0.2).await {
            Ok(text) => match decode_json::<EvaluationReply>(&text) {
                Some(reply) => {
                    let scores = ReflectionScores::from_dimensions(
                        reply.scores.accuracy.min(100),
                        reply.scores.helpfulness.min(100),
                        reply.scores.completeness.min(100),
                        reply.scores.clarity.min(100),
                        reply.scores.empathy.min(100),
                    );
                    ReflectionResult {
                        scores,
                        improvements: reply.improvements,
                        should_revise: reply.should_revise || scores.overall < self.threshold,
                        reasoning: reply
                            .reasoning
                            .unwrap_or_else(|| "Evaluation complete".to_string()),
                        revised_response: None,
                    }
                }
                None => {
                    tracing::warn!("evaluation reply was not decodable JSON");
                    ReflectionResult::neutral_default()
                }
            },
            Err(e) => {
                tracing::warn!("evaluation call failed: {e}");
                ReflectionResult::neutral_default()
            }
        };

        self.store_reflection(user_query, ai_response, &result).await;
        result
    }

    /// Rewrite a response to address the listed improvements
    ///
    /// Passthrough when there is nothing to address; the original comes
    /// back unchanged on any failure.
    pub async fn revise(
        &self,
        user_query: &str,
        original_response: &str,
        improvements: &[String],
    ) -> String {
        if improvements.is_empty() {
            return original_response.to_string();
        }

        let prompt = format!(
            "You are Eve, an AI assistant. Your previous response needs improvement.\n\n\
             ORIGINAL USER QUERY: {user_query}\n\n\
             YOUR ORIGINAL RESPONSE: {original_response}\n\n\
             IMPROVEMENTS NEEDED:\n{}\n\n\
             Rewrite your response to address ALL improvements listed above. Keep what was \
             good, fix what was lacking.\n\n\
             Provide ONLY the improved response - no explanations, no meta-commentary, just \
             the better response.",
            improvements
                .iter()
                .enumerate()
                .map(|(i, imp)| format!("{}. {imp}", i + 1))
                .collect::<Vec<_>>()
                .join("\n")
        );

        match self.generator.generate(&prompt, 0.7).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("revision call failed: {e}");
                original_response.to_string()
            }
        }
    }

    /// Full reflection cycle: evaluate, then revise if warranted
    ///
    /// Never fails; the worst case returns the original response with the
    /// neutral default reflection.
    pub async fn evaluate_and_revise(
        &self,
        user_query: &str,
        ai_response: &str,
        context: Option<&str>,
    ) -> ReflectionOutcome {
        let mut reflection = self.evaluate(user_query, ai_response, context).await;

        if reflection.should_revise && !reflection.improvements.is_empty() {
            let revised = self
                .revise(user_query, ai_response, &reflection.improvements)
                .await;
            reflection.revised_response = Some(revised.clone());
            return ReflectionOutcome {
                response: revised,
                was_revised: true,
                reflection,
            };
        }

        ReflectionOutcome {
            response: ai_response.to_string(),
            was_revised: false,
            reflection,
        }
    }

    async fn store_reflection(
        &self,
        user_query: &str,
        ai_response: &str,
        result: &ReflectionResult,
    ) {
        let record = ReflectionRecord {
            id: Uuid::new_v4().to_string(),
            user_id: self.tenant.user_id.clone(),
            tenant_id: self.tenant.tenant_id.clone(),
            user_query: user_query.to_string(),
            ai_response: ai_response.to_string(),
            scores: result.scores,
            improvements: result.improvements.clone(),
            was_revised: result.should_revise,
            revised_response: result.revised_response.clone(),
            reasoning: result.reasoning.clone(),
            created_at: Utc::now(),
        };

        if let Err(e) = self.storage.insert_reflection(&record).await {
            tracing::warn!("failed to store reflection: {e}");
        }
    }

    /// Mean scores over the last `days`; zeroed with count 0 when no data
    pub async fn average_scores(&self, days: i64) -> AverageScores {
        let since = Utc::now() - Duration::days(days);
        let records = match self.storage.reflections_since(&self.tenant, since).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("failed to fetch reflections: {e}");
                return AverageScores::default();
            }
        };

        if records.is_empty() {
            return AverageScores::default();
        }

        let count = records.len();
        let mean = |f: fn(&ReflectionScores) -> u8| -> u8 {
            let sum: u32 = records.iter().map(|r| f(&r.scores) as u32).sum();
            (sum as f64 / count as f64).round() as u8
        };

        AverageScores {
            accuracy: mean(|s| s.accuracy),
            helpfulness: mean(|s| s.helpfulness),
            completeness: mean(|s| s.completeness),
            clarity: mean(|s| s.clarity),
            empathy: mean(|s| s.empathy),
            overall: mean(|s| s.overall),
            count,
        }
    }

    /// Most frequent improvement areas across the last 100 reflections
    pub async fn improvement_trends(&self, limit: usize) -> Vec<ImprovementTrend> {
        let records = match self.storage.recent_reflections(&self.tenant, 100).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("failed to fetch improvement trends: {e}");
                return Vec::new();
            }
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &records {
            for imp in &record.improvements {
                let key: String = imp.to_lowercase().chars().take(50).collect();
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        let mut trends: Vec<ImprovementTrend> = counts
            .into_iter()
            .map(|(area, frequency)| ImprovementTrend { area, frequency })
            .collect();
        trends.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.area.cmp(&b.area)));
        trends.truncate(limit);
        trends
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

    fn reflection_with(replies: Vec<&str>) -> (SelfReflection, Arc<InMemoryStore>) {
        let storage = Arc::new(InMemoryStore::new());
        let reflection = SelfReflection::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::new(replies)),
        );
        (reflection, storage)
    }

    #[test]
    fn overall_is_the_rounded_mean() {
        let scores = ReflectionScores::from_dimensions(80, 85, 90, 70, 75);
        assert_eq!(scores.overall, 80);
        let scores = ReflectionScores::from_dimensions(71, 71, 71, 71, 72);
        assert_eq!(scores.overall, 71);
        let scores = ReflectionScores::from_dimensions(70, 70, 70, 70, 71);
        // mean 70.2 rounds down
        assert_eq!(scores.overall, 70);
    }

    #[tokio::test]
    async fn grader_supplied_overall_is_ignored() {
        let (reflection, _) = reflection_with(vec![
            r#"{"scores": {"accuracy": 90, "helpfulness": 90, "completeness": 90, "clarity": 90, "empathy": 90, "overall": 12}, "improvements": [], "shouldRevise": false, "reasoning": "solid"}"#,
        ]);
        let result = reflection.evaluate("q", "a", None).await;
        assert_eq!(result.scores.overall, 90);
        assert!(!result.should_revise);
    }

    #[tokio::test]
    async fn low_overall_forces_revision_even_if_grader_says_no() {
        let (reflection, _) = reflection_with(vec![
            r#"{"scores": {"accuracy": 50, "helpfulness": 50, "completeness": 50, "clarity": 50, "empathy": 50}, "improvements": ["be specific"], "shouldRevise": false, "reasoning": "weak"}"#,
        ]);
        let result = reflection.evaluate("q", "a", None).await;
        assert_eq!(result.scores.overall, 50);
        assert!(result.should_revise);
    }

    #[tokio::test]
    async fn failed_evaluation_degrades_to_neutral_pass_and_is_audited() {
        let storage = Arc::new(InMemoryStore::new());
        let reflection = SelfReflection::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::failing()),
        );

        let outcome = reflection.evaluate_and_revise("q", "the draft", None).await;
        assert_eq!(outcome.response, "the draft");
        assert!(!outcome.was_revised);
        assert_eq!(outcome.reflection.scores.overall, 75);

        let records = storage.recent_reflections(&tenant(), 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scores.overall, 75);
    }

    #[tokio::test]
    async fn revision_path_replaces_the_response() {
        let (reflection, _) = reflection_with(vec![
            r#"{"scores": {"accuracy": 60, "helpfulness": 60, "completeness": 60, "clarity": 60, "empathy": 60}, "improvements": ["add detail", "warmer tone"], "shouldRevise": true, "reasoning": "thin"}"#,
            "A much better, warmer, detailed answer.",
        ]);

        let outcome = reflection.evaluate_and_revise("q", "meh", None).await;
        assert!(outcome.was_revised);
        assert_eq!(outcome.response, "A much better, warmer, detailed answer.");
        assert_eq!(
            outcome.reflection.revised_response.as_deref(),
            Some("A much better, warmer, detailed answer.")
        );
    }

    #[tokio::test]
    async fn revise_is_a_passthrough_without_improvements() {
        let (reflection, _) = reflection_with(vec![]);
        let revised = reflection.revise("q", "original", &[]).await;
        assert_eq!(revised, "original");
    }

    #[tokio::test]
    async fn failed_revision_keeps_the_original() {
        let storage = Arc::new(InMemoryStore::new());
        let reflection = SelfReflection::new(
            tenant(),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Arc::new(ScriptedGenerator::failing()),
        );
        let revised = reflection
            .revise("q", "original", &["do better".to_string()])
            .await;
        assert_eq!(revised, "original");
    }

    #[tokio::test]
    async fn average_scores_aggregate_persisted_records() {
        let (reflection, _) = reflection_with(vec![
            r#"{"scores": {"accuracy": 80, "helpfulness": 80, "completeness": 80, "clarity": 80, "empathy": 80}, "improvements": [], "shouldRevise": false, "reasoning": "fine"}"#,
            r#"{"scores": {"accuracy": 60, "helpfulness": 60, "completeness": 60, "clarity": 60, "empathy": 60}, "improvements": ["be specific"], "shouldRevise": true, "reasoning": "thin"}"#,
            "revised text",
        ]);

        reflection.evaluate_and_revise("q1", "a1", None).await;
        reflection.evaluate_and_revise("q2", "a2", None).await;

        let averages = reflection.average_scores(30).await;
        assert_eq!(averages.count, 2);
        assert_eq!(averages.overall, 70);
    }

    #[tokio::test]
    async fn improvement_trends_rank_recurring_areas() {
        let (reflection, storage) = reflection_with(vec![]);
        for i in 0..3 {
            let record = ReflectionRecord {
                id: format!("r{i}"),
                user_id: "u1".to_string(),
                tenant_id: "t1".to_string(),
                user_query: "q".to_string(),
                ai_response: "a".to_string(),
                scores: ReflectionScores::neutral(),
                improvements: if i < 2 {
                    vec!["Be specific".to_string(), "Add examples".to_string()]
                } else {
                    vec!["Be specific".to_string()]
                },
                was_revised: false,
                revised_response: None,
                reasoning: "r".to_string(),
                created_at: Utc::now(),
            };
            storage.insert_reflection(&record).await.unwrap();
        }

        let trends = reflection.improvement_trends(5).await;
        assert_eq!(trends[0].area, "be specific");
        assert_eq!(trends[0].frequency, 3);
        assert_eq!(trends[1].frequency, 2);
    }
}
