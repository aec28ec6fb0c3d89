//! Multi-agent coordination for complex objectives
//!
//! A plan is an ordered set of role-specialized tasks. Execution is
//! strictly sequential: each task's context is enriched with truncated
//! digests of every previously completed task's output, so later tasks
//! build on earlier ones. Planning and synthesis both have deterministic
//! fallbacks - the system always produces an executable plan and a final
//! answer.

use crate::generation::{decode_json, TextGenerator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// How much of each prior task's output is fed forward
const DIGEST_CHARS: usize = 500;

/// The specialized roles an agent task can be assigned to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Researcher,
    Writer,
    Analyst,
    Planner,
    Critic,
    Coordinator,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Researcher => "researcher",
            AgentRole::Writer => "writer",
            AgentRole::Analyst => "analyst",
            AgentRole::Planner => "planner",
            AgentRole::Critic => "critic",
            AgentRole::Coordinator => "coordinator",
        }
    }

    /// Static instruction block for this role
    pub fn instructions(&self) -> &'static str {
        match self {
            AgentRole::Researcher => {
                "You are a Research Agent. Your role is to:\n\
                 - Find relevant information and facts\n\
                 - Synthesize multiple sources into coherent summaries\n\
                 - Identify key insights and patterns\n\
                 - Flag any uncertainties or gaps in information\n\
                 Be thorough but concise. Cite your reasoning."
            }
            AgentRole::Writer => {
                "You are a Writing Agent. Your role is to:\n\
                 - Create clear, engaging content\n\
                 - Adapt tone and style to the audience\n\
                 - Structure information logically\n\
                 - Edit and refine for clarity\n\
                 Focus on quality and readability."
            }
            AgentRole::Analyst => {
                "You are an Analysis Agent. Your role is to:\n\
                 - Examine data and information critically\n\
                 - Identify trends, patterns, and anomalies\n\
                 - Provide data-driven insights\n\
                 - Make evidence-based recommendations\n\
                 Be objective and precise."
            }
            AgentRole::Planner => {
                "You are a Planning Agent. Your role is to:\n\
                 - Break down complex goals into actionable steps\n\
                 - Create realistic timelines and milestones\n\
                 - Identify dependencies and potential blockers\n\
                 - Prioritize tasks effectively\n\
                 Be practical and thorough."
            }
            AgentRole::Critic => {
                "You are a Critic Agent. Your role is to:\n\
                 - Review outputs for quality and accuracy\n\
                 - Identify weaknesses and areas for improvement\n\
                 - Suggest specific enhancements\n\
                 - Ensure outputs meet objectives\n\
                 Be constructive but honest."
            }
            AgentRole::Coordinator => {
                "You are a Coordinator Agent. Your role is to:\n\
                 - Orchestrate work across multiple agents\n\
                 - Ensure coherent integration of outputs\n\
                 - Resolve conflicts between agent recommendations\n\
                 - Synthesize final deliverables\n\
                 Focus on the big picture while maintaining quality."
            }
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One task within a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    pub id: String,
    pub role: AgentRole,
    pub objective: String,
    #[serde(default)]
    pub context: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub expected_output: String,
}

/// Output of one executed task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub task_id: String,
    pub role: AgentRole,
    pub output: String,
    /// 0 - 100
    pub confidence: u8,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_follow_up: Option<String>,
}

/// An ordered multi-agent execution plan
///
/// `execution_order` is explicit rather than implied by `tasks` ordering so
/// the format can later carry non-linear graphs unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MultiAgentPlan {
    pub id: String,
    pub objective: String,
    pub tasks: Vec<AgentTask>,
    pub execution_order: Vec<String>,
    pub estimated_time: String,
}

/// Everything a finished plan run produces
#[derive(Debug, Clone)]
pub struct PlanRun {
    pub results: Vec<AgentResult>,
    pub final_output: String,
    /// 0 - 100, integer mean of task confidences
    pub overall_confidence: u8,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PlanReply {
    tasks: Vec<AgentTask>,
    execution_order: Vec<String>,
    estimated_time: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskReply {
    output: Option<String>,
    #[serde(default)]
    confidence: Option<u8>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    suggested_follow_up: Option<String>,
}

/// Plans and executes role-specialized task sequences
pub struct MultiAgentSystem {
    generator: Arc<dyn TextGenerator>,
}

impl MultiAgentSystem {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Create a plan of 2-5 role-assigned tasks for an objective
    ///
    /// Falls back to a single coordinator task covering the whole objective
    /// when planning fails - there is always an executable plan.
    pub async fn create_plan(&self, objective: &str, context: &str) -> MultiAgentPlan {
        let prompt = format!(
            "You are a task planning system. Create a multi-agent execution plan for this \
             objective:\n\n\
             OBJECTIVE: {objective}\n\n\
             CONTEXT: {context}\n\n\
             Available agent roles:\n\
             - researcher: Finds and synthesizes information\n\
             - writer: Creates content and documents\n\
             - analyst: Analyzes data and provides insights\n\
             - planner: Creates plans and breaks down goals\n\
             - critic: Reviews and improves outputs\n\
             - coordinator: Orchestrates and integrates\n\n\
             Create a plan with 2-5 tasks. Respond ONLY with valid JSON:\n\
             {{\n\
               \"tasks\": [\n\
                 {{\n\
                   \"id\": \"task-1\",\n\
                   \"role\": \"<agent role>\",\n\
                   \"objective\": \"<specific task objective>\",\n\
                   \"context\": \"<relevant context for this task>\",\n\
                   \"expectedOutput\": \"<what this task should produce>\"\n\
                 }}\n\
               ],\n\
               \"executionOrder\": [\"task-1\", \"task-2\"],\n\
               \"estimatedTime\": \"<estimated completion time>\"\n\
             }}"
        );

        let decoded = match self.generator.generate(&prompt, 0.5).await {
            Ok(text) => decode_json::<PlanReply>(&text),
            Err(e) => {
                tracing::warn!("plan creation call failed: {e}");
                None
            }
        };

        match decoded {
            Some(reply) if !reply.tasks.is_empty() && !reply.execution_order.is_empty() => {
                MultiAgentPlan {
                    id: format!("plan-{}", Uuid::new_v4()),
                    objective: objective.to_string(),
                    tasks: reply.tasks,
                    execution_order: reply.execution_order,
                    estimated_time: reply
                        .estimated_time
                        .unwrap_or_else(|| "Unknown".to_string()),
                }
            }
            _ => self.fallback_plan(objective, context),
        }
    }

    fn fallback_plan(&self, objective: &str, context: &str) -> MultiAgentPlan {
        MultiAgentPlan {
            id: format!("plan-{}", Uuid::new_v4()),
            objective: objective.to_string(),
            tasks: vec![AgentTask {
                id: "task-1".to_string(),
                role: AgentRole::Coordinator,
                objective: objective.to_string(),
                context: context.to_string(),
                constraints: Vec::new(),
                expected_output: "Complete response to the objective".to_string(),
            }],
            execution_order: vec!["task-1".to_string()],
            estimated_time: "1-2 minutes".to_string(),
        }
    }

    /// Execute one task with its role's instruction block
    ///
    /// An unparseable reply is not a failure: the raw text becomes the
    /// output at confidence 70. Only a call-level error yields confidence 0.
    pub async fn execute_task(&self, task: &AgentTask) -> AgentResult {
        let constraints_block = if task.constraints.is_empty() {
            String::new()
        } else {
            format!(
                "Constraints:\n{}\n\n",
                task.constraints
                    .iter()
                    .map(|c| format!("- {c}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        let prompt = format!(
            "{}\n\n\
             YOUR TASK:\n\
             Objective: {}\n\n\
             Context: {}\n\n\
             {}\
             Expected Output: {}\n\n\
             Complete this task thoroughly. Provide your output, confidence level (0-100), \
             and brief reasoning.\n\n\
             Respond in JSON format:\n\
             {{\n\
               \"output\": \"<your complete output>\",\n\
               \"confidence\": <0-100>,\n\
               \"reasoning\": \"<brief explanation of your approach>\",\n\
               \"suggestedFollowUp\": \"<optional: what should happen next>\"\n\
             }}",
            task.role.instructions(),
            task.objective,
            task.context,
            constraints_block,
            task.expected_output
        );

        let text = match self.generator.generate(&prompt, 0.7).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("task {} failed: {e}", task.id);
                return AgentResult {
                    task_id: task.id.clone(),
                    role: task.role,
                    output: "Task execution failed".to_string(),
                    confidence: 0,
                    reasoning: format!("Error: {e}"),
                    suggested_follow_up: None,
                };
            }
        };

        match decode_json::<TaskReply>(&text) {
            Some(reply) => AgentResult {
                task_id: task.id.clone(),
                role: task.role,
                output: reply.output.unwrap_or_else(|| text.clone()),
                confidence: reply.confidence.unwrap_or(70).min(100),
                reasoning: reply
                    .reasoning
                    .unwrap_or_else(|| "No reasoning provided".to_string()),
                suggested_follow_up: reply.suggested_follow_up,
            },
            None => AgentResult {
                task_id: task.id.clone(),
                role: task.role,
                output: text,
                confidence: 70,
                reasoning: "Direct output without structured response".to_string(),
                suggested_follow_up: None,
            },
        }
    }

    /// Execute a full plan in its declared order
    ///
    /// Sequential by design: each task sees a digest of all prior outputs,
    /// so tasks form a data dependency chain and must not run in parallel.
    pub async fn execute_plan(&self, plan: &MultiAgentPlan) -> PlanRun {
        let mut results: Vec<AgentResult> = Vec::new();
        let mut outputs: Vec<(String, String)> = Vec::new();

        for task_id in &plan.execution_order {
            let task = match plan.tasks.iter().find(|t| &t.id == task_id) {
                Some(task) => task,
                None => {
                    tracing::warn!("execution order references unknown task {task_id}");
                    continue;
                }
            };

            let previous: String = outputs
                .iter()
                .map(|(id, output)| format!("[{id}]: {}", truncate_chars(output, DIGEST_CHARS)))
                .collect::<Vec<_>>()
                .join("\n\n");

            let enriched = AgentTask {
                context: format!("{}\n\nPrevious task outputs:\n{previous}", task.context),
                ..task.clone()
            };

            let result = self.execute_task(&enriched).await;
            outputs.push((task_id.clone(), result.output.clone()));
            results.push(result);
        }

        let final_output = self.synthesize_results(&plan.objective, &results).await;
        let overall_confidence = if results.is_empty() {
            0
        } else {
            let sum: u32 = results.iter().map(|r| r.confidence as u32).sum();
            (sum as f64 / results.len() as f64).round() as u8
        };

        PlanRun {
            results,
            final_output,
            overall_confidence,
        }
    }

    /// Integrate all agent outputs into one unified response
    ///
    /// Falls back to a role-labelled concatenation so synthesis is never a
    /// hard failure point.
    pub async fn synthesize_results(&self, objective: &str, results: &[AgentResult]) -> String {
        let agent_outputs = results
            .iter()
            .map(|r| {
                format!(
                    "[{} AGENT] (Confidence: {}%)\n{}",
                    r.role.as_str().to_uppercase(),
                    r.confidence,
                    r.output
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        let prompt = format!(
            "You are synthesizing outputs from multiple specialized agents into a coherent \
             final response.\n\n\
             ORIGINAL OBJECTIVE: {objective}\n\n\
             AGENT OUTPUTS:\n{agent_outputs}\n\n\
             Create a unified, coherent response that:\n\
             1. Integrates the best insights from each agent\n\
             2. Resolves any conflicts between outputs\n\
             3. Presents information in a clear, actionable format\n\
             4. Addresses the original objective completely\n\n\
             Provide the final synthesized response:"
        );

        match self.generator.generate(&prompt, 0.5).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("synthesis failed: {e}");
                results
                    .iter()
                    .map(|r| format!("**{}**: {}", r.role, r.output))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        }
    }

    /// Single-task execution for simple objectives
    pub async fn quick_execute(&self, role: AgentRole, objective: &str, context: &str) -> String {
        let task = AgentTask {
            id: format!("quick-{}", Uuid::new_v4()),
            role,
            objective: objective.to_string(),
            context: context.to_string(),
            constraints: Vec::new(),
            expected_output: "Complete response".to_string(),
        };
        self.execute_task(&task).await.output
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
