use crate::agent::plan::Plan;
use crate::traits::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How much of a tool result is carried into later planning prompts.
pub const STEP_RESULT_MAX_CHARS: usize = 200;

/// Result of the ACT phase as fed back to the next PLAN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub tool: String,
    pub args: Value,
    #[serde(flatten)]
    pub result: ToolResult,
}

impl Observation {
    pub fn new(tool: impl Into<String>, args: Value, result: ToolResult) -> Self {
        Self {
            tool: tool.into(),
            args,
            result,
        }
    }

    pub fn success(&self) -> bool {
        self.result.success
    }
}

/// Compact view of a past iteration for the planning prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepSummary {
    pub iteration: usize,
    pub action: String,
    pub success: Option<bool>,
    pub result: String,
    pub reflection: Option<String>,
}

/// What SENSE gathered before a PLAN call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensedContext {
    pub iteration: usize,
    pub recent: Vec<StepSummary>,
    pub memories: Vec<String>,
}

/// One pass of the loop. Never mutated once pushed to the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub sensed: SensedContext,
    pub plan: Plan,
    pub observation: Option<Observation>,
    pub reflection: Option<String>,
}

impl IterationRecord {
    pub fn summarize(&self) -> StepSummary {
        let action = match &self.plan {
            Plan::UseTool { tool, args, .. } => {
                format!("USE_TOOL {}({})", tool, Value::Object(args.clone()))
            }
            Plan::Complete { .. } | Plan::Unparseable { .. } => "COMPLETE".to_string(),
            Plan::Clarify { .. } => "CLARIFY".to_string(),
        };

        let (success, result) = match &self.observation {
            Some(obs) => (Some(obs.success()), truncate(&obs.result.summary())),
            None => (None, String::new()),
        };

        StepSummary {
            iteration: self.iteration,
            action,
            success,
            result,
            reflection: self.reflection.clone(),
        }
    }

    /// Output of the tool call made this iteration, when it succeeded.
    pub fn successful_output(&self) -> Option<&str> {
        self.observation
            .as_ref()
            .filter(|obs| obs.success())
            .map(|obs| obs.result.output.as_str())
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= STEP_RESULT_MAX_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(STEP_RESULT_MAX_CHARS).collect();
        format!("{head}...")
    }
}
