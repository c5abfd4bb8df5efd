//! Turns raw planning-model text into a [`Plan`].
//!
//! Model output is noisy: fenced code blocks, prose around the JSON, or no
//! JSON at all. [`parse_plan`] never fails. Anything it cannot make sense of
//! becomes [`Plan::Unparseable`], which the loop treats as completion with a
//! fallback answer, so a bad response always ends the run cleanly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FALLBACK_ANSWER: &str =
    "I could not interpret the planning response. Please try rephrasing the goal.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    UseTool,
    Complete,
    Clarify,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    UseTool {
        tool: String,
        args: Map<String, Value>,
        reasoning: String,
    },
    Complete {
        answer: String,
        reasoning: String,
    },
    Clarify {
        question: String,
        reasoning: String,
    },
    Unparseable {
        reason: String,
        raw: String,
    },
}

impl Plan {
    pub fn kind(&self) -> ActionKind {
        match self {
            Plan::UseTool { .. } => ActionKind::UseTool,
            Plan::Complete { .. } | Plan::Unparseable { .. } => ActionKind::Complete,
            Plan::Clarify { .. } => ActionKind::Clarify,
        }
    }

    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Plan::UseTool { tool, .. } => Some(tool),
            _ => None,
        }
    }

    pub fn final_answer(&self) -> Option<&str> {
        match self {
            Plan::Complete { answer, .. } => Some(answer),
            Plan::Unparseable { .. } => Some(FALLBACK_ANSWER),
            _ => None,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Plan::UseTool { reasoning, .. }
            | Plan::Complete { reasoning, .. }
            | Plan::Clarify { reasoning, .. } => reasoning,
            Plan::Unparseable { reason, .. } => reason,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Plan::Unparseable { .. })
    }

    fn unparseable(reason: impl Into<String>, raw: &str) -> Self {
        Plan::Unparseable {
            reason: reason.into(),
            raw: raw.chars().take(500).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(alias = "action_type")]
    action: Option<String>,
    #[serde(alias = "tool_name")]
    tool: Option<String>,
    #[serde(alias = "arguments")]
    args: Option<Value>,
    #[serde(default)]
    reasoning: Option<Value>,
    #[serde(alias = "final_answer")]
    answer: Option<Value>,
    question: Option<Value>,
}

pub fn parse_plan(text: &str) -> Plan {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Plan::unparseable("empty response", text);
    }

    let unfenced = strip_fences(trimmed);
    let Some(candidate) = outer_object(unfenced) else {
        return Plan::unparseable("no JSON object in response", text);
    };

    let raw: RawPlan = match serde_json::from_str(candidate) {
        Ok(raw) => raw,
        Err(e) => return Plan::unparseable(format!("invalid JSON: {e}"), text),
    };

    match validate(raw) {
        Ok(plan) => plan,
        Err(reason) => Plan::unparseable(reason, text),
    }
}

/// Body of the first fenced block, or the text unchanged when there is none.
fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    let body_start = after_open
        .strip_prefix("json")
        .or_else(|| after_open.strip_prefix("JSON"))
        .unwrap_or(after_open);

    match body_start.find("```") {
        Some(close) => &body_start[..close],
        None => body_start,
    }
}

/// From the first `{` to the last `}`.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn text_field(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn validate(raw: RawPlan) -> Result<Plan, String> {
    let action = raw
        .action
        .ok_or_else(|| "missing 'action' field".to_string())?;
    let reasoning = text_field(raw.reasoning).unwrap_or_default();

    match action.trim().to_ascii_uppercase().as_str() {
        "USE_TOOL" => {
            let tool = raw
                .tool
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| "USE_TOOL without a tool name".to_string())?;
            let args = match raw.args {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map,
                Some(other) => {
                    return Err(format!("'args' must be an object, got {}", other));
                }
            };
            Ok(Plan::UseTool {
                tool,
                args,
                reasoning,
            })
        }
        "COMPLETE" => {
            let answer =
                text_field(raw.answer).ok_or_else(|| "COMPLETE without an answer".to_string())?;
            Ok(Plan::Complete { answer, reasoning })
        }
        "CLARIFY" => {
            let question = text_field(raw.question)
                .or_else(|| text_field(raw.answer))
                .ok_or_else(|| "CLARIFY without a question".to_string())?;
            Ok(Plan::Clarify {
                question,
                reasoning,
            })
        }
        other => Err(format!("unknown action '{other}'")),
    }
}
