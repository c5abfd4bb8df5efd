//! In-process doubles for the provider, tool and memory seams.

use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, Memory, MemoryEntry, Provider, Tool, ToolResult,
    select_relevant,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies with scripted planning responses in order.
///
/// Reflection requests (system prompt starts with "You reflect") draw from a
/// separate queue so tests can script the two independently. Every request
/// is recorded.
pub struct ScriptedProvider {
    plans: Mutex<VecDeque<Result<String, String>>>,
    reflections: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl RecordedRequest {
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    pub fn is_reflection(&self) -> bool {
        self.messages
            .first()
            .is_some_and(|m| m.role == "system" && m.content.starts_with("You reflect"))
    }
}

impl ScriptedProvider {
    pub fn new<S: Into<String>>(plans: impl IntoIterator<Item = S>) -> Self {
        Self::scripted(plans.into_iter().map(|p| Ok(p.into())).collect())
    }

    pub fn scripted(plans: Vec<Result<String, String>>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            reflections: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reflections(self, reflections: Vec<Result<String, String>>) -> Self {
        *self.reflections.lock().unwrap() = reflections.into();
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn planning_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.is_reflection())
            .collect()
    }

    pub fn reflection_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(RecordedRequest::is_reflection)
            .collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        request: ChatRequest<'_>,
        _model: &str,
        temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        let recorded = RecordedRequest {
            messages: request.messages.to_vec(),
            temperature,
            max_tokens: request.max_tokens,
        };
        let reflection = recorded.is_reflection();
        self.requests.lock().unwrap().push(recorded);

        let next = if reflection {
            self.reflections
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("Progress noted.".to_string()))
        } else {
            self.plans
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        };

        next.map(ChatResponse::text).map_err(anyhow::Error::msg)
    }
}

/// Returns its `text` argument.
pub struct EchoTool {
    name: String,
    description: String,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: "Echo the given text back".to_string(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let text = args.get("text").and_then(|v| v.as_str()).unwrap_or("");
        Ok(ToolResult::success(text))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object"})
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        Err(anyhow::anyhow!("the tool blew up"))
    }
}

pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panic"
    }

    fn description(&self) -> &str {
        "Panics when executed"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        panic!("index out of range")
    }
}

/// Memory that serves fixed entries and records what it is asked to store.
#[derive(Default)]
pub struct RecordingMemory {
    entries: Vec<MemoryEntry>,
    stored: Mutex<Vec<(String, String)>>,
    queries: Mutex<Vec<String>>,
    fail_writes: bool,
}

impl RecordingMemory {
    pub fn with_entries(entries: Vec<MemoryEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Vec<(String, String)> {
        self.stored.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

pub fn memory_entry(content: &str, similarity: f64) -> MemoryEntry {
    MemoryEntry {
        id: content.len().to_string(),
        content: content.to_string(),
        created_at: None,
        similarity: Some(similarity),
    }
}

#[async_trait]
impl Memory for RecordingMemory {
    fn name(&self) -> &str {
        "recording"
    }

    async fn remember(&self, question: &str, answer: &str) -> anyhow::Result<bool> {
        if self.fail_writes {
            anyhow::bail!("store unavailable");
        }
        self.stored
            .lock()
            .unwrap()
            .push((question.to_string(), answer.to_string()));
        Ok(true)
    }

    async fn recall(&self, query: &str, limit: usize, threshold: f64) -> Vec<MemoryEntry> {
        self.queries.lock().unwrap().push(query.to_string());
        select_relevant(self.entries.clone(), limit, threshold)
    }

    async fn health_check(&self) -> bool {
        !self.fail_writes
    }
}
