use crate::agent::record::{Observation, SensedContext, StepSummary};
use crate::memory::SessionMemory;
use crate::traits::ChatMessage;
use std::fmt::Write;

pub const DEFAULT_HISTORY_WINDOW: usize = 5;

const PLANNING_SYSTEM_PROMPT: &str =
    "You are a planning agent. Always respond with valid JSON only.";
const REFLECTION_SYSTEM_PROMPT: &str = "You reflect on agent progress. Be brief.";
const REFLECTION_RESULT_MAX_CHARS: usize = 200;

const PLAN_SCHEMA: &str = r#"{
  "action": "USE_TOOL" | "COMPLETE" | "CLARIFY",
  "tool": "tool_name (only for USE_TOOL)",
  "args": {"arg_name": "value"},
  "reasoning": "why you chose this",
  "answer": "final answer (only for COMPLETE)",
  "question": "what you need to know (only for CLARIFY)"
}"#;

const PLAN_RULES: &str = "\
- If RELEVANT PAST MEMORIES already answer the goal, use COMPLETE.
- Use USE_TOOL when you need more information or a computation.
- If a previous step failed or found nothing, try a different tool or simpler arguments.
- Use CLARIFY only when the goal cannot be answered without more input from the user.
- Use COMPLETE as soon as you can answer the goal.
- Respond with the JSON object only, nothing else.";

/// Builds the SENSE snapshot and the PLAN / REFLECT prompts.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    history_window: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// How many past iterations the planning prompt shows.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn sense(&self, session: &SessionMemory, iteration: usize) -> SensedContext {
        SensedContext {
            iteration,
            recent: session
                .recent(self.history_window)
                .iter()
                .map(|r| r.summarize())
                .collect(),
            memories: session
                .recalled()
                .iter()
                .map(|e| e.content.clone())
                .collect(),
        }
    }

    pub fn planning_messages(
        &self,
        goal: &str,
        sensed: &SensedContext,
        tool_listing: &str,
        max_iterations: usize,
    ) -> Vec<ChatMessage> {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "GOAL: {}", goal);
        let _ = writeln!(
            prompt,
            "\nITERATION: {} of {}",
            sensed.iteration, max_iterations
        );
        let _ = writeln!(prompt, "\nAVAILABLE TOOLS:\n{}", tool_listing);
        let _ = writeln!(
            prompt,
            "\nRELEVANT PAST MEMORIES:\n{}",
            format_memories(&sensed.memories)
        );
        let _ = writeln!(
            prompt,
            "\nPREVIOUS STEPS:\n{}",
            format_steps(&sensed.recent)
        );
        let _ = writeln!(
            prompt,
            "\nDecide what to do next. Respond with ONLY valid JSON:\n{}",
            PLAN_SCHEMA
        );
        let _ = write!(prompt, "\nRules:\n{}", PLAN_RULES);

        vec![
            ChatMessage::system(PLANNING_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]
    }

    pub fn reflection_messages(&self, goal: &str, observation: &Observation) -> Vec<ChatMessage> {
        let result: String = observation
            .result
            .summary()
            .chars()
            .take(REFLECTION_RESULT_MAX_CHARS)
            .collect();

        let prompt = format!(
            "Goal: {goal}\n\n\
             Action Taken: {tool}\n\
             Result: {result}\n\
             Success: {success}\n\n\
             In 1-2 sentences, reflect on:\n\
             1. Did this action help progress toward the goal?\n\
             2. What should happen next?\n\n\
             Be brief and actionable.",
            tool = observation.tool,
            success = observation.success(),
        );

        vec![
            ChatMessage::system(REFLECTION_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]
    }
}

fn format_memories(memories: &[String]) -> String {
    if memories.is_empty() {
        return "None".to_string();
    }
    memories
        .iter()
        .map(|m| format!("- {}", m.replace('\n', " | ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_steps(steps: &[StepSummary]) -> String {
    if steps.is_empty() {
        return "None".to_string();
    }

    let mut out = String::new();
    for step in steps {
        let status = match step.success {
            Some(true) => "ok",
            Some(false) => "failed",
            None => "-",
        };
        let _ = writeln!(out, "[{}] {} ({})", step.iteration, step.action, status);
        if !step.result.is_empty() {
            let _ = writeln!(out, "    Result: {}", step.result);
        }
        if let Some(reflection) = &step.reflection {
            let _ = writeln!(out, "    Reflection: {}", reflection);
        }
    }
    out.trim_end().to_string()
}
