use crate::agent::journal::{Phase, RunJournal};
use crate::agent::plan::{Plan, parse_plan};
use crate::agent::record::{IterationRecord, Observation, SensedContext};
use crate::agent::{ContextBuilder, ToolRegistry};
use crate::memory::SessionMemory;
use crate::traits::{ChatRequest, Memory, Provider};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;
const REFLECTION_MAX_TOKENS: u32 = 100;
const MAX_ITERATIONS_ANSWER: &str = "Max iterations reached without completion";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    MaxIterations,
    ClarifyRequested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Completed => "completed",
            StopReason::MaxIterations => "max_iterations",
            StopReason::ClarifyRequested => "clarify_requested",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub reason: StopReason,
    pub iterations: usize,
    pub records: Vec<IterationRecord>,
    pub journal: RunJournal,
}

/// Drives SENSE -> PLAN -> ACT -> OBSERVE -> REFLECT until the model
/// completes, asks for clarification, or the iteration budget runs out.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    memory: Option<Arc<dyn Memory>>,
    model: String,
    temperature: f64,
    reflection_temperature: f64,
    reflect: bool,
    max_iterations: usize,
    recall_limit: usize,
    recall_threshold: f64,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            context_builder,
            tool_registry,
            memory: None,
            model: model.into(),
            temperature: 0.0,
            reflection_temperature: 0.3,
            reflect: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            recall_limit: 3,
            recall_threshold: 0.75,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Clamped to at least one iteration.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_reflection_temperature(mut self, temperature: f64) -> Self {
        self.reflection_temperature = temperature;
        self
    }

    pub fn with_reflection(mut self, enabled: bool) -> Self {
        self.reflect = enabled;
        self
    }

    pub fn with_recall(mut self, limit: usize, threshold: f64) -> Self {
        self.recall_limit = limit;
        self.recall_threshold = threshold;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Runs one goal to completion.
    ///
    /// Only a failed completion call is an error; tool failures, bad plans,
    /// reflection and memory problems are all absorbed into the run.
    pub async fn run(&self, goal: &str) -> Result<RunOutcome> {
        let mut session = SessionMemory::new(goal);
        let mut journal = RunJournal::new();
        info!(run_id = %journal.run_id(), goal = %goal, "Agent run started");

        if let Some(ref memory) = self.memory {
            let recalled = memory
                .recall(goal, self.recall_limit, self.recall_threshold)
                .await;
            debug!(count = recalled.len(), "Recalled memories");
            session.set_recalled(recalled);
        }

        for iteration in 1..=self.max_iterations {
            let sensed = self.context_builder.sense(&session, iteration);
            journal.record(
                Phase::Sense,
                iteration,
                json!({
                    "recent_steps": sensed.recent.len(),
                    "memories": sensed.memories,
                }),
            );

            let plan = self
                .plan(goal, &sensed, iteration)
                .await
                .with_context(|| format!("Planning failed at iteration {}", iteration))?;
            journal.record(Phase::Plan, iteration, &plan);

            match &plan {
                Plan::Complete { .. } | Plan::Unparseable { .. } => {
                    if let Plan::Unparseable { reason, .. } = &plan {
                        warn!(iteration, %reason, "Unparseable plan, completing with fallback");
                    }
                    let answer = plan.final_answer().unwrap_or_default().to_string();
                    if !plan.is_fallback() {
                        self.remember(goal, &answer).await;
                    }
                    journal.record(Phase::Complete, iteration, json!({ "answer": answer }));
                    session.push(bare_record(iteration, sensed, plan));
                    return Ok(finish(answer, StopReason::Completed, iteration, session, journal));
                }
                Plan::Clarify { question, .. } => {
                    let question = question.clone();
                    session.push(bare_record(iteration, sensed, plan));
                    return Ok(finish(
                        question,
                        StopReason::ClarifyRequested,
                        iteration,
                        session,
                        journal,
                    ));
                }
                Plan::UseTool { tool, args, .. } => {
                    let args = Value::Object(args.clone());
                    journal.record(Phase::Act, iteration, json!({ "tool": tool, "args": args }));
                    info!(iteration, tool = %tool, "Dispatching tool");

                    let result = self.tool_registry.dispatch(tool, args.clone()).await;
                    let observation = Observation::new(tool.as_str(), args, result);
                    journal.record(Phase::Observe, iteration, &observation);
                    if !observation.success() {
                        warn!(
                            iteration,
                            tool = %tool,
                            error = ?observation.result.error,
                            "Tool call failed"
                        );
                    }

                    let reflection = if self.reflect {
                        let reflection = self.reflect_on(goal, &observation).await;
                        journal.record(
                            Phase::Reflect,
                            iteration,
                            json!({ "reflection": reflection }),
                        );
                        Some(reflection)
                    } else {
                        None
                    };

                    session.push(IterationRecord {
                        iteration,
                        sensed,
                        plan,
                        observation: Some(observation),
                        reflection,
                    });
                }
            }
        }

        let answer = match session.records().iter().rev().find_map(|r| r.successful_output()) {
            Some(last) => format!("{}. Last result: {}", MAX_ITERATIONS_ANSWER, last),
            None => MAX_ITERATIONS_ANSWER.to_string(),
        };
        warn!(max_iterations = self.max_iterations, "Iteration budget exhausted");
        Ok(finish(
            answer,
            StopReason::MaxIterations,
            self.max_iterations,
            session,
            journal,
        ))
    }

    async fn plan(&self, goal: &str, sensed: &SensedContext, iteration: usize) -> Result<Plan> {
        let messages = self.context_builder.planning_messages(
            goal,
            sensed,
            &self.tool_registry.describe_all(),
            self.max_iterations,
        );
        let response = self
            .provider
            .chat(ChatRequest::new(&messages), &self.model, self.temperature)
            .await?;

        let text = response.text_or_empty();
        debug!(iteration, response = %text, "Planning response");
        Ok(parse_plan(text))
    }

    async fn reflect_on(&self, goal: &str, observation: &Observation) -> String {
        let messages = self.context_builder.reflection_messages(goal, observation);
        let request = ChatRequest::new(&messages).with_max_tokens(REFLECTION_MAX_TOKENS);

        match self
            .provider
            .chat(request, &self.model, self.reflection_temperature)
            .await
        {
            Ok(response) => response.text_or_empty().trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Reflection failed");
                format!("Reflection failed: {}", e)
            }
        }
    }

    async fn remember(&self, goal: &str, answer: &str) {
        let Some(ref memory) = self.memory else {
            return;
        };
        match memory.remember(goal, answer).await {
            Ok(true) => debug!("Answer stored in long-term memory"),
            Ok(false) => debug!("Similar memory exists, not stored"),
            Err(e) => warn!(error = %e, "Failed to store memory"),
        }
    }
}

fn bare_record(iteration: usize, sensed: SensedContext, plan: Plan) -> IterationRecord {
    IterationRecord {
        iteration,
        sensed,
        plan,
        observation: None,
        reflection: None,
    }
}

fn finish(
    answer: String,
    reason: StopReason,
    iterations: usize,
    session: SessionMemory,
    mut journal: RunJournal,
) -> RunOutcome {
    journal.record(
        Phase::Stop,
        iterations,
        json!({ "reason": reason, "answer": answer }),
    );
    info!(run_id = %journal.run_id(), %reason, iterations, "Agent run finished");

    RunOutcome {
        answer,
        reason,
        iterations,
        records: session.into_records(),
        journal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::FALLBACK_ANSWER;
    use crate::agent::test_helpers::{
        EchoTool, FailingTool, RecordingMemory, ScriptedProvider, memory_entry,
    };
    use crate::tools::CalculatorTool;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CalculatorTool)).unwrap();
        registry.register(Arc::new(EchoTool::new("echo"))).unwrap();
        registry.register(Arc::new(FailingTool)).unwrap();
        Arc::new(registry)
    }

    fn agent(provider: Arc<ScriptedProvider>) -> AgentLoop {
        AgentLoop::new(provider, ContextBuilder::new(), registry(), "test-model")
    }

    #[tokio::test]
    async fn arithmetic_goal_completes_in_two_iterations() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "USE_TOOL", "tool": "calculate", "args": {"expression": "25 * 4 + 100"}, "reasoning": "compute"}"#,
            "```json\n{\"action\": \"COMPLETE\", \"answer\": \"25 * 4 + 100 = 200\"}\n```",
        ]));

        let outcome = agent(provider.clone())
            .run("What is 25 * 4 + 100?")
            .await
            .unwrap();

        assert_eq!(outcome.reason, StopReason::Completed);
        assert!(outcome.iterations <= 2);
        assert!(outcome.answer.contains("200"));

        let observation = outcome.records[0].observation.as_ref().unwrap();
        assert!(observation.success());
        assert_eq!(observation.result.output, "200");

        let second_plan = &provider.planning_requests()[1];
        assert!(second_plan.user_prompt().contains("Result: 200"));
        assert_eq!(second_plan.temperature, 0.0);
        assert_eq!(provider.reflection_requests()[0].max_tokens, Some(100));
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back_to_the_next_plan() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "USE_TOOL", "tool": "teleport", "args": {}}"#,
            r#"{"action": "COMPLETE", "answer": "gave up"}"#,
        ]));

        let outcome = agent(provider.clone()).run("go to mars").await.unwrap();

        assert_eq!(outcome.answer, "gave up");
        let observation = outcome.records[0].observation.as_ref().unwrap();
        assert!(!observation.success());
        assert!(
            provider.planning_requests()[1]
                .user_prompt()
                .contains("ERROR: Tool 'teleport' not found")
        );
    }

    #[tokio::test]
    async fn failing_tool_error_becomes_context() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "USE_TOOL", "tool": "explode", "args": {}}"#,
            r#"{"action": "COMPLETE", "answer": "the tool is broken"}"#,
        ]));

        let outcome = agent(provider.clone()).run("blow up").await.unwrap();

        assert_eq!(outcome.reason, StopReason::Completed);
        assert_eq!(outcome.iterations, 2);
        assert!(
            provider.planning_requests()[1]
                .user_prompt()
                .contains("Execution failed: the tool blew up")
        );
    }

    #[tokio::test]
    async fn stops_at_max_iterations_with_last_result() {
        let step = r#"{"action": "USE_TOOL", "tool": "echo", "args": {"text": "still working"}}"#;
        let provider = Arc::new(ScriptedProvider::new(vec![step; 10]));

        let outcome = agent(provider.clone())
            .with_max_iterations(3)
            .run("never finish")
            .await
            .unwrap();

        assert_eq!(outcome.reason, StopReason::MaxIterations);
        assert_eq!(outcome.iterations, 3);
        let iterations: Vec<usize> = outcome.records.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![1, 2, 3]);
        assert!(outcome.answer.starts_with("Max iterations reached without completion"));
        assert!(outcome.answer.ends_with("still working"));
        assert_eq!(provider.planning_requests().len(), 3);
    }

    #[tokio::test]
    async fn unparseable_plan_completes_with_fallback() {
        let provider = Arc::new(ScriptedProvider::new(["I am not JSON at all"]));
        let memory = Arc::new(RecordingMemory::default());

        let outcome = agent(provider)
            .with_memory(memory.clone())
            .run("anything")
            .await
            .unwrap();

        assert_eq!(outcome.reason, StopReason::Completed);
        assert_eq!(outcome.answer, FALLBACK_ANSWER);
        assert!(memory.stored().is_empty());
    }

    #[tokio::test]
    async fn clarify_stops_the_run() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "CLARIFY", "question": "Which quarter?"}"#,
        ]));

        let outcome = agent(provider).run("show revenue").await.unwrap();

        assert_eq!(outcome.reason, StopReason::ClarifyRequested);
        assert_eq!(outcome.answer, "Which quarter?");
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn completion_failure_aborts_the_run() {
        let provider = Arc::new(ScriptedProvider::scripted(vec![Err(
            "connection refused".to_string(),
        )]));

        let err = agent(provider).run("anything").await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
    }

    #[tokio::test]
    async fn reflection_failure_is_recorded_not_fatal() {
        let provider = Arc::new(
            ScriptedProvider::new([
                r#"{"action": "USE_TOOL", "tool": "echo", "args": {"text": "hi"}}"#,
                r#"{"action": "COMPLETE", "answer": "hi"}"#,
            ])
            .with_reflections(vec![Err("rate limited".to_string())]),
        );

        let outcome = agent(provider).run("say hi").await.unwrap();

        assert_eq!(outcome.answer, "hi");
        assert_eq!(
            outcome.records[0].reflection.as_deref(),
            Some("Reflection failed: rate limited")
        );
    }

    #[tokio::test]
    async fn reflection_can_be_disabled() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "USE_TOOL", "tool": "echo", "args": {"text": "hi"}}"#,
            r#"{"action": "COMPLETE", "answer": "hi"}"#,
        ]));

        let outcome = agent(provider.clone())
            .with_reflection(false)
            .run("say hi")
            .await
            .unwrap();

        assert!(provider.reflection_requests().is_empty());
        assert!(outcome.records[0].reflection.is_none());
        assert!(!outcome.journal.phases().contains(&Phase::Reflect));
    }

    #[tokio::test]
    async fn memories_are_recalled_once_and_answers_remembered() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "USE_TOOL", "tool": "echo", "args": {"text": "checking"}}"#,
            r#"{"action": "COMPLETE", "answer": "200"}"#,
        ]));
        let memory = Arc::new(RecordingMemory::with_entries(vec![
            memory_entry("Question: What is 25 * 4 + 100?\nAnswer: 200", 0.92),
            memory_entry("Question: unrelated\nAnswer: no", 0.4),
        ]));

        let outcome = agent(provider.clone())
            .with_memory(memory.clone())
            .run("What is 25 * 4 + 100?")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "200");
        assert_eq!(memory.queries().len(), 1);
        assert_eq!(
            memory.stored(),
            vec![("What is 25 * 4 + 100?".to_string(), "200".to_string())]
        );

        let prompt = provider.planning_requests()[0].user_prompt().to_string();
        assert!(prompt.contains("Answer: 200"));
        assert!(!prompt.contains("unrelated"));
    }

    #[tokio::test]
    async fn memory_write_failure_does_not_fail_the_run() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "COMPLETE", "answer": "done"}"#,
        ]));

        let outcome = agent(provider)
            .with_memory(Arc::new(RecordingMemory::failing_writes()))
            .run("finish")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "done");
    }

    #[tokio::test]
    async fn journal_covers_every_phase_in_order() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"action": "USE_TOOL", "tool": "echo", "args": {"text": "x"}}"#,
            r#"{"action": "COMPLETE", "answer": "x"}"#,
        ]));

        let outcome = agent(provider).run("echo x").await.unwrap();

        assert_eq!(
            outcome.journal.phases(),
            vec![
                Phase::Sense,
                Phase::Plan,
                Phase::Act,
                Phase::Observe,
                Phase::Reflect,
                Phase::Sense,
                Phase::Plan,
                Phase::Complete,
                Phase::Stop,
            ]
        );
        let iterations: Vec<usize> = outcome
            .journal
            .entries()
            .iter()
            .map(|e| e.iteration)
            .collect();
        assert_eq!(iterations, vec![1, 1, 1, 1, 1, 2, 2, 2, 2]);
    }
}
