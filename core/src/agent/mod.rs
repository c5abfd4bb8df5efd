pub mod context;
pub mod journal;
pub mod loop_;
pub mod plan;
pub mod record;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::ContextBuilder;
pub use journal::{Phase, PhaseEntry, RunJournal, default_log_path};
pub use loop_::{AgentLoop, RunOutcome, StopReason};
pub use plan::{ActionKind, FALLBACK_ANSWER, Plan, parse_plan};
pub use record::{IterationRecord, Observation, SensedContext, StepSummary};
pub use registry::{DuplicatePolicy, ToolRegistry};
