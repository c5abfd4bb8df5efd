use crate::error::RegistryError;
use crate::traits::{Tool, ToolResult, ToolSpec};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// What `register` does when a tool name is already taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    /// Last registration wins; the tool keeps its original position.
    Replace,
}

/// Name-keyed, insertion-ordered set of tools.
///
/// `dispatch` is the failure boundary for tools: whatever the tool does,
/// the caller gets a `ToolResult`.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    on_duplicate: DuplicatePolicy,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            on_duplicate: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.on_duplicate = policy;
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let position = self.tools.iter().position(|t| t.name() == tool.name());

        match (position, self.on_duplicate) {
            (None, _) => {
                debug!(tool = %tool.name(), "Tool registered");
                self.tools.push(tool);
                Ok(())
            }
            (Some(_), DuplicatePolicy::Reject) => {
                Err(RegistryError::DuplicateTool(tool.name().to_string()))
            }
            (Some(idx), DuplicatePolicy::Replace) => {
                warn!(tool = %tool.name(), "Replacing previously registered tool");
                self.tools[idx] = tool;
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Tool listing for the planning prompt, in registration order.
    pub fn describe_all(&self) -> String {
        if self.tools.is_empty() {
            return "None".to_string();
        }

        let mut listing = String::new();
        for spec in self.specs() {
            let _ = writeln!(listing, "- {}: {}", spec.name, spec.description);
            if !spec.parameters_schema.is_null() {
                let _ = writeln!(listing, "  parameters: {}", spec.parameters_schema);
            }
        }
        listing.trim_end().to_string()
    }

    pub async fn dispatch(&self, name: &str, args: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Dispatch to unknown tool");
            return ToolResult::error(format!("Tool '{}' not found", name));
        };

        if let Err(problems) = validate_args(&tool.parameters_schema(), &args) {
            warn!(tool = %name, %problems, "Tool arguments rejected");
            return ToolResult::error(format!("Invalid arguments for '{}': {}", name, problems));
        }

        match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ToolResult::error(format!("Execution failed: {}", e)),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(tool = %name, %message, "Tool panicked");
                ToolResult::error(format!("Execution panicked: {}", message))
            }
        }
    }
}

fn validate_args(schema: &Value, args: &Value) -> Result<(), String> {
    if schema.is_null() {
        return Ok(());
    }

    let validator =
        jsonschema::validator_for(schema).map_err(|e| format!("invalid parameter schema: {e}"))?;

    let problems: Vec<String> = validator.iter_errors(args).map(|e| e.to_string()).collect();
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}
