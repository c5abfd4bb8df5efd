use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Offline stand-in for a web search; answers every topic with a canned line.
pub struct MockSearchTool;

#[async_trait]
impl Tool for MockSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for information about a topic"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {
                    "type": "string",
                    "description": "Topic to look up"
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let topic = extract_string_arg(&args, "topic")?;
        Ok(ToolResult::success(format!(
            "Information about {}: [Mock search result]",
            topic
        )))
    }
}
