use crate::agent::ToolRegistry;
use crate::error::RegistryError;
use serde_json::Value;
use std::sync::Arc;

pub mod calculator;
pub mod knowledge_base;
pub mod search;

pub use calculator::{CalculatorTool, calculate};
pub use knowledge_base::{Document, KnowledgeBaseTool};
pub use search::MockSearchTool;

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

/// Registers the built-in tools: `calculate`, `search` and
/// `search_knowledge_base`.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    knowledge_base: KnowledgeBaseTool,
) -> Result<(), RegistryError> {
    registry.register(Arc::new(CalculatorTool))?;
    registry.register(Arc::new(MockSearchTool))?;
    registry.register(Arc::new(knowledge_base))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_string_arg_requires_a_string() {
        assert_eq!(
            extract_string_arg(&json!({"q": "vpn"}), "q").unwrap(),
            "vpn"
        );
        assert!(extract_string_arg(&json!({"q": 3}), "q").is_err());
    }

    #[test]
    fn builtin_tools_register_once() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, KnowledgeBaseTool::from_documents(vec![])).unwrap();
        assert_eq!(
            registry.names(),
            vec!["calculate", "search", "search_knowledge_base"]
        );

        let again =
            register_builtin_tools(&mut registry, KnowledgeBaseTool::from_documents(vec![]));
        assert!(matches!(again, Err(RegistryError::DuplicateTool(_))));
    }
}
