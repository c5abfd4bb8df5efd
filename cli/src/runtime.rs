use anyhow::Result;
use spoar_core::agent::{AgentLoop, ContextBuilder, ToolRegistry};
use spoar_core::config::{Config, Credentials};
use spoar_core::memory::create_memory;
use spoar_core::providers::{create_provider, create_speech};
use spoar_core::tools::{KnowledgeBaseTool, register_builtin_tools};
use spoar_core::traits::{Memory, Speech};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_iterations: Option<usize>,
    pub no_reflect: bool,
    pub knowledge_base: Option<PathBuf>,
}

pub struct Runtime {
    pub agent: AgentLoop,
    pub memory: Option<Arc<dyn Memory>>,
    pub speech: Option<Arc<dyn Speech>>,
}

/// Wires provider, tools, memory and voice from config and environment.
///
/// Fails before any iteration runs when the provider key is missing or the
/// knowledge base file is malformed.
pub fn build_runtime(
    config: &Config,
    credentials: &Credentials,
    options: &RunOptions,
) -> Result<Runtime> {
    let provider = create_provider(config, credentials)?;

    let kb_path = options
        .knowledge_base
        .clone()
        .unwrap_or_else(|| config.knowledge_base_path());
    let knowledge_base = KnowledgeBaseTool::load(&kb_path)?;

    let mut registry = ToolRegistry::new().with_duplicate_policy(config.registry.on_duplicate);
    register_builtin_tools(&mut registry, knowledge_base)?;

    let context_builder = ContextBuilder::new().with_history_window(config.history_window);

    let mut agent = AgentLoop::new(provider, context_builder, Arc::new(registry), &config.model)
        .with_max_iterations(options.max_iterations.unwrap_or(config.max_iterations))
        .with_temperature(config.temperature)
        .with_reflection_temperature(config.reflection_temperature)
        .with_reflection(config.reflect && !options.no_reflect)
        .with_recall(config.memory.match_count, config.memory.match_threshold);

    let memory = create_memory(config, credentials);
    if let Some(ref memory) = memory {
        agent = agent.with_memory(memory.clone());
    }

    let speech = create_speech(config, credentials);

    info!(
        provider = %config.provider_name(),
        model = %config.model,
        memory = memory.is_some(),
        voice = speech.is_some(),
        "Runtime ready"
    );

    Ok(Runtime {
        agent,
        memory,
        speech,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spoar_core::error::ConfigError;
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir) -> Config {
        Config {
            knowledge_base: Some(tmp.path().join("kb.json")),
            ..Default::default()
        }
    }

    #[test]
    fn builds_with_only_the_provider_key() {
        let tmp = TempDir::new().unwrap();
        let creds = Credentials::from_pairs([("GROQ_API_KEY", "gsk-test")]);

        let runtime = build_runtime(&config_in(&tmp), &creds, &RunOptions::default()).unwrap();

        assert!(runtime.memory.is_none());
        assert!(runtime.speech.is_none());
        assert_eq!(runtime.agent.max_iterations(), 5);
        assert_eq!(
            runtime.agent.tool_registry().names(),
            vec!["calculate", "search", "search_knowledge_base"]
        );
    }

    #[test]
    fn command_line_overrides_config() {
        let tmp = TempDir::new().unwrap();
        let creds = Credentials::from_pairs([("GROQ_API_KEY", "gsk-test")]);
        let options = RunOptions {
            max_iterations: Some(9),
            ..Default::default()
        };

        let runtime = build_runtime(&config_in(&tmp), &creds, &options).unwrap();
        assert_eq!(runtime.agent.max_iterations(), 9);
    }

    #[test]
    fn missing_provider_key_fails_before_running() {
        let tmp = TempDir::new().unwrap();
        let err = build_runtime(
            &config_in(&tmp),
            &Credentials::default(),
            &RunOptions::default(),
        )
        .err()
        .unwrap();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn malformed_knowledge_base_is_reported() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        std::fs::write(config.knowledge_base.as_ref().unwrap(), "not json").unwrap();
        let creds = Credentials::from_pairs([("GROQ_API_KEY", "gsk-test")]);

        assert!(build_runtime(&config, &creds, &RunOptions::default()).is_err());
    }
}
