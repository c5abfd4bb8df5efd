use crate::config::{Config, Credentials};
use crate::memory::SupabaseMemory;
use crate::providers::OpenAIEmbedder;
use crate::traits::Memory;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Environment variables long-term memory needs.
pub const MEMORY_ENV_KEYS: &[&str] = &["SUPABASE_URL", "SUPABASE_KEY", "OPENAI_API_KEY"];

/// Long-term memory is optional: `None` when disabled in config or when any
/// of its credentials are missing.
pub fn create_memory(config: &Config, credentials: &Credentials) -> Option<Arc<dyn Memory>> {
    if !config.memory.enabled {
        return None;
    }

    let missing: Vec<&str> = MEMORY_ENV_KEYS
        .iter()
        .copied()
        .filter(|key| !credentials.has(key))
        .collect();
    if !missing.is_empty() {
        warn!(missing = %missing.join(", "), "Long-term memory disabled");
        return None;
    }

    let url = credentials.get("SUPABASE_URL")?;
    let key = credentials.get("SUPABASE_KEY")?;
    let openai_key = credentials.get("OPENAI_API_KEY")?;
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));

    let embedder = OpenAIEmbedder::new(openai_key)
        .with_model(&config.memory.embedding_model)
        .with_timeout(timeout);

    Some(Arc::new(
        SupabaseMemory::new(url, key, Arc::new(embedder), config.memory.clone())
            .with_timeout(timeout),
    ))
}
