use crate::agent::DuplicatePolicy;
use crate::providers::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const SPOAR_DIR: &str = ".spoar";

/// Environment variables the agent knows how to use.
pub const KNOWN_ENV_KEYS: &[&str] = &[
    "GROQ_API_KEY",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
    "SUPABASE_URL",
    "SUPABASE_KEY",
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_VOICE_ID",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub match_count: usize,
    pub match_threshold: f64,
    pub duplicate_threshold: f64,
    pub embedding_model: String,
    pub table: String,
    pub match_function: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            match_count: 3,
            match_threshold: 0.75,
            duplicate_threshold: 0.90,
            embedding_model: "text-embedding-3-small".to_string(),
            table: "memories".to_string(),
            match_function: "match_memories".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub voice_id: String,
    pub model_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
    pub chunk_size: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_turbo_v2_5".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
            chunk_size: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RegistryConfig {
    pub on_duplicate: DuplicatePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub reflection_temperature: f64,
    pub max_iterations: usize,
    pub history_window: usize,
    pub reflect: bool,
    pub request_timeout_secs: u64,
    pub knowledge_base: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub registry: RegistryConfig,
    pub memory: MemoryConfig,
    pub voice: VoiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.0,
            reflection_temperature: 0.3,
            max_iterations: 5,
            history_window: 5,
            reflect: true,
            request_timeout_secs: 60,
            knowledge_base: None,
            log_dir: None,
            retry: RetryPolicy::default(),
            registry: RegistryConfig::default(),
            memory: MemoryConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or("groq")
    }

    pub fn knowledge_base_path(&self) -> PathBuf {
        self.knowledge_base
            .clone()
            .unwrap_or_else(|| get_spoar_dir().join("knowledge_base.json"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| get_spoar_dir().join("logs"))
    }
}

/// Service credentials read from the environment.
///
/// Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    vars: HashMap<String, String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_pairs(
            KNOWN_ENV_KEYS
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (*key, value))),
        )
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }
}

pub fn get_spoar_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(SPOAR_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_spoar_dir().join("config.toml")
}

pub fn ensure_spoar_dir() -> Result<PathBuf> {
    let spoar_dir = get_spoar_dir();

    if !spoar_dir.exists() {
        std::fs::create_dir_all(&spoar_dir).with_context(|| {
            format!(
                "Failed to create spoar directory at {}",
                spoar_dir.display()
            )
        })?;
    }

    Ok(spoar_dir)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'spoar onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_spoar_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
provider = "openai"
model = "gpt-4o-mini"
max_iterations = 8

[memory]
match_threshold = 0.8

[registry]
on_duplicate = "replace"
"#,
        )
        .unwrap();

        assert_eq!(config.provider_name(), "openai");
        assert_eq!(config.max_iterations, 8);
        assert_eq!(config.memory.match_threshold, 0.8);
        assert_eq!(config.memory.match_count, 3);
        assert_eq!(config.registry.on_duplicate, DuplicatePolicy::Replace);
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.reflect);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = parse_config(&text).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.voice, config.voice);
        assert_eq!(parsed.provider_name(), "groq");
    }

    #[test]
    fn credentials_ignore_blank_values() {
        let creds = Credentials::from_pairs([("GROQ_API_KEY", "  "), ("OPENAI_API_KEY", "sk-1")]);
        assert!(!creds.has("GROQ_API_KEY"));
        assert_eq!(
            creds.first_of(&["GROQ_API_KEY", "OPENAI_API_KEY"]),
            Some("sk-1")
        );
    }
}
