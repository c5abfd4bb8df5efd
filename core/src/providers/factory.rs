use crate::config::{Config, Credentials};
use crate::error::ConfigError;
use crate::providers::{ElevenLabsVoice, OpenAIProvider, RetryingProvider};
use crate::traits::{Provider, Speech};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

struct Preset {
    name: &'static str,
    env_keys: &'static [&'static str],
    base_url: &'static str,
}

const PRESETS: &[Preset] = &[
    Preset {
        name: "groq",
        env_keys: &["GROQ_API_KEY"],
        base_url: "https://api.groq.com/openai/v1",
    },
    Preset {
        name: "openai",
        env_keys: &["OPENAI_API_KEY"],
        base_url: "https://api.openai.com/v1",
    },
    Preset {
        name: "openrouter",
        env_keys: &["OPENROUTER_API_KEY"],
        base_url: "https://openrouter.ai/api/v1",
    },
];

fn preset(name: &str) -> Result<&'static Preset, ConfigError> {
    let lowered = name.to_lowercase();
    PRESETS
        .iter()
        .find(|p| p.name == lowered)
        .ok_or_else(|| ConfigError::UnknownProvider(name.to_string()))
}

/// The environment variables that can supply the key for `provider`.
pub fn required_env_keys(provider: &str) -> Result<&'static [&'static str], ConfigError> {
    preset(provider).map(|p| p.env_keys)
}

/// Builds the completion provider, failing fast when its key is missing.
pub fn create_provider(config: &Config, credentials: &Credentials) -> Result<Arc<dyn Provider>> {
    let preset = preset(config.provider_name())?;
    let api_key = resolve_api_key_with_fallback(preset, credentials, &config.api_key)?;
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));

    let provider = OpenAIProvider::new(api_key)
        .with_name(preset.name)
        .with_base_url(config.base_url.as_deref().unwrap_or(preset.base_url))
        .with_timeout(timeout);

    Ok(Arc::new(RetryingProvider::new(
        Arc::new(provider),
        config.retry,
        // Give the HTTP client's own timeout a moment to surface first.
        timeout + Duration::from_secs(5),
    )))
}

/// Text-to-speech is optional: `None` when `ELEVENLABS_API_KEY` is absent.
pub fn create_speech(config: &Config, credentials: &Credentials) -> Option<Arc<dyn Speech>> {
    let api_key = credentials.get("ELEVENLABS_API_KEY")?;
    let mut voice = ElevenLabsVoice::new(api_key, config.voice.clone());
    if let Some(voice_id) = credentials.get("ELEVENLABS_VOICE_ID") {
        voice = voice.with_voice_id(voice_id);
    }
    Some(Arc::new(voice))
}

fn resolve_api_key_with_fallback(
    preset: &Preset,
    credentials: &Credentials,
    config_key: &str,
) -> Result<String, ConfigError> {
    if let Some(key) = credentials.first_of(preset.env_keys) {
        return Ok(key.to_string());
    }
    if !config_key.trim().is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(ConfigError::MissingKey {
            provider: preset.name.to_string(),
            vars: preset.env_keys.join(" or "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_key_fails_fast() {
        let err = create_provider(&Config::default(), &Credentials::default())
            .err()
            .unwrap();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_err, ConfigError::MissingKey { .. }));
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn env_key_builds_provider() {
        let creds = Credentials::from_pairs([("GROQ_API_KEY", "gsk-test")]);
        let provider = create_provider(&Config::default(), &creds).unwrap();
        assert_eq!(provider.name(), "groq");
    }

    #[test]
    fn config_key_is_a_fallback() {
        let config = Config {
            provider: Some("OpenRouter".to_string()),
            api_key: "sk-or".to_string(),
            ..Default::default()
        };
        let provider = create_provider(&config, &Credentials::default()).unwrap();
        assert_eq!(provider.name(), "openrouter");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = Config {
            provider: Some("carrier-pigeon".to_string()),
            ..Default::default()
        };
        let err = create_provider(&config, &Credentials::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn speech_requires_its_key() {
        let config = Config::default();
        assert!(create_speech(&config, &Credentials::default()).is_none());
        let creds = Credentials::from_pairs([("ELEVENLABS_API_KEY", "xi")]);
        assert!(create_speech(&config, &creds).is_some());
    }
}
