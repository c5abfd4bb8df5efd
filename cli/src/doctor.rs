use console::style;
use spoar_core::config::{Config, Credentials, config_exists, get_config_path};
use spoar_core::memory::{MEMORY_ENV_KEYS, create_memory};
use spoar_core::providers::required_env_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub status: Status,
    pub detail: String,
}

impl Check {
    fn new(name: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

/// Configuration and credential checks that need no network access.
pub fn static_checks(config: &Config, credentials: &Credentials) -> Vec<Check> {
    let mut checks = Vec::new();

    checks.push(if config_exists() {
        Check::new("config", Status::Ok, get_config_path().display().to_string())
    } else {
        Check::new("config", Status::Warn, "not found, using defaults")
    });

    let provider = config.provider_name();
    checks.push(match required_env_keys(provider) {
        Ok(keys) if credentials.first_of(keys).is_some() => Check::new(
            format!("provider ({provider})"),
            Status::Ok,
            format!("{} set", keys.join(" / ")),
        ),
        Ok(_) if !config.api_key.trim().is_empty() => Check::new(
            format!("provider ({provider})"),
            Status::Ok,
            "api_key from config file",
        ),
        Ok(keys) => Check::new(
            format!("provider ({provider})"),
            Status::Fail,
            format!("{} missing", keys.join(" or ")),
        ),
        Err(e) => Check::new("provider", Status::Fail, e.to_string()),
    });

    let missing: Vec<&str> = MEMORY_ENV_KEYS
        .iter()
        .copied()
        .filter(|k| !credentials.has(k))
        .collect();
    checks.push(if !config.memory.enabled {
        Check::new("memory", Status::Warn, "disabled in config")
    } else if missing.is_empty() {
        Check::new("memory", Status::Ok, "credentials set")
    } else {
        Check::new(
            "memory",
            Status::Warn,
            format!("disabled, missing {}", missing.join(", ")),
        )
    });

    checks.push(if credentials.has("ELEVENLABS_API_KEY") {
        Check::new("voice", Status::Ok, "ELEVENLABS_API_KEY set")
    } else {
        Check::new("voice", Status::Warn, "disabled, ELEVENLABS_API_KEY missing")
    });

    let kb_path = config.knowledge_base_path();
    checks.push(if kb_path.exists() {
        Check::new("knowledge base", Status::Ok, kb_path.display().to_string())
    } else {
        Check::new(
            "knowledge base",
            Status::Warn,
            format!("{} not found, search_knowledge_base will be empty", kb_path.display()),
        )
    });

    checks
}

fn print_check(check: &Check) {
    let marker = match check.status {
        Status::Ok => style("✓").green(),
        Status::Warn => style("!").yellow(),
        Status::Fail => style("✗").red(),
    };
    println!(
        "  {} {:<18} {}",
        marker,
        check.name,
        style(&check.detail).dim()
    );
}

/// Prints every check and returns `false` when a required one failed.
pub async fn run_doctor(config: &Config, credentials: &Credentials) -> bool {
    println!();
    println!("{}", style("spoar doctor").cyan().bold());
    println!();

    let mut checks = static_checks(config, credentials);

    if let Some(memory) = create_memory(config, credentials) {
        checks.push(if memory.health_check().await {
            Check::new("memory store", Status::Ok, "reachable")
        } else {
            Check::new("memory store", Status::Warn, "unreachable, runs continue without memory")
        });
    }

    for check in &checks {
        print_check(check);
    }
    println!();

    !checks.iter().any(|c| c.status == Status::Fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(checks: &[Check], prefix: &str) -> Status {
        checks
            .iter()
            .find(|c| c.name.starts_with(prefix))
            .map(|c| c.status)
            .unwrap()
    }

    #[test]
    fn missing_provider_key_fails() {
        let checks = static_checks(&Config::default(), &Credentials::default());
        assert_eq!(status_of(&checks, "provider"), Status::Fail);
        assert_eq!(status_of(&checks, "memory"), Status::Warn);
        assert_eq!(status_of(&checks, "voice"), Status::Warn);
    }

    #[test]
    fn optional_keys_only_warn() {
        let creds = Credentials::from_pairs([("GROQ_API_KEY", "gsk")]);
        let checks = static_checks(&Config::default(), &creds);
        assert_eq!(status_of(&checks, "provider"), Status::Ok);
        assert!(checks.iter().all(|c| c.status != Status::Fail));
    }

    #[test]
    fn config_api_key_satisfies_provider() {
        let config = Config {
            api_key: "sk-from-file".to_string(),
            ..Default::default()
        };
        let checks = static_checks(&config, &Credentials::default());
        assert_eq!(status_of(&checks, "provider"), Status::Ok);
    }
}
