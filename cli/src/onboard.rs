use crate::templates::{SAMPLE_KNOWLEDGE_BASE, default_model};
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use spoar_core::config::{Config, Credentials, get_config_path};
use spoar_core::providers::required_env_keys;
use std::path::Path;

const BANNER: &str = r"
    -------------------------------------
      s p o a r
      sense · plan · act · observe · reflect
    -------------------------------------
";

const PROVIDERS: &[&str] = &["groq", "openai", "openrouter"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

/// Writes `content` to `path` unless the file already exists.
pub fn ensure_file(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

fn setup_provider() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your completion provider")
        .items(PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;
    Ok(PROVIDERS[selection].to_string())
}

fn setup_api_key(provider: &str, credentials: &Credentials) -> Result<String> {
    let env_keys = required_env_keys(provider)?;
    if credentials.first_of(env_keys).is_some() {
        println!(
            "  {} Using {} from the environment",
            style("✓").green(),
            style(env_keys.join(" / ")).cyan()
        );
        return Ok(String::new());
    }

    let api_key: String = Input::new()
        .with_prompt(format!(
            "API key (leave empty to set {} later)",
            env_keys.join(" or ")
        ))
        .allow_empty(true)
        .interact_text()
        .context("Failed to read API key")?;
    Ok(api_key.trim().to_string())
}

fn setup_model(provider: &str) -> Result<String> {
    let model: String = Input::new()
        .with_prompt("Model")
        .default(default_model(provider).to_string())
        .interact_text()
        .context("Failed to read model")?;
    Ok(model)
}

fn setup_max_iterations() -> Result<usize> {
    let max: usize = Input::new()
        .with_prompt("Maximum iterations per goal")
        .default(5)
        .validate_with(|n: &usize| {
            if *n == 0 {
                Err("must be at least 1")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read max iterations")?;
    Ok(max)
}

pub fn run_onboard(credentials: &Credentials) -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());
    println!("  {}", style("Welcome to spoar!").white().bold());
    println!(
        "  {}",
        style("This wizard writes ~/.spoar/config.toml and a sample knowledge base.").dim()
    );

    print_step(1, 4, "Provider");
    let provider = setup_provider()?;
    let api_key = setup_api_key(&provider, credentials)?;

    print_step(2, 4, "Model");
    let model = setup_model(&provider)?;

    print_step(3, 4, "Loop");
    let max_iterations = setup_max_iterations()?;

    let config = Config {
        provider: Some(provider),
        api_key,
        model,
        max_iterations,
        ..Default::default()
    };

    print_step(4, 4, "Knowledge Base");
    let kb_path = config.knowledge_base_path();
    match ensure_file(&kb_path, SAMPLE_KNOWLEDGE_BASE) {
        Ok(true) => println!(
            "  {} Sample knowledge base written to {}",
            style("✓").green(),
            style(kb_path.display()).cyan()
        ),
        Ok(false) => println!(
            "  {} Keeping existing knowledge base at {}",
            style("✓").green(),
            style(kb_path.display()).cyan()
        ),
        Err(e) => eprintln!(
            "  {} Warning: Could not write knowledge base: {}",
            style("!").yellow(),
            e
        ),
    }

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(get_config_path().display()).cyan()
    );
    println!(
        "  {} Optional: set SUPABASE_URL, SUPABASE_KEY and OPENAI_API_KEY for long-term memory, ELEVENLABS_API_KEY for voice",
        style("→").green()
    );
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("spoar run \"What is 25 * 4 + 100?\"").cyan().bold()
    );
    println!();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_file_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("kb.json");

        assert!(ensure_file(&path, "[]").unwrap());
        assert!(!ensure_file(&path, "[{}]").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
