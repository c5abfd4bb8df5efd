use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use futures_util::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use spoar_core::config::{self, Config, Credentials};
use spoar_core::traits::Speech;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

mod doctor;
mod onboard;
mod report;
mod runtime;
mod telemetry;
mod templates;

use runtime::{RunOptions, Runtime, build_runtime};

const DEFAULT_GOAL: &str = "What is 25 * 4 + 100?";

#[derive(Parser)]
#[command(name = "spoar")]
#[command(about = "spoar - a sense/plan/act/observe/reflect agent loop", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent once on a goal
    Run {
        #[arg(default_value = DEFAULT_GOAL)]
        goal: String,

        #[arg(long)]
        max_iterations: Option<usize>,

        /// Skip the REFLECT phase
        #[arg(long)]
        no_reflect: bool,

        /// JSON file of {title, content} documents
        #[arg(long)]
        knowledge_base: Option<PathBuf>,

        /// Synthesize the answer to this audio file (needs ELEVENLABS_API_KEY)
        #[arg(long)]
        speak: Option<PathBuf>,
    },
    /// Interactive prompt, one run per line
    Chat {
        #[arg(long)]
        max_iterations: Option<usize>,

        #[arg(long)]
        no_reflect: bool,
    },
    Onboard,
    /// Check configuration, credentials and the memory store
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(&cli.log_level, cli.log_json);

    let credentials = Credentials::from_env();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat {
                max_iterations: None,
                no_reflect: false,
            }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard(&credentials).map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Doctor => {
            let config = Config::load_or_init()?;
            if !doctor::run_doctor(&config, &credentials).await {
                anyhow::bail!("Required configuration is missing");
            }
        }
        Commands::Run {
            goal,
            max_iterations,
            no_reflect,
            knowledge_base,
            speak,
        } => {
            let config = Config::load_or_init()?;
            let options = RunOptions {
                max_iterations,
                no_reflect,
                knowledge_base,
            };
            let runtime = start(&config, &credentials, &options)?;
            let answer = run_goal(&runtime, &config, &goal).await?;

            if let Some(path) = speak {
                match &runtime.speech {
                    Some(speech) => {
                        speak_to_file(&**speech, &answer, &path).await?;
                        println!(
                            "  {} Audio written to {}",
                            style("♪").green(),
                            style(path.display()).cyan()
                        );
                    }
                    None => eprintln!(
                        "  {} Voice disabled: set ELEVENLABS_API_KEY to use --speak",
                        style("!").yellow()
                    ),
                }
            }
        }
        Commands::Chat {
            max_iterations,
            no_reflect,
        } => {
            let config = Config::load_or_init()?;
            let options = RunOptions {
                max_iterations,
                no_reflect,
                knowledge_base: None,
            };
            let runtime = start(&config, &credentials, &options)?;
            chat(&runtime, &config).await?;
        }
    }

    Ok(())
}

fn start(config: &Config, credentials: &Credentials, options: &RunOptions) -> Result<Runtime> {
    build_runtime(config, credentials, options).map_err(|e| {
        eprintln!("❌ Error: {}", e);
        eprintln!("Run 'spoar doctor' to check your setup.");
        e
    })
}

async fn run_goal(runtime: &Runtime, config: &Config, goal: &str) -> Result<String> {
    println!("\n{} {}", style("🎯").bold(), style(goal).bold());

    let outcome = runtime.agent.run(goal).await.map_err(|e| {
        eprintln!("❌ Error: {:#}", e);
        e
    })?;

    report::print_outcome(&outcome);

    match report::save_journal(&outcome.journal, &config.log_dir()) {
        Ok(path) => println!(
            "  {} Run log: {}",
            style("→").dim(),
            style(path.display()).dim()
        ),
        Err(e) => warn!(error = %e, "Failed to write run log"),
    }

    Ok(outcome.answer)
}

async fn chat(runtime: &Runtime, config: &Config) -> Result<()> {
    println!("{}", style("spoar").cyan().bold());
    if runtime.memory.is_none() {
        println!("{}", style("Long-term memory is off, see 'spoar doctor'.").dim());
    }
    println!("Type a goal (Ctrl+D to exit):\n");

    let history_path = config::get_spoar_dir().join("history.txt");
    let mut editor = DefaultEditor::new()?;
    let _ = editor.load_history(&history_path);

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let goal = line.trim();
                if goal.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(goal);

                // A failed run ends that goal, not the session.
                if let Err(e) = run_goal(runtime, config, goal).await {
                    warn!(error = %e, "Run failed");
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if config::ensure_spoar_dir().is_ok()
        && let Err(e) = editor.save_history(&history_path)
    {
        warn!(error = %e, "Failed to save chat history");
    }
    Ok(())
}

async fn speak_to_file(speech: &dyn Speech, text: &str, path: &Path) -> Result<()> {
    let mut stream = speech.synthesize_stream(text).await?;
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
