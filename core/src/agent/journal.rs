//! Per-run log of every SPOAR phase, written as JSON lines.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

const PREVIEW_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Sense,
    Plan,
    Act,
    Observe,
    Reflect,
    Complete,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Sense => "SENSE",
            Phase::Plan => "PLAN",
            Phase::Act => "ACT",
            Phase::Observe => "OBSERVE",
            Phase::Reflect => "REFLECT",
            Phase::Complete => "COMPLETE",
            Phase::Stop => "STOP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseEntry {
    pub run_id: String,
    pub phase: Phase,
    pub iteration: usize,
    pub data: Value,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct RunJournal {
    run_id: String,
    entries: Vec<PhaseEntry>,
}

impl Default for RunJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl RunJournal {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            entries: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Appends an entry and mirrors it as a tracing event.
    pub fn record(&mut self, phase: Phase, iteration: usize, data: impl Serialize) {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        let preview: String = data.to_string().chars().take(PREVIEW_MAX_CHARS).collect();
        info!(run_id = %self.run_id, phase = %phase, iteration, "{}", preview);

        self.entries.push(PhaseEntry {
            run_id: self.run_id.clone(),
            phase,
            iteration,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }

    pub fn entries(&self) -> &[PhaseEntry] {
        &self.entries
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.entries.iter().map(|e| e.phase).collect()
    }

    /// Appends one JSON object per entry to `path`, creating parent
    /// directories as needed.
    pub fn write_jsonl(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open run log: {}", path.display()))?;

        for entry in &self.entries {
            let line = serde_json::to_string(entry).context("Failed to serialize log entry")?;
            writeln!(file, "{}", line)
                .with_context(|| format!("Failed to write run log: {}", path.display()))?;
        }
        Ok(())
    }
}

/// `run_<unix seconds>.jsonl` inside `dir`.
pub fn default_log_path(dir: &Path) -> PathBuf {
    dir.join(format!("run_{}.jsonl", chrono::Utc::now().timestamp()))
}
