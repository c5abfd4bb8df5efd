use anyhow::Result;
use console::style;
use spoar_core::agent::{
    IterationRecord, Plan, RunJournal, RunOutcome, StopReason, default_log_path,
};
use std::path::{Path, PathBuf};
use termimad::MadSkin;

fn describe_step(record: &IterationRecord) -> String {
    match &record.plan {
        Plan::UseTool { tool, args, .. } => {
            let status = match &record.observation {
                Some(obs) if obs.success() => style("ok").green().to_string(),
                Some(_) => style("failed").red().to_string(),
                None => String::new(),
            };
            format!(
                "{} {}({}) {}",
                style("tool").cyan(),
                tool,
                serde_json::Value::Object(args.clone()),
                status
            )
        }
        Plan::Complete { .. } => style("complete").green().to_string(),
        Plan::Clarify { .. } => style("clarify").yellow().to_string(),
        Plan::Unparseable { reason, .. } => {
            format!("{} ({})", style("unparseable").yellow(), reason)
        }
    }
}

pub fn reason_label(reason: StopReason) -> String {
    match reason {
        StopReason::Completed => style("completed").green().bold().to_string(),
        StopReason::MaxIterations => style("max iterations reached").yellow().bold().to_string(),
        StopReason::ClarifyRequested => style("needs clarification").yellow().bold().to_string(),
    }
}

pub fn print_outcome(outcome: &RunOutcome) {
    println!();
    for record in &outcome.records {
        println!(
            "  {} {}",
            style(format!("[{}]", record.iteration)).dim(),
            describe_step(record)
        );
        if let Some(obs) = &record.observation {
            let summary = obs.result.summary();
            let first_line = summary.lines().next().unwrap_or_default();
            println!("      {} {}", style("→").dim(), style(first_line).dim());
        }
        if let Some(reflection) = &record.reflection {
            println!("      {} {}", style("↺").dim(), style(reflection).italic());
        }
    }

    println!();
    println!(
        "  {} after {} iteration(s)",
        reason_label(outcome.reason),
        outcome.iterations
    );
    println!();

    let skin = MadSkin::default();
    println!("{}", skin.term_text(&outcome.answer));
}

/// Writes the run's phase log under `log_dir` and returns the file path.
pub fn save_journal(journal: &RunJournal, log_dir: &Path) -> Result<PathBuf> {
    let path = default_log_path(log_dir);
    journal.write_jsonl(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spoar_core::agent::Phase;
    use tempfile::TempDir;

    #[test]
    fn journal_lands_in_the_log_dir() {
        let tmp = TempDir::new().unwrap();
        let mut journal = RunJournal::new();
        journal.record(Phase::Stop, 1, json!({"reason": "completed"}));

        let path = save_journal(&journal, &tmp.path().join("logs")).unwrap();

        assert!(path.starts_with(tmp.path()));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
