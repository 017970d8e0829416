//! Show the workflow status of a phase

use super::print_envelope;
use crate::models::Stage;
use crate::router::{Command, CommandOptions, Router};
use anyhow::Result;
use colored::Colorize;

pub async fn run(router: &Router, phase_id: &str, json: bool) -> Result<bool> {
    let envelope = router
        .handle(Command::Status, phase_id, CommandOptions::default())
        .await;

    if json {
        return print_envelope(&envelope, true);
    }
    if !envelope.success {
        return print_envelope(&envelope, false);
    }

    let Some(data) = envelope.data.as_ref() else {
        anyhow::bail!("status for '{}' returned no data", phase_id);
    };
    let title = data["phaseTitle"].as_str().unwrap_or("");
    let progress = data["progress"].as_u64().unwrap_or(0);
    println!(
        "{} {} ({}%)",
        phase_id.bold(),
        title.dimmed(),
        progress
    );

    let completed: Vec<&str> = data["completedSteps"]
        .as_array()
        .map(|a| a.iter().filter_map(|s| s.as_str()).collect())
        .unwrap_or_default();
    let current = data["currentStep"].as_str();
    let revalidate: Vec<&str> = data["needsRevalidation"]
        .as_array()
        .map(|a| a.iter().filter_map(|s| s.as_str()).collect())
        .unwrap_or_default();

    for entry in data["stages"].as_array().into_iter().flatten() {
        let name = entry["stage"].as_str().unwrap_or("");
        let iteration = entry["iteration"].as_u64().unwrap_or(0);
        let emoji = Stage::parse(name).map(|s| s.emoji()).unwrap_or("");

        let marker = if completed.contains(&name) {
            "✓".green().to_string()
        } else if current == Some(name) {
            "→".cyan().bold().to_string()
        } else {
            "·".dimmed().to_string()
        };
        let mut line = format!("  {} {} {}", marker, emoji, name);
        if iteration > 1 {
            line.push_str(&format!(" (iteration {})", iteration));
        }
        if revalidate.contains(&name) {
            line.push_str(&format!(" {}", "needs re-validation".yellow()));
        }
        println!("{}", line);
    }

    if let Some(blockers) = data["blockers"].as_array() {
        for blocker in blockers {
            if let Some(description) = blocker["description"].as_str() {
                println!("  ⛔ {}", description.red());
            }
        }
    }

    if data["complete"] == true {
        println!("  ✅ phase complete");
    }
    Ok(true)
}
