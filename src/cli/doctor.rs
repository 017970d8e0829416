//! Probe persisted state for corruption

use crate::models::PhaseId;
use crate::store::StateStore;
use anyhow::Result;
use colored::Colorize;

pub async fn run(store: &dyn StateStore, phase_id: Option<String>, json: bool) -> Result<bool> {
    let ids = match phase_id {
        Some(raw) => vec![PhaseId::parse(&raw)?],
        None => store.list().await?,
    };

    if ids.is_empty() {
        if !json {
            println!("no phases found");
        }
        return Ok(true);
    }

    let mut healthy = true;
    let mut reports = Vec::new();
    for id in &ids {
        let report = store.detect_corruption(id).await;
        if report.corrupted {
            healthy = false;
        }
        if json {
            reports.push(serde_json::json!({
                "phase": id.to_string(),
                "corrupted": report.corrupted,
                "errors": report.errors,
            }));
        } else if report.corrupted {
            println!("{} {} corrupt", "✗".red().bold(), id);
            for error in &report.errors {
                println!("    {}", error.red());
            }
            println!(
                "    run {} to recover from the latest snapshot",
                format!("phased restore {}", id).cyan()
            );
        } else {
            println!("{} {}", "✓".green(), id);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(healthy)
}
