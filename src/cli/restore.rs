//! Restore a phase's state from its newest usable backup

use crate::error::PhasedError;
use crate::models::PhaseId;
use crate::store::StateStore;
use anyhow::Result;
use colored::Colorize;

pub async fn run(store: &dyn StateStore, phase_id: &str, json: bool) -> Result<bool> {
    let id = PhaseId::parse(phase_id)?;
    match store.restore_from_backup(&id).await {
        Ok(state) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!(
                    "{} restored '{}' (current step: {})",
                    "✓".green().bold(),
                    id,
                    state
                        .current_step
                        .map(|s| s.name())
                        .unwrap_or("complete")
                        .cyan()
                );
            }
            Ok(true)
        }
        Err(e @ PhasedError::Recovery { .. }) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "error": e.to_string(), "errorKind": e.kind() })
                );
            } else {
                println!("{} {}", "✗".red().bold(), e.to_string().red());
            }
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
