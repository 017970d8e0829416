//! Run a workflow stage command for a phase

use super::print_envelope;
use crate::router::{Command, CommandOptions, Router};
use anyhow::Result;
use colored::Colorize;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    router: &Router,
    command: Command,
    phase_id: &str,
    payload: Option<String>,
    changes: Option<String>,
    dependencies: Option<Vec<String>>,
    json: bool,
) -> Result<bool> {
    let options = CommandOptions {
        payload,
        changes,
        dependencies,
    };
    let envelope = router.handle(command, phase_id, options).await;
    let success = print_envelope(&envelope, json)?;

    if success && !json {
        if let Some(data) = &envelope.data {
            if let Some(artifact) = data["artifactRef"].as_str() {
                println!("  artifact: {}", artifact.cyan());
            }
            if let Some(iteration) = data["iteration"].as_u64() {
                println!("  iteration: {}", iteration);
            }
            if let Some(cascaded) = data["cascaded"].as_array() {
                if !cascaded.is_empty() {
                    let names: Vec<&str> =
                        cascaded.iter().filter_map(|s| s.as_str()).collect();
                    println!(
                        "  {} downstream flagged for re-validation: {}",
                        "⚠".yellow(),
                        names.join(", ")
                    );
                }
            }
        }
    }
    Ok(success)
}
