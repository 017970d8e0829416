//! CLI command handlers
//!
//! Thin wrappers over the router: parse arguments, call, render. Machine
//! output (`--json`) prints the envelope verbatim; human output goes through
//! `colored`.

pub mod approve;
pub mod doctor;
pub mod restore;
pub mod stage;
pub mod status;

use crate::router::Envelope;
use anyhow::Result;
use colored::Colorize;

/// Print an envelope; exits nonzero upstream when `success` is false
pub(crate) fn print_envelope(envelope: &Envelope, json: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(envelope)?);
        return Ok(envelope.success);
    }

    if envelope.success {
        println!(
            "{} {} '{}'",
            "✓".green().bold(),
            envelope.context.operation,
            envelope.context.phase_id
        );
    } else {
        let kind = envelope.error_kind.unwrap_or("Error");
        println!(
            "{} {} '{}' failed [{}]",
            "✗".red().bold(),
            envelope.context.operation,
            envelope.context.phase_id,
            kind.yellow()
        );
        if let Some(error) = &envelope.error {
            println!("  {}", error.red());
        }
    }
    Ok(envelope.success)
}
