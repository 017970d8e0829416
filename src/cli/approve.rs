//! Approve or reject a stage artifact

use super::print_envelope;
use crate::router::{ApprovalRequest, Router};
use anyhow::Result;
use colored::Colorize;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    router: &Router,
    phase_id: &str,
    stage: &str,
    reject: bool,
    approver: Option<String>,
    comments: Option<String>,
    feedback: Vec<String>,
    json: bool,
) -> Result<bool> {
    let request = ApprovalRequest {
        phase_id: phase_id.to_string(),
        stage: stage.to_string(),
        approved: !reject,
        approver_id: approver,
        comments,
        feedback,
    };
    let envelope = router.handle_approval(request).await;
    let success = print_envelope(&envelope, json)?;

    if success && !json {
        if let Some(data) = &envelope.data {
            let status = data["outcome"]["status"].as_str().unwrap_or("");
            if status == "needs_revision" {
                let next = data["outcome"]["nextIteration"].as_u64().unwrap_or(0);
                println!(
                    "  {} '{}' needs revision (next iteration: {})",
                    "↺".yellow(),
                    stage,
                    next
                );
            } else if let Some(current) = data["currentStep"].as_str() {
                println!("  next stage: {}", current.cyan());
            } else if data["complete"] == true {
                println!("  🎉 all stages approved");
            }
        }
    }
    Ok(success)
}
