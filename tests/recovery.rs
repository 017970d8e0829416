//! Corruption detection and backup recovery end to end

use phased::models::{PhaseId, WorkflowConfig};
use phased::router::{ApprovalRequest, Command, CommandOptions, Router};
use phased::store::{FileStateStore, StateStore};
use std::sync::Arc;
use tempfile::TempDir;

fn state_path(root: &std::path::Path, phase: &str) -> std::path::PathBuf {
    root.join("state").join(format!("{}.json", phase))
}

#[tokio::test]
async fn corruption_roundtrip_detect_then_fail_closed() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FileStateStore::new(temp.path()));
    let router = Router::with_defaults(store.clone(), WorkflowConfig::default());
    let phase = "06-test";
    let id = PhaseId::parse(phase).unwrap();

    // Write valid state through the router
    let envelope = router.handle(Command::Spec, phase, CommandOptions::default()).await;
    assert!(envelope.success);
    assert!(!store.detect_corruption(&id).await.corrupted);

    // Corrupt on disk
    std::fs::write(state_path(temp.path(), phase), "{{{").unwrap();

    let report = store.detect_corruption(&id).await;
    assert!(report.corrupted);
    assert!(!report.errors.is_empty());

    // Every subsequent command fails closed with CorruptState; no
    // half-parsed state leaks into a success envelope
    let envelope = router
        .handle(Command::Research, phase, CommandOptions::default())
        .await;
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind, Some("CorruptState"));

    let envelope = router
        .handle_approval(ApprovalRequest {
            phase_id: phase.to_string(),
            stage: "spec".to_string(),
            approved: true,
            approver_id: None,
            comments: None,
            feedback: Vec::new(),
        })
        .await;
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind, Some("CorruptState"));
}

#[tokio::test]
async fn restore_recovers_latest_snapshot_after_corruption() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FileStateStore::new(temp.path()));
    let router = Router::with_defaults(store.clone(), WorkflowConfig::default());
    let phase = "06-test";
    let id = PhaseId::parse(phase).unwrap();

    // Two saves so a snapshot of approved-spec state exists
    router.handle(Command::Spec, phase, CommandOptions::default()).await;
    let envelope = router
        .handle_approval(ApprovalRequest {
            phase_id: phase.to_string(),
            stage: "spec".to_string(),
            approved: true,
            approver_id: None,
            comments: None,
            feedback: Vec::new(),
        })
        .await;
    assert!(envelope.success);
    router
        .handle(Command::Research, phase, CommandOptions::default())
        .await;

    std::fs::write(state_path(temp.path(), phase), "garbage").unwrap();

    let restored = store.restore_from_backup(&id).await.unwrap();
    // Newest snapshot predates the research save: spec already approved
    assert!(restored.approvals.is_approved(phased::Stage::Spec));

    // The workflow is usable again
    let envelope = router
        .handle(Command::Research, phase, CommandOptions::default())
        .await;
    assert!(envelope.success, "{:?}", envelope.error);
}

#[tokio::test]
async fn schema_invalid_state_is_corrupt_not_parsed() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FileStateStore::new(temp.path()));
    let id = PhaseId::parse("06-test").unwrap();
    let state = store.load(&id).await.unwrap();
    store.save(&id, &state).await.unwrap();

    // Valid JSON, invalid shape: completedSteps holds an unknown stage
    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(state_path(temp.path(), "06-test")).unwrap())
            .unwrap();
    doc["completedSteps"] = serde_json::json!(["deploy"]);
    std::fs::write(
        state_path(temp.path(), "06-test"),
        serde_json::to_string(&doc).unwrap(),
    )
    .unwrap();

    let report = store.detect_corruption(&id).await;
    assert!(report.corrupted);
    assert!(matches!(
        store.load_existing(&id).await,
        Err(phased::PhasedError::CorruptState { .. })
    ));
}
