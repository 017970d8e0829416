//! End-to-end workflow scenarios through the router

use phased::audit::{AuditEntry, AuditSink};
use phased::models::{DependencyGate, PhaseId, Stage, WorkflowConfig};
use phased::router::{ApprovalRequest, Command, CommandOptions, Router};
use phased::store::{FileStateStore, MemoryStateStore, StateStore};
use phased::ReferenceGenerator;
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn approval(phase: &str, stage: &str, approved: bool, feedback: Vec<&str>) -> ApprovalRequest {
    ApprovalRequest {
        phase_id: phase.to_string(),
        stage: stage.to_string(),
        approved,
        approver_id: Some("reviewer".to_string()),
        comments: None,
        feedback: feedback.into_iter().map(String::from).collect(),
    }
}

async fn run_stage(router: &Router, command: Command, phase: &str) -> serde_json::Value {
    let envelope = router.handle(command, phase, CommandOptions::default()).await;
    assert!(envelope.success, "{:?} failed: {:?}", command, envelope.error);
    envelope.data.unwrap()
}

/// Scenario A: iterate on research, then move on to plan
#[tokio::test]
async fn scenario_a_rejection_loop_then_plan() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(FileStateStore::new(temp.path()));
    let router = Router::with_defaults(store.clone(), WorkflowConfig::default());
    let phase = "06-test";

    run_stage(&router, Command::Spec, phase).await;
    let envelope = router.handle_approval(approval(phase, "spec", true, vec![])).await;
    assert!(envelope.success);

    run_stage(&router, Command::Research, phase).await;

    // Reject research with feedback: iteration advances, stage does not
    let envelope = router
        .handle_approval(approval(phase, "research", false, vec!["expand sources"]))
        .await;
    assert!(envelope.success);
    let data = envelope.data.unwrap();
    assert_eq!(data["outcome"]["status"], "needs_revision");
    assert_eq!(data["outcome"]["nextIteration"], 2);
    assert_eq!(data["currentStep"], "research");

    let state = store.load(&PhaseId::parse(phase).unwrap()).await.unwrap();
    assert_eq!(state.iterations.get(Stage::Research), 2);
    assert_eq!(
        state.approvals.get(Stage::Research).unwrap().feedback,
        vec!["expand sources".to_string()]
    );

    // Approve the revised research at iteration 2
    let envelope = router
        .handle_approval(approval(phase, "research", true, vec![]))
        .await;
    let data = envelope.data.unwrap();
    assert_eq!(data["outcome"]["record"]["iteration"], 2);
    assert_eq!(data["progress"], 50);

    // Plan is now unlocked
    let data = run_stage(&router, Command::Plan, phase).await;
    assert_eq!(data["currentStep"], "plan");
    assert_eq!(data["completedSteps"], json!(["spec", "research"]));
}

/// Scenario B: dependency with zero completed steps stays missing
#[tokio::test]
async fn scenario_b_unsatisfied_dependency() {
    let store = Arc::new(MemoryStateStore::new());
    let router = Router::with_defaults(store.clone(), WorkflowConfig::default());

    // 05-y exists but has completed nothing
    let empty = phased::models::PhaseState::new(PhaseId::parse("05-y").unwrap(), Vec::new());
    store.insert(&empty);

    let options = CommandOptions {
        dependencies: Some(vec!["05-y".to_string()]),
        ..Default::default()
    };
    let envelope = router.handle(Command::Spec, "06-x", options).await;
    assert!(envelope.success); // informational gate by default
    let data = envelope.data.unwrap();
    assert_eq!(data["dependencies"]["satisfied"], false);
    assert_eq!(data["dependencies"]["missing"], json!(["05-y"]));
}

/// Ordering invariant: completedSteps is always a prefix of the canonical
/// order, and research can never be approved while spec is not
#[tokio::test]
async fn ordering_invariant_holds_across_commands() {
    let store = Arc::new(MemoryStateStore::new());
    let router = Router::with_defaults(store.clone(), WorkflowConfig::default());
    let phase = "07-order";
    let order = [Stage::Spec, Stage::Research, Stage::Plan, Stage::Tasks];

    // Approving research before spec is rejected outright
    run_stage(&router, Command::Spec, phase).await;
    let envelope = router
        .handle_approval(approval(phase, "research", true, vec![]))
        .await;
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind, Some("WorkflowError"));

    // March through the whole chain, checking the prefix at every step
    let commands = [Command::Spec, Command::Research, Command::Plan, Command::Tasks];
    for (i, (command, stage)) in commands.iter().zip(order.iter()).enumerate() {
        if i > 0 {
            run_stage(&router, *command, phase).await;
        }
        router
            .handle_approval(approval(phase, stage.name(), true, vec![]))
            .await;

        let state = store.load(&PhaseId::parse(phase).unwrap()).await.unwrap();
        assert_eq!(&state.completed_steps, &order[..i + 1]);
        for (done, expected) in state.completed_steps.iter().zip(order.iter()) {
            assert_eq!(done, expected);
        }
    }

    let state = store.load(&PhaseId::parse(phase).unwrap()).await.unwrap();
    assert_eq!(state.current_step, None);
    assert!(state.is_complete(&WorkflowConfig::default()));
}

/// A dependency whose terminal stage is approved satisfies resolution
#[tokio::test]
async fn dependency_satisfied_after_terminal_approval() {
    let store = Arc::new(MemoryStateStore::new());
    let config = WorkflowConfig {
        dependency_gate: DependencyGate::Enforce,
        ..Default::default()
    };
    let router = Router::with_defaults(store.clone(), config);

    // Drive 05-y to completion
    let commands = [Command::Spec, Command::Research, Command::Plan, Command::Tasks];
    for command in commands {
        run_stage(&router, command, "05-y").await;
        let stage = command.stage().unwrap();
        let envelope = router
            .handle_approval(approval("05-y", stage.name(), true, vec![]))
            .await;
        assert!(envelope.success);
    }

    // 06-x may now start even under the enforcing gate
    let options = CommandOptions {
        dependencies: Some(vec!["05-y".to_string()]),
        ..Default::default()
    };
    let envelope = router.handle(Command::Spec, "06-x", options).await;
    assert!(envelope.success, "{:?}", envelope.error);
    let data = envelope.data.unwrap();
    assert_eq!(data["dependencies"]["satisfied"], true);
    assert_eq!(data["dependencies"]["resolved"], json!(["05-y"]));
}

struct CapturingSink(Mutex<Vec<AuditEntry>>);

#[async_trait]
impl AuditSink for CapturingSink {
    async fn record(&self, entry: &AuditEntry) {
        self.0.lock().unwrap().push(entry.clone());
    }
}

/// Regenerating an upstream artifact cascades to downstream stages and
/// audits the touch on an approved task breakdown
#[tokio::test]
async fn cascade_flags_downstream_and_audits_tasks() {
    let store = Arc::new(MemoryStateStore::new());
    let sink = Arc::new(CapturingSink(Mutex::new(Vec::new())));
    let router = Router::new(
        store.clone(),
        Arc::new(ReferenceGenerator),
        sink.clone(),
        WorkflowConfig::default(),
    );
    let phase = "08-cascade";

    let commands = [Command::Spec, Command::Research, Command::Plan, Command::Tasks];
    for command in commands {
        run_stage(&router, command, phase).await;
        router
            .handle_approval(approval(phase, command.stage().unwrap().name(), true, vec![]))
            .await;
    }

    // Revise the spec; precedents of spec are trivially satisfied
    let options = CommandOptions {
        changes: Some("narrowed the scope".to_string()),
        ..Default::default()
    };
    let envelope = router.handle(Command::Spec, phase, options).await;
    assert!(envelope.success, "{:?}", envelope.error);
    let data = envelope.data.unwrap();
    assert_eq!(data["cascaded"], json!(["research", "plan", "tasks"]));

    let state = store.load(&PhaseId::parse(phase).unwrap()).await.unwrap();
    assert_eq!(
        state.needs_revalidation,
        vec![Stage::Research, Stage::Plan, Stage::Tasks]
    );
    assert_eq!(state.cascade_notes.len(), 3);
    assert!(state
        .cascade_notes
        .iter()
        .all(|n| n.summary == "narrowed the scope"));

    // The approved task breakdown was touched: exactly one audit entry
    let entries = sink.0.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].stage, Stage::Tasks);
    assert_eq!(entries[0].action, "spec");
}

/// Repeated status reads on unchanged state are identical
#[tokio::test]
async fn status_reads_are_idempotent() {
    let store = Arc::new(MemoryStateStore::new());
    let router = Router::with_defaults(store, WorkflowConfig::default());
    let phase = "09-idem";

    run_stage(&router, Command::Spec, phase).await;
    router.handle_approval(approval(phase, "spec", true, vec![])).await;

    let first = router
        .handle(Command::Status, phase, CommandOptions::default())
        .await;
    let second = router
        .handle(Command::Status, phase, CommandOptions::default())
        .await;
    assert_eq!(first.data.unwrap(), second.data.unwrap());
}

/// The optional prd stage slots between plan and tasks when enabled
#[tokio::test]
async fn prd_stage_participates_when_enabled() {
    let store = Arc::new(MemoryStateStore::new());
    let config = WorkflowConfig {
        include_prd: true,
        ..Default::default()
    };
    let router = Router::with_defaults(store, config);
    let phase = "10-prd";

    for command in [Command::Spec, Command::Research, Command::Plan] {
        run_stage(&router, command, phase).await;
        router
            .handle_approval(approval(phase, command.stage().unwrap().name(), true, vec![]))
            .await;
    }

    // Tasks is still gated on prd
    let envelope = router
        .handle(Command::Tasks, phase, CommandOptions::default())
        .await;
    assert!(!envelope.success);
    assert!(envelope.error.unwrap().contains("prd"));

    let data = run_stage(&router, Command::Prd, phase).await;
    assert_eq!(data["currentStep"], "prd");
    // 3 of 5 stages complete
    assert_eq!(data["progress"], 60);
}
