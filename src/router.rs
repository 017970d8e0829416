//! Command router: the single entry point of the workflow engine
//!
//! Validates shape, consults the dependency resolver and workflow validator,
//! delegates artifact generation, triggers cascade and audit, and persists.
//! Every failure is normalized into the response envelope; nothing escapes
//! the router boundary as an error.

use crate::audit::{AuditEntry, AuditSink, TracingAuditSink};
use crate::error::{PhasedError, Result};
use crate::generator::{ReferenceGenerator, StageGenerator, StagePayload};
use crate::models::{PhaseId, PhaseState, Stage, WorkflowConfig};
use crate::store::StateStore;
use crate::workflow::cascade::{propagate, ChangeDescriptor};
use crate::workflow::resolver::DependencyResolver;
use crate::workflow::tracker::{record_decision, status as stage_status, Decision};
use crate::workflow::validator::{can_transition, next_action, precedent_chain};
use crate::models::DependencyGate;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{info, warn};

/// Commands accepted on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Spec,
    Research,
    Plan,
    Prd,
    Tasks,
    Status,
}

impl Command {
    pub fn parse(s: &str) -> Option<Command> {
        match s.to_lowercase().as_str() {
            "spec" => Some(Command::Spec),
            "research" => Some(Command::Research),
            "plan" => Some(Command::Plan),
            "prd" => Some(Command::Prd),
            "tasks" => Some(Command::Tasks),
            "status" => Some(Command::Status),
            _ => None,
        }
    }

    /// The workflow stage a command targets; `None` for status
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Command::Spec => Some(Stage::Spec),
            Command::Research => Some(Stage::Research),
            Command::Plan => Some(Stage::Plan),
            Command::Prd => Some(Stage::Prd),
            Command::Tasks => Some(Stage::Tasks),
            Command::Status => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Spec => "spec",
            Command::Research => "research",
            Command::Plan => "plan",
            Command::Prd => "prd",
            Command::Tasks => "tasks",
            Command::Status => "status",
        }
    }
}

/// Free-form options on a stage command
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Instructions / request body forwarded to the generator
    pub payload: Option<String>,
    /// Change description; presence on a workflow stage triggers the
    /// precedent-satisfaction check and drives cascade notes
    pub changes: Option<String>,
    /// Explicit dependency declaration overriding the stored list
    pub dependencies: Option<Vec<String>>,
}

/// An approval request on one stage
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub phase_id: String,
    pub stage: String,
    pub approved: bool,
    pub approver_id: Option<String>,
    pub comments: Option<String>,
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeContext {
    pub phase_id: String,
    pub operation: String,
}

/// Uniform success/failure result of every router call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    pub context: EnvelopeContext,
}

impl Envelope {
    fn ok(data: JsonValue, context: EnvelopeContext) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            context,
        }
    }

    fn fail(error: PhasedError, context: EnvelopeContext) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            context,
        }
    }
}

pub struct Router {
    store: Arc<dyn StateStore>,
    generator: Arc<dyn StageGenerator>,
    audit: Arc<dyn AuditSink>,
    config: WorkflowConfig,
}

impl Router {
    pub fn new(
        store: Arc<dyn StateStore>,
        generator: Arc<dyn StageGenerator>,
        audit: Arc<dyn AuditSink>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            generator,
            audit,
            config,
        }
    }

    /// Router with the built-in generator and tracing audit sink
    pub fn with_defaults(store: Arc<dyn StateStore>, config: WorkflowConfig) -> Self {
        Self::new(
            store,
            Arc::new(ReferenceGenerator),
            Arc::new(TracingAuditSink),
            config,
        )
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Handle one command. Never returns an error; failures land in the
    /// envelope.
    pub async fn handle(&self, command: Command, phase_id: &str, options: CommandOptions) -> Envelope {
        let context = EnvelopeContext {
            phase_id: phase_id.to_string(),
            operation: command.name().to_string(),
        };
        match self.dispatch(command, phase_id, &options).await {
            Ok(data) => Envelope::ok(data, context),
            Err(e) => {
                warn!(phase = phase_id, command = command.name(), kind = e.kind(), error = %e, "command failed");
                Envelope::fail(e, context)
            }
        }
    }

    /// Record an approval or rejection and recompute the next legal action.
    pub async fn handle_approval(&self, request: ApprovalRequest) -> Envelope {
        let context = EnvelopeContext {
            phase_id: request.phase_id.clone(),
            operation: "approve".to_string(),
        };
        match self.dispatch_approval(&request).await {
            Ok(data) => Envelope::ok(data, context),
            Err(e) => {
                warn!(phase = %request.phase_id, kind = e.kind(), error = %e, "approval failed");
                Envelope::fail(e, context)
            }
        }
    }

    async fn dispatch(
        &self,
        command: Command,
        phase_id: &str,
        options: &CommandOptions,
    ) -> Result<JsonValue> {
        let id = PhaseId::parse(phase_id)?;

        let Some(stage) = command.stage() else {
            return self.status(&id).await;
        };
        if !self.config.includes(stage) {
            return Err(PhasedError::validation(format!(
                "stage '{}' is not enabled in this workflow",
                stage
            )));
        }

        let mut state = self.store.load(&id).await?;

        if let Some(declared) = &options.dependencies {
            state.dependencies = declared
                .iter()
                .map(|d| PhaseId::parse(d))
                .collect::<Result<Vec<_>>>()?;
        }

        // A change to a later stage must not contradict unapproved precedents
        if options.changes.is_some() {
            let unmet: Vec<Stage> = precedent_chain(stage, &self.config)
                .iter()
                .copied()
                .filter(|s| !state.approvals.is_approved(*s))
                .collect();
            if !unmet.is_empty() {
                return Err(PhasedError::Hierarchy {
                    phase: id.to_string(),
                    stage,
                    unmet,
                });
            }
        }

        let resolution = DependencyResolver::new(self.store.as_ref())
            .resolve(&state.dependencies)
            .await;
        let first_stage = self.config.stage_order()[0];
        if stage == first_stage
            && !resolution.satisfied
            && self.config.dependency_gate == DependencyGate::Enforce
        {
            return Err(PhasedError::UnmetDependencies {
                phase: id.to_string(),
                missing: resolution.missing.iter().map(|m| m.to_string()).collect(),
            });
        }
        state.set_dependency_blockers(&resolution.missing);

        let transition = can_transition(&state, stage, &self.config);
        if !transition.valid {
            return Err(PhasedError::Workflow {
                phase: id.to_string(),
                target: stage,
                current: state.current_step,
                required_steps: transition.missing_prerequisites,
            });
        }

        let payload = StagePayload {
            body: options.payload.clone(),
            changes: options.changes.clone(),
        };
        let artifact = self
            .generator
            .generate(&id, &state, stage, &payload)
            .await
            .map_err(|e| PhasedError::Generator(e.to_string()))?;

        let iteration = state.note_generation(stage);

        let mut cascaded = Vec::new();
        if artifact.cascade_needed {
            let summary = options
                .changes
                .clone()
                .unwrap_or_else(|| format!("'{}' artifact regenerated", stage));
            cascaded = propagate(&mut state, stage, &ChangeDescriptor::new(summary), &self.config)
                .updated;
        }

        // Touching an already-approved task breakdown is audited, with a
        // snapshot taken before the overwrite
        let tasks_affected = stage == Stage::Tasks || cascaded.contains(&Stage::Tasks);
        if tasks_affected && state.approvals.is_approved(Stage::Tasks) {
            let backup = self.store.backup(&id).await.unwrap_or(None);
            let entry = AuditEntry::new(id.clone(), Stage::Tasks, command.name(), backup);
            self.audit.record(&entry).await;
        }

        state.recompute_derived(&self.config);
        self.store.save(&id, &state).await?;
        info!(phase = %id, stage = %stage, iteration, "stage artifact recorded");

        Ok(json!({
            "phase": id.to_string(),
            "stage": stage,
            "artifactRef": artifact.artifact_ref,
            "iteration": iteration,
            "currentStep": state.current_step,
            "completedSteps": state.completed_steps,
            "progress": state.progress(&self.config),
            "cascaded": cascaded,
            "dependencies": resolution,
            "nextAction": next_action(&state, &self.config),
        }))
    }

    async fn dispatch_approval(&self, request: &ApprovalRequest) -> Result<JsonValue> {
        let id = PhaseId::parse(&request.phase_id)?;
        let stage = Stage::parse(&request.stage).ok_or_else(|| {
            PhasedError::validation(format!("unknown stage '{}'", request.stage))
        })?;
        if !self.config.includes(stage) {
            return Err(PhasedError::validation(format!(
                "stage '{}' is not enabled in this workflow",
                stage
            )));
        }

        let mut state = self.store.load(&id).await?;

        if !state.artifact_exists(stage) {
            return Err(PhasedError::validation(format!(
                "stage '{}' of phase '{}' has no generated artifact to review",
                stage, id
            )));
        }

        let transition = can_transition(&state, stage, &self.config);
        if !transition.valid {
            return Err(PhasedError::Workflow {
                phase: id.to_string(),
                target: stage,
                current: state.current_step,
                required_steps: transition.missing_prerequisites,
            });
        }

        let outcome = record_decision(
            &mut state,
            stage,
            Decision {
                approved: request.approved,
                approver_id: request
                    .approver_id
                    .clone()
                    .unwrap_or_else(|| "reviewer".to_string()),
                comments: request.comments.clone(),
                feedback: request.feedback.clone(),
            },
        );
        state.recompute_derived(&self.config);
        self.store.save(&id, &state).await?;
        info!(
            phase = %id,
            stage = %stage,
            approved = request.approved,
            iteration = outcome.record.iteration,
            "decision recorded"
        );

        Ok(json!({
            "phase": id.to_string(),
            "stage": stage,
            "outcome": outcome,
            "currentStep": state.current_step,
            "completedSteps": state.completed_steps,
            "progress": state.progress(&self.config),
            "complete": state.is_complete(&self.config),
            "nextAction": next_action(&state, &self.config),
        }))
    }

    async fn status(&self, id: &PhaseId) -> Result<JsonValue> {
        let state = self.store.load(id).await?;
        let resolution = DependencyResolver::new(self.store.as_ref())
            .resolve(&state.dependencies)
            .await;
        self.status_of(&state, resolution)
    }

    fn status_of(
        &self,
        state: &PhaseState,
        resolution: crate::workflow::Resolution,
    ) -> Result<JsonValue> {
        let stages: Vec<JsonValue> = self
            .config
            .stage_order()
            .iter()
            .map(|s| serde_json::to_value(stage_status(state, *s)).map_err(PhasedError::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({
            "phase": state.phase.to_string(),
            "phaseTitle": state.phase_title,
            "currentStep": state.current_step,
            "completedSteps": state.completed_steps,
            "progress": state.progress(&self.config),
            "complete": state.is_complete(&self.config),
            "stages": stages,
            "blockers": state.blockers,
            "needsRevalidation": state.needs_revalidation,
            "dependencies": {
                "declared": state.dependencies,
                "resolution": resolution,
            },
            "nextAction": next_action(state, &self.config),
        }))
    }
}
