//! Dependency resolution across phases
//!
//! A declared dependency is satisfied once the referenced phase has approved
//! its terminal stage. Missing or unloadable phases count as unresolved,
//! never as errors; resolution never mutates anything.

use crate::models::{PhaseId, Stage};
use crate::store::StateStore;
use serde::Serialize;
use tracing::debug;

/// Outcome of resolving a phase's declared dependencies
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub satisfied: bool,
    pub resolved: Vec<PhaseId>,
    pub missing: Vec<PhaseId>,
}

impl Resolution {
    pub fn empty() -> Self {
        Self {
            satisfied: true,
            resolved: Vec::new(),
            missing: Vec::new(),
        }
    }
}

pub struct DependencyResolver<'a> {
    store: &'a dyn StateStore,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self { store }
    }

    /// Resolve the declared dependency list.
    ///
    /// A dependency counts as resolved only if its `completedSteps` contains
    /// the terminal stage; a phase with no persisted state is missing.
    pub async fn resolve(&self, declared: &[PhaseId]) -> Resolution {
        let mut resolved = Vec::new();
        let mut missing = Vec::new();

        for dep in declared {
            match self.store.load_existing(dep).await {
                Ok(Some(state)) if state.completed_steps.contains(&Stage::Tasks) => {
                    resolved.push(dep.clone());
                }
                Ok(_) => missing.push(dep.clone()),
                Err(e) => {
                    debug!(dependency = %dep, error = %e, "dependency unloadable, counting as missing");
                    missing.push(dep.clone());
                }
            }
        }

        Resolution {
            satisfied: missing.is_empty(),
            resolved,
            missing,
        }
    }
}

/// Suggest a default dependency list by decrementing the numeric prefix.
///
/// Suggestion only: linear numbering is not generally safe, so the declared
/// list on the phase state stays authoritative. Returns every known phase
/// whose sequence is exactly one below.
pub fn suggest_dependencies(id: &PhaseId, known: &[PhaseId]) -> Vec<PhaseId> {
    if id.sequence == 0 {
        return Vec::new();
    }
    known
        .iter()
        .filter(|k| k.sequence == id.sequence - 1)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalRecord, PhaseState, WorkflowConfig};
    use crate::store::MemoryStateStore;
    use chrono::Utc;

    fn id(s: &str) -> PhaseId {
        PhaseId::parse(s).unwrap()
    }

    fn approved(iteration: u32) -> ApprovalRecord {
        ApprovalRecord {
            approved: true,
            approver_id: "reviewer".to_string(),
            decided_at: Utc::now(),
            comments: None,
            feedback: Vec::new(),
            iteration,
        }
    }

    fn completed_state(phase: &str) -> PhaseState {
        let config = WorkflowConfig::default();
        let mut state = PhaseState::new(id(phase), Vec::new());
        for stage in config.stage_order() {
            state.approvals.set(*stage, approved(1));
        }
        state.recompute_derived(&config);
        state
    }

    #[tokio::test]
    async fn test_satisfied_when_dependency_complete() {
        let store = MemoryStateStore::new();
        store.insert(&completed_state("05-y"));

        let resolution = DependencyResolver::new(&store).resolve(&[id("05-y")]).await;
        assert!(resolution.satisfied);
        assert_eq!(resolution.resolved, vec![id("05-y")]);
        assert!(resolution.missing.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_dependency_is_missing() {
        let store = MemoryStateStore::new();
        store.insert(&PhaseState::new(id("05-y"), Vec::new()));

        let resolution = DependencyResolver::new(&store).resolve(&[id("05-y")]).await;
        assert!(!resolution.satisfied);
        assert_eq!(resolution.missing, vec![id("05-y")]);
    }

    #[tokio::test]
    async fn test_nonexistent_dependency_is_missing_not_error() {
        let store = MemoryStateStore::new();
        let resolution = DependencyResolver::new(&store).resolve(&[id("05-y")]).await;
        assert!(!resolution.satisfied);
        assert_eq!(resolution.missing, vec![id("05-y")]);
    }

    #[tokio::test]
    async fn test_corrupt_dependency_is_missing_not_error() {
        let store = MemoryStateStore::new();
        store.insert_raw(&id("05-y"), serde_json::json!({"phase": "05-y"}));

        let resolution = DependencyResolver::new(&store).resolve(&[id("05-y")]).await;
        assert!(!resolution.satisfied);
        assert_eq!(resolution.missing, vec![id("05-y")]);
    }

    #[test]
    fn test_suggestion_decrements_prefix() {
        let known = vec![id("04-a"), id("05-y"), id("05-z"), id("06-x")];
        assert_eq!(
            suggest_dependencies(&id("06-x"), &known),
            vec![id("05-y"), id("05-z")]
        );
        assert!(suggest_dependencies(&id("01-first"), &known).is_empty());
    }
}
