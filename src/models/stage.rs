//! Workflow stages and their fixed ordering

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the staged approval workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Specification document
    Spec,
    /// Research / sources document
    Research,
    /// Implementation plan
    Plan,
    /// Product requirements document (optional, config-gated)
    Prd,
    /// Task breakdown (terminal stage)
    Tasks,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Spec => "spec",
            Stage::Research => "research",
            Stage::Plan => "plan",
            Stage::Prd => "prd",
            Stage::Tasks => "tasks",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Stage::Spec => "📝",
            Stage::Research => "🔍",
            Stage::Plan => "🗺️",
            Stage::Prd => "📋",
            Stage::Tasks => "🔨",
        }
    }

    /// Parse a stage name as used on the command surface
    pub fn parse(s: &str) -> Option<Stage> {
        match s.to_lowercase().as_str() {
            "spec" => Some(Stage::Spec),
            "research" => Some(Stage::Research),
            "plan" => Some(Stage::Plan),
            "prd" => Some(Stage::Prd),
            "tasks" => Some(Stage::Tasks),
            _ => None,
        }
    }

    /// The terminal stage closes out a phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Tasks)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
