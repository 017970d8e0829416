pub mod cascade;
pub mod resolver;
pub mod tracker;
pub mod validator;

pub use cascade::{CascadeOutcome, ChangeDescriptor};
pub use resolver::{DependencyResolver, Resolution};
pub use tracker::{Decision, DecisionOutcome, DecisionStatus, StageApprovalStatus};
pub use validator::{NextAction, Transition};
