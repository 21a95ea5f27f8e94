pub mod authorization;
pub mod chain;
pub mod engine;
pub mod progress;

pub use authorization::{can_act, OfficePolicy};
pub use chain::{
    completed_step_index, next_status, required_role_for_status, step_for_status, ApprovalChain,
    NextStatus, Step, APPROVAL_CHAIN,
};
pub use engine::{transition, TransitionOutcome, WorkflowAction, WorkflowEngine, WorkflowError};
pub use progress::{project, ProgressProjection, StepProgress, StepState};
