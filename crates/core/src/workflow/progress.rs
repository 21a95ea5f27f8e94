use serde::{Deserialize, Serialize};

use crate::domain::approval::{ApprovalRecord, Decision};
use crate::domain::request::BudgetRequest;
use crate::domain::role::Role;
use crate::domain::status::RequestStatus;
use crate::workflow::chain::APPROVAL_CHAIN;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Done,
    Current,
    RejectedAt,
    Waiting,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    pub status: RequestStatus,
    pub role: Role,
    pub label: String,
    pub state: StepState,
}

/// Display-only view of chain progress, recomputed from the stored status
/// and audit trail on every read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressProjection {
    pub status: RequestStatus,
    pub completed_step_index: i32,
    pub steps: Vec<StepProgress>,
}

impl ProgressProjection {
    pub fn done_count(&self) -> usize {
        self.steps.iter().filter(|step| step.state == StepState::Done).count()
    }

    pub fn current_step(&self) -> Option<&StepProgress> {
        self.steps.iter().find(|step| step.state == StepState::Current)
    }
}

pub fn project(request: &BudgetRequest, records: &[ApprovalRecord]) -> ProgressProjection {
    let current_index = APPROVAL_CHAIN.completed_step_index(request.status);

    let steps = APPROVAL_CHAIN
        .steps()
        .iter()
        .enumerate()
        .map(|(index, step)| {
            // The latest decision by the step's role wins if a status was revisited.
            let decision = records
                .iter()
                .filter(|record| record.approver_role == step.role)
                .max_by_key(|record| record.decided_at)
                .map(|record| record.decision);

            let state = match decision {
                Some(Decision::Approved) => StepState::Done,
                Some(Decision::Rejected) => StepState::RejectedAt,
                None if index as i32 == current_index => StepState::Current,
                None => StepState::Waiting,
            };

            StepProgress { status: step.status, role: step.role, label: step.label.to_string(), state }
        })
        .collect();

    ProgressProjection { status: request.status, completed_step_index: current_index, steps }
}
