use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::approval::Decision;
use crate::domain::role::Role;
use crate::domain::status::RequestStatus;
use crate::workflow::authorization::OfficePolicy;
use crate::workflow::chain::{ApprovalChain, APPROVAL_CHAIN};

/// Everything that can move a request between statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Decide(Decision),
    PrepareCash,
    Disburse,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub action: WorkflowAction,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("request in status `{status}` is not awaiting approval")]
    NotActionable { status: RequestStatus },
    #[error("no next status exists after `{status}`")]
    NoNextState { status: RequestStatus },
    #[error("role `{required}` is required for this step (actor role: `{actual}`)")]
    Forbidden { required: Role, actual: Role },
    #[error("role `{actual}` may not perform office actions")]
    OfficeRoleRequired { allowed: Vec<Role>, actual: Role },
    #[error("expected status `{expected}` but request is `{actual}`")]
    UnexpectedStatus { expected: RequestStatus, actual: RequestStatus },
}

/// Chain decision against the standard approval chain.
pub fn transition(
    current: RequestStatus,
    decision: Decision,
) -> Result<RequestStatus, WorkflowError> {
    decide(&APPROVAL_CHAIN, current, decision)
}

fn decide(
    chain: &ApprovalChain,
    current: RequestStatus,
    decision: Decision,
) -> Result<RequestStatus, WorkflowError> {
    if current.is_terminal() || current.is_fully_approved() {
        return Err(WorkflowError::NotActionable { status: current });
    }

    match decision {
        Decision::Rejected => {
            if chain.index_of(current).is_none() {
                return Err(WorkflowError::NotActionable { status: current });
            }
            Ok(RequestStatus::Rejected)
        }
        Decision::Approved => chain
            .next_status(current)
            .status()
            .ok_or(WorkflowError::NoNextState { status: current }),
    }
}

fn office_step(
    current: RequestStatus,
    expected: RequestStatus,
    to: RequestStatus,
) -> Result<RequestStatus, WorkflowError> {
    if current != expected {
        return Err(WorkflowError::UnexpectedStatus { expected, actual: current });
    }
    Ok(to)
}

/// Single state machine for the approval chain and the office disbursement
/// steps. Pure: callers persist the outcome.
#[derive(Clone, Debug)]
pub struct WorkflowEngine {
    chain: &'static ApprovalChain,
    office: OfficePolicy,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(OfficePolicy::default())
    }
}

impl WorkflowEngine {
    pub fn new(office: OfficePolicy) -> Self {
        Self { chain: &APPROVAL_CHAIN, office }
    }

    pub fn chain(&self) -> &'static ApprovalChain {
        self.chain
    }

    pub fn office_policy(&self) -> &OfficePolicy {
        &self.office
    }

    /// Checks that `role` may perform `action` on a request in `status`.
    pub fn authorize(
        &self,
        role: Role,
        status: RequestStatus,
        action: WorkflowAction,
    ) -> Result<(), WorkflowError> {
        match action {
            WorkflowAction::Decide(_) => {
                let Some(required) = self.chain.required_role_for_status(status) else {
                    return Err(WorkflowError::NotActionable { status });
                };
                if required != role {
                    return Err(WorkflowError::Forbidden { required, actual: role });
                }
                Ok(())
            }
            WorkflowAction::PrepareCash | WorkflowAction::Disburse => {
                if !self.office.allows(role) {
                    return Err(WorkflowError::OfficeRoleRequired {
                        allowed: self.office.roles().to_vec(),
                        actual: role,
                    });
                }
                Ok(())
            }
        }
    }

    pub fn apply(
        &self,
        current: RequestStatus,
        action: WorkflowAction,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let to = match action {
            WorkflowAction::Decide(decision) => decide(self.chain, current, decision)?,
            WorkflowAction::PrepareCash => {
                office_step(current, RequestStatus::Approved, RequestStatus::ReadyForPayment)?
            }
            WorkflowAction::Disburse => {
                office_step(current, RequestStatus::ReadyForPayment, RequestStatus::Completed)?
            }
        };

        Ok(TransitionOutcome { from: current, to, action })
    }
}
