use thiserror::Error;

use crate::domain::request::RequestId;
use crate::domain::role::Role;
use crate::domain::status::RequestStatus;
use crate::lifecycle::store::StoreError;
use crate::submission::SubmissionErrors;
use crate::workflow::WorkflowError;

fn format_roles(roles: &[Role]) -> String {
    roles.iter().map(|role| format!("`{role}`")).collect::<Vec<_>>().join(" or ")
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("request `{0}` was not found")]
    NotFound(RequestId),
    #[error("this action requires role {}; actor role is `{actual}`", format_roles(.required))]
    Forbidden { required: Vec<Role>, actual: Role },
    #[error("request in status `{status}` cannot take this action: {reason}")]
    InvalidState { status: RequestStatus, reason: String },
    #[error("request `{request_id}` changed while being processed (expected status `{expected}`)")]
    ConcurrentModification { request_id: RequestId, expected: RequestStatus },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("submission is invalid: {0}")]
    Validation(SubmissionErrors),
}

impl From<WorkflowError> for CoordinatorError {
    fn from(value: WorkflowError) -> Self {
        let reason = value.to_string();
        match value {
            WorkflowError::Forbidden { required, actual } => {
                Self::Forbidden { required: vec![required], actual }
            }
            WorkflowError::OfficeRoleRequired { allowed, actual } => {
                Self::Forbidden { required: allowed, actual }
            }
            WorkflowError::NotActionable { status }
            | WorkflowError::NoNextState { status }
            | WorkflowError::UnexpectedStatus { actual: status, .. } => {
                Self::InvalidState { status, reason }
            }
        }
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "Your role cannot perform this step.",
            Self::NotFound { .. } => "The record was not found.",
            Self::Conflict { .. } => {
                "The request changed while you were working on it. Reload and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The change could not be saved. Please retry shortly."
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::ServiceUnavailable { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl CoordinatorError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<CoordinatorError> for InterfaceError {
    fn from(value: CoordinatorError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            CoordinatorError::NotFound(_) => Self::NotFound { message, correlation_id },
            CoordinatorError::Forbidden { .. } => Self::Forbidden { message, correlation_id },
            CoordinatorError::InvalidState { .. } | CoordinatorError::Validation(_) => {
                Self::BadRequest { message, correlation_id }
            }
            CoordinatorError::ConcurrentModification { .. } => {
                Self::Conflict { message, correlation_id }
            }
            CoordinatorError::Persistence(_) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
        }
    }
}
