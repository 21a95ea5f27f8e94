pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod notification;
pub mod submission;
pub mod workflow;

pub use domain::actor::{Actor, UserId};
pub use domain::approval::{ApprovalRecord, ApprovalRecordId, Decision};
pub use domain::request::{
    BudgetRequest, FundId, ItemCategory, ItemUsage, LineItem, OwnerContact, RequestId,
};
pub use domain::role::Role;
pub use domain::status::RequestStatus;
pub use errors::{CoordinatorError, InterfaceError};
pub use lifecycle::{
    ActOutcome, AuditWrite, Dashboard, InMemoryRecordStore, LifecycleCoordinator, OfficeOutcome,
    OfficeQueue, RecordStore, RequestDetail, StatusUpdate, StoreError, ViewRefresher,
};
pub use notification::{Notification, NotificationError, Notifier};
pub use submission::{validate_submission, SubmissionDraft, SubmissionErrors};
pub use workflow::{
    can_act, project, transition, OfficePolicy, ProgressProjection, StepState, TransitionOutcome,
    WorkflowAction, WorkflowEngine, WorkflowError,
};
