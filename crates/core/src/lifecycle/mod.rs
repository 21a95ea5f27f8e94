pub mod coordinator;
pub mod memory;
pub mod store;
pub mod views;

pub use coordinator::{
    ActOutcome, AuditWrite, Dashboard, LifecycleCoordinator, OfficeOutcome, OfficeQueue,
    RequestDetail,
};
pub use memory::InMemoryRecordStore;
pub use store::{RecordStore, StatusUpdate, StoreError};
pub use views::{RecordingViewRefresher, TracingViewRefresher, ViewRefresher};
