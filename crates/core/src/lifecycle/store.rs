use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::actor::UserId;
use crate::domain::approval::ApprovalRecord;
use crate::domain::request::{BudgetRequest, ItemCategory, ItemUsage, OwnerContact, RequestId};
use crate::domain::status::RequestStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record store backend error: {0}")]
    Backend(String),
    #[error("record decode error: {0}")]
    Decode(String),
}

/// Result of a conditional status write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    /// The stored status no longer matched the expected one; nothing changed.
    Stale,
}

/// Narrow view of the request/approval record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_request(&self, id: &RequestId) -> Result<Option<BudgetRequest>, StoreError>;

    async fn insert_request(&self, request: &BudgetRequest) -> Result<(), StoreError>;

    /// Writes `next` only if the stored status still equals `expected`.
    async fn update_request_status(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError>;

    async fn insert_approval_record(&self, record: &ApprovalRecord) -> Result<(), StoreError>;

    /// Oldest decision first.
    async fn list_approval_records(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalRecord>, StoreError>;

    /// Least recently updated first.
    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<BudgetRequest>, StoreError>;

    /// Newest submission first. `None` lists every organization.
    async fn list_requests(
        &self,
        organization: Option<&str>,
    ) -> Result<Vec<BudgetRequest>, StoreError>;

    async fn find_owner_contact(&self, owner: &UserId) -> Result<Option<OwnerContact>, StoreError>;

    /// Inserts the item with a use count of one, or bumps the count and
    /// refreshes the unit price of an existing entry.
    async fn record_item_usage(&self, usage: &ItemUsage) -> Result<(), StoreError>;

    /// Most used first, then by name.
    async fn list_item_categories(
        &self,
        department: &str,
        year: i32,
    ) -> Result<Vec<ItemCategory>, StoreError>;
}
