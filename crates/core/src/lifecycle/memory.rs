use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::actor::UserId;
use crate::domain::approval::ApprovalRecord;
use crate::domain::request::{BudgetRequest, ItemCategory, ItemUsage, OwnerContact, RequestId};
use crate::domain::status::RequestStatus;
use crate::lifecycle::store::{RecordStore, StatusUpdate, StoreError};

#[derive(Default)]
struct Failures {
    status_updates: bool,
    approval_inserts: bool,
    request_inserts: bool,
    item_usage: bool,
    interleaved_status: Option<RequestStatus>,
}

#[derive(Default)]
struct State {
    requests: HashMap<String, BudgetRequest>,
    approvals: Vec<ApprovalRecord>,
    contacts: HashMap<String, OwnerContact>,
    categories: Vec<ItemCategory>,
    failures: Failures,
}

/// Record store held in process memory, with switches for injecting write
/// failures and racing writers.
#[derive(Default)]
pub struct InMemoryRecordStore {
    state: Mutex<State>,
}

impl InMemoryRecordStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn with_request(self, request: BudgetRequest) -> Self {
        self.lock().requests.insert(request.id.0.clone(), request);
        self
    }

    pub fn with_contact(self, owner: &UserId, contact: OwnerContact) -> Self {
        self.lock().contacts.insert(owner.0.clone(), contact);
        self
    }

    pub fn fail_status_updates(&self, fail: bool) {
        self.lock().failures.status_updates = fail;
    }

    pub fn fail_approval_inserts(&self, fail: bool) {
        self.lock().failures.approval_inserts = fail;
    }

    pub fn fail_request_inserts(&self, fail: bool) {
        self.lock().failures.request_inserts = fail;
    }

    pub fn fail_item_usage(&self, fail: bool) {
        self.lock().failures.item_usage = fail;
    }

    /// Simulates another writer moving the request to `status` between the
    /// read and the next conditional status write.
    pub fn interleave_status_change(&self, status: RequestStatus) {
        self.lock().failures.interleaved_status = Some(status);
    }

    pub fn request(&self, id: &RequestId) -> Option<BudgetRequest> {
        self.lock().requests.get(&id.0).cloned()
    }

    pub fn approval_records(&self) -> Vec<ApprovalRecord> {
        self.lock().approvals.clone()
    }

    pub fn item_categories(&self) -> Vec<ItemCategory> {
        self.lock().categories.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_request(&self, id: &RequestId) -> Result<Option<BudgetRequest>, StoreError> {
        Ok(self.lock().requests.get(&id.0).cloned())
    }

    async fn insert_request(&self, request: &BudgetRequest) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.failures.request_inserts {
            return Err(StoreError::Backend("injected request insert failure".to_string()));
        }
        state.requests.insert(request.id.0.clone(), request.clone());
        Ok(())
    }

    async fn update_request_status(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError> {
        let mut state = self.lock();
        if state.failures.status_updates {
            return Err(StoreError::Backend("injected status update failure".to_string()));
        }
        let interleaved = state.failures.interleaved_status.take();

        let Some(request) = state.requests.get_mut(&id.0) else {
            return Ok(StatusUpdate::Stale);
        };
        if let Some(status) = interleaved {
            request.status = status;
        }
        if request.status != expected {
            return Ok(StatusUpdate::Stale);
        }

        request.status = next;
        request.updated_at = updated_at;
        Ok(StatusUpdate::Applied)
    }

    async fn insert_approval_record(&self, record: &ApprovalRecord) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.failures.approval_inserts {
            return Err(StoreError::Backend("injected approval insert failure".to_string()));
        }
        state.approvals.push(record.clone());
        Ok(())
    }

    async fn list_approval_records(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalRecord>, StoreError> {
        let mut records: Vec<_> = self
            .lock()
            .approvals
            .iter()
            .filter(|record| &record.request_id == request_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.decided_at);
        Ok(records)
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<BudgetRequest>, StoreError> {
        let mut requests: Vec<_> = self
            .lock()
            .requests
            .values()
            .filter(|request| request.status == status)
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(requests)
    }

    async fn list_requests(
        &self,
        organization: Option<&str>,
    ) -> Result<Vec<BudgetRequest>, StoreError> {
        let mut requests: Vec<_> = self
            .lock()
            .requests
            .values()
            .filter(|request| organization.map_or(true, |org| request.organization == org))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(requests)
    }

    async fn find_owner_contact(&self, owner: &UserId) -> Result<Option<OwnerContact>, StoreError> {
        Ok(self.lock().contacts.get(&owner.0).cloned())
    }

    async fn record_item_usage(&self, usage: &ItemUsage) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.failures.item_usage {
            return Err(StoreError::Backend("injected item usage failure".to_string()));
        }

        let existing = state.categories.iter().position(|category| {
            category.name == usage.name
                && category.department == usage.department
                && category.year == usage.year
        });
        match existing {
            Some(index) => {
                let category = &mut state.categories[index];
                category.use_count += 1;
                category.unit_price = usage.unit_price;
            }
            None => state.categories.push(ItemCategory {
                name: usage.name.clone(),
                department: usage.department.clone(),
                unit_price: usage.unit_price,
                year: usage.year,
                use_count: 1,
            }),
        }
        Ok(())
    }

    async fn list_item_categories(
        &self,
        department: &str,
        year: i32,
    ) -> Result<Vec<ItemCategory>, StoreError> {
        let mut categories: Vec<_> = self
            .lock()
            .categories
            .iter()
            .filter(|category| category.department == department && category.year == year)
            .cloned()
            .collect();
        categories.sort_by(|a, b| b.use_count.cmp(&a.use_count).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }
}
