use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use budgetflow_core::domain::actor::UserId;
use budgetflow_core::domain::approval::{ApprovalRecord, ApprovalRecordId, Decision};
use budgetflow_core::domain::request::{
    BudgetRequest, FundId, ItemCategory, ItemUsage, LineItem, OwnerContact, RequestId,
};
use budgetflow_core::domain::role::Role;
use budgetflow_core::domain::status::RequestStatus;
use budgetflow_core::lifecycle::{RecordStore, StatusUpdate, StoreError};

use super::RepositoryError;
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, title, organization, payee, amount, status, owner_id, fund_id,
     reason, line_items, attachment_url, created_at, updated_at";

/// Record store backed by the sqlite schema in `migrations/`.
#[derive(Clone)]
pub struct SqlRecordStore {
    pool: DbPool,
}

impl SqlRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn upsert_owner_contact(
        &self,
        owner: &UserId,
        contact: &OwnerContact,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO budget_profiles (id, email, full_name, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 full_name = excluded.full_name,
                 updated_at = excluded.updated_at",
        )
        .bind(&owner.0)
        .bind(&contact.email)
        .bind(&contact.full_name)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_request(&self, id: &RequestId) -> Result<Option<BudgetRequest>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM budget_requests WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_request).transpose()
    }
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

/// Fixed-width UTC text so that columns sort chronologically.
fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column} `{value}`: {e}")))
}

fn row_to_request(row: &SqliteRow) -> Result<BudgetRequest, RepositoryError> {
    let status_code: String = get(row, "status")?;
    let status = RequestStatus::parse(&status_code)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{status_code}`")))?;
    let line_items_json: String = get(row, "line_items")?;
    let line_items: Vec<LineItem> = serde_json::from_str(&line_items_json)
        .map_err(|e| RepositoryError::Decode(format!("line_items: {e}")))?;
    let created_at: String = get(row, "created_at")?;
    let updated_at: String = get(row, "updated_at")?;

    Ok(BudgetRequest {
        id: RequestId(get(row, "id")?),
        title: get(row, "title")?,
        organization: get(row, "organization")?,
        payee: get(row, "payee")?,
        amount: get(row, "amount")?,
        status,
        owner_id: UserId(get(row, "owner_id")?),
        fund_id: FundId(get(row, "fund_id")?),
        reason: get(row, "reason")?,
        line_items,
        attachment_url: get(row, "attachment_url")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn row_to_record(row: &SqliteRow) -> Result<ApprovalRecord, RepositoryError> {
    let role_code: String = get(row, "approver_role")?;
    let decision_code: String = get(row, "decision")?;
    let decided_at: String = get(row, "decided_at")?;

    Ok(ApprovalRecord {
        id: ApprovalRecordId(get(row, "id")?),
        request_id: RequestId(get(row, "request_id")?),
        approver_id: UserId(get(row, "approver_id")?),
        approver_role: Role::parse(&role_code)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown role `{role_code}`")))?,
        decision: Decision::parse(&decision_code)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown decision `{decision_code}`")))?,
        comment: get(row, "comment")?,
        decided_at: parse_timestamp("decided_at", &decided_at)?,
    })
}

fn row_to_category(row: &SqliteRow) -> Result<ItemCategory, RepositoryError> {
    let use_count: i64 = get(row, "use_count")?;
    Ok(ItemCategory {
        name: get(row, "name")?,
        department: get(row, "department")?,
        unit_price: get(row, "unit_price")?,
        year: get(row, "year")?,
        use_count: use_count
            .try_into()
            .map_err(|_| RepositoryError::Decode(format!("use_count `{use_count}` out of range")))?,
    })
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn get_request(&self, id: &RequestId) -> Result<Option<BudgetRequest>, StoreError> {
        Ok(self.fetch_request(id).await?)
    }

    async fn insert_request(&self, request: &BudgetRequest) -> Result<(), StoreError> {
        let line_items = serde_json::to_string(&request.line_items)
            .map_err(|e| StoreError::Decode(format!("line_items: {e}")))?;

        sqlx::query(
            "INSERT INTO budget_requests (id, title, organization, payee, amount, status, owner_id,
                                          fund_id, reason, line_items, attachment_url,
                                          created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.title)
        .bind(&request.organization)
        .bind(&request.payee)
        .bind(request.amount)
        .bind(request.status.as_str())
        .bind(&request.owner_id.0)
        .bind(&request.fund_id.0)
        .bind(&request.reason)
        .bind(line_items)
        .bind(&request.attachment_url)
        .bind(timestamp(request.created_at))
        .bind(timestamp(request.updated_at))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn update_request_status(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError> {
        let result = sqlx::query(
            "UPDATE budget_requests SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(timestamp(updated_at))
        .bind(&id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(if result.rows_affected() == 1 { StatusUpdate::Applied } else { StatusUpdate::Stale })
    }

    async fn insert_approval_record(&self, record: &ApprovalRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO budget_approvals (id, request_id, approver_id, approver_role, decision,
                                           comment, decided_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.request_id.0)
        .bind(&record.approver_id.0)
        .bind(record.approver_role.as_str())
        .bind(record.decision.as_str())
        .bind(&record.comment)
        .bind(timestamp(record.decided_at))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn list_approval_records(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ApprovalRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, request_id, approver_id, approver_role, decision, comment, decided_at
             FROM budget_approvals WHERE request_id = ? ORDER BY decided_at ASC, rowid ASC",
        )
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<BudgetRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM budget_requests WHERE status = ? ORDER BY updated_at ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_requests(
        &self,
        organization: Option<&str>,
    ) -> Result<Vec<BudgetRequest>, StoreError> {
        let rows = match organization {
            Some(organization) => {
                sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM budget_requests
                     WHERE organization = ? ORDER BY created_at DESC, id ASC"
                ))
                .bind(organization)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM budget_requests ORDER BY created_at DESC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_owner_contact(&self, owner: &UserId) -> Result<Option<OwnerContact>, StoreError> {
        let row = sqlx::query("SELECT email, full_name FROM budget_profiles WHERE id = ?")
            .bind(&owner.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let contact = match row {
            Some(ref row) => Some(OwnerContact {
                email: get(row, "email")?,
                full_name: get(row, "full_name")?,
            }),
            None => None,
        };
        Ok(contact.filter(|contact| !contact.email.trim().is_empty()))
    }

    async fn record_item_usage(&self, usage: &ItemUsage) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO budget_item_categories (name, department, year, unit_price, use_count,
                                                 updated_at)
             VALUES (?, ?, ?, ?, 1, ?)
             ON CONFLICT(name, department, year) DO UPDATE SET
                 use_count = budget_item_categories.use_count + 1,
                 unit_price = excluded.unit_price,
                 updated_at = excluded.updated_at",
        )
        .bind(&usage.name)
        .bind(&usage.department)
        .bind(usage.year)
        .bind(usage.unit_price)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn list_item_categories(
        &self,
        department: &str,
        year: i32,
    ) -> Result<Vec<ItemCategory>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, department, unit_price, year, use_count
             FROM budget_item_categories
             WHERE department = ? AND year = ?
             ORDER BY use_count DESC, name ASC",
        )
        .bind(department)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_category).collect::<Result<Vec<_>, _>>()?)
    }
}
