use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::actor::Actor;
use crate::domain::approval::{ApprovalRecord, Decision};
use crate::domain::request::{BudgetRequest, ItemCategory, ItemUsage, RequestId};
use crate::domain::role::Role;
use crate::domain::status::RequestStatus;
use crate::errors::CoordinatorError;
use crate::lifecycle::store::{RecordStore, StatusUpdate};
use crate::lifecycle::views::ViewRefresher;
use crate::notification::{cash_ready_notification, Notifier};
use crate::submission::{validate_submission, SubmissionDraft};
use crate::workflow::{
    can_act, project, ProgressProjection, TransitionOutcome, WorkflowAction, WorkflowEngine,
};

/// Whether the audit record for a committed decision was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditWrite {
    Recorded { record: ApprovalRecord },
    /// The status change stands; only the audit append failed.
    Failed { record: ApprovalRecord, error: String },
}

impl AuditWrite {
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Recorded { .. } => None,
            Self::Failed { error, .. } => {
                Some(format!("status updated, but the approval history could not be saved: {error}"))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActOutcome {
    pub request_id: RequestId,
    pub transition: TransitionOutcome,
    pub audit: AuditWrite,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfficeOutcome {
    pub request_id: RequestId,
    pub transition: TransitionOutcome,
    pub notified: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfficeQueue {
    pub awaiting_cash: Vec<BudgetRequest>,
    pub awaiting_pickup: Vec<BudgetRequest>,
}

/// Request listing for the main screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Organization the listing is restricted to; `None` when unrestricted.
    pub organization: Option<String>,
    /// Newest submission first.
    pub requests: Vec<BudgetRequest>,
    /// Every organization with at least one request. Empty for non-admin roles.
    pub organizations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestDetail {
    pub request: BudgetRequest,
    /// Oldest decision first.
    pub approvals: Vec<ApprovalRecord>,
    pub progress: ProgressProjection,
    pub required_role: Option<Role>,
    /// Whether the viewing actor holds the role the current step waits on.
    pub can_decide: bool,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Runs one workflow operation end to end against the record store.
pub struct LifecycleCoordinator<S, V> {
    store: S,
    views: V,
    notifier: Arc<dyn Notifier>,
    engine: WorkflowEngine,
}

fn request_path(id: &RequestId) -> String {
    format!("/requests/{id}")
}

impl<S, V> LifecycleCoordinator<S, V>
where
    S: RecordStore,
    V: ViewRefresher,
{
    pub fn new(store: S, views: V, notifier: Arc<dyn Notifier>, engine: WorkflowEngine) -> Self {
        Self { store, views, notifier, engine }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    async fn load(&self, request_id: &RequestId) -> Result<BudgetRequest, CoordinatorError> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or_else(|| CoordinatorError::NotFound(request_id.clone()))
    }

    /// Authorizes, computes and commits one status change. Nothing is
    /// written unless every check passes.
    async fn commit(
        &self,
        request: &BudgetRequest,
        actor: &Actor,
        action: WorkflowAction,
    ) -> Result<TransitionOutcome, CoordinatorError> {
        if let Err(error) = self.engine.authorize(actor.role, request.status, action) {
            info!(
                event_name = "workflow.action.refused",
                request_id = %request.id,
                status = %request.status,
                actor_id = %actor.id.0,
                actor_role = %actor.role,
                error = %error,
                "workflow action refused"
            );
            return Err(error.into());
        }

        let outcome = self.engine.apply(request.status, action)?;

        let update = self
            .store
            .update_request_status(&request.id, outcome.from, outcome.to, Utc::now())
            .await?;
        if update == StatusUpdate::Stale {
            warn!(
                event_name = "workflow.status.stale",
                request_id = %request.id,
                expected = %outcome.from,
                "request status changed concurrently; nothing written"
            );
            return Err(CoordinatorError::ConcurrentModification {
                request_id: request.id.clone(),
                expected: outcome.from,
            });
        }

        info!(
            event_name = "workflow.status.committed",
            request_id = %request.id,
            from = %outcome.from,
            to = %outcome.to,
            actor_id = %actor.id.0,
            actor_role = %actor.role,
            "request status committed"
        );
        Ok(outcome)
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        draft: &SubmissionDraft,
    ) -> Result<BudgetRequest, CoordinatorError> {
        let validated = validate_submission(draft).map_err(CoordinatorError::Validation)?;
        if let Some(claimed) = draft.claimed_amount.filter(|claimed| *claimed != validated.amount) {
            info!(
                event_name = "submission.amount_recomputed",
                claimed,
                computed = validated.amount,
                "client-claimed total replaced by computed total"
            );
        }

        let now = Utc::now();
        let request = BudgetRequest {
            id: RequestId(Uuid::new_v4().to_string()),
            title: validated.title,
            organization: validated.organization,
            payee: validated.payee,
            amount: validated.amount,
            status: self.engine.chain().first_status().unwrap_or(RequestStatus::Draft),
            owner_id: actor.id.clone(),
            fund_id: validated.fund_id,
            reason: validated.reason,
            line_items: validated.line_items,
            attachment_url: validated.attachment_url,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_request(&request).await?;
        info!(
            event_name = "submission.stored",
            request_id = %request.id,
            status = %request.status,
            amount = request.amount,
            owner_id = %actor.id.0,
            "request submitted"
        );

        for item in &request.line_items {
            let usage = ItemUsage {
                name: item.name.clone(),
                department: request.organization.clone(),
                unit_price: item.unit_price,
                year: now.year(),
            };
            if let Err(error) = self.store.record_item_usage(&usage).await {
                warn!(
                    event_name = "submission.item_usage_failed",
                    request_id = %request.id,
                    item = %usage.name,
                    error = %error,
                    "could not record item usage"
                );
            }
        }

        self.views.invalidate("/");
        Ok(request)
    }

    pub async fn act(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        decision: Decision,
        comment: &str,
    ) -> Result<ActOutcome, CoordinatorError> {
        let request = self.load(request_id).await?;
        let transition = self.commit(&request, actor, WorkflowAction::Decide(decision)).await?;

        let record = ApprovalRecord::new(request.id.clone(), actor, decision, comment, Utc::now());
        let audit = match self.store.insert_approval_record(&record).await {
            Ok(()) => AuditWrite::Recorded { record },
            Err(error) => {
                warn!(
                    event_name = "workflow.audit.write_failed",
                    request_id = %request.id,
                    decision = %decision,
                    error = %error,
                    "status committed but approval record was not stored"
                );
                AuditWrite::Failed { record, error: error.to_string() }
            }
        };

        self.views.invalidate(&request_path(&request.id));
        self.views.invalidate("/");

        Ok(ActOutcome { request_id: request.id, transition, audit })
    }

    pub async fn mark_ready_for_payment(
        &self,
        request_id: &RequestId,
        actor: &Actor,
    ) -> Result<OfficeOutcome, CoordinatorError> {
        let request = self.load(request_id).await?;
        let transition = self.commit(&request, actor, WorkflowAction::PrepareCash).await?;

        let notified = self.notify_cash_ready(&request).await;

        self.views.invalidate("/office");
        self.views.invalidate("/");
        self.views.invalidate(&request_path(&request.id));

        Ok(OfficeOutcome { request_id: request.id, transition, notified })
    }

    pub async fn mark_completed(
        &self,
        request_id: &RequestId,
        actor: &Actor,
    ) -> Result<OfficeOutcome, CoordinatorError> {
        let request = self.load(request_id).await?;
        let transition = self.commit(&request, actor, WorkflowAction::Disburse).await?;

        info!(
            event_name = "office.disbursement.completed",
            request_id = %request.id,
            title = %request.title,
            amount = request.amount,
            "cash handed over; request completed"
        );

        self.views.invalidate("/office");
        self.views.invalidate("/");
        self.views.invalidate(&request_path(&request.id));

        Ok(OfficeOutcome { request_id: request.id, transition, notified: false })
    }

    async fn notify_cash_ready(&self, request: &BudgetRequest) -> bool {
        let contact = match self.store.find_owner_contact(&request.owner_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                warn!(
                    event_name = "office.notification.no_contact",
                    request_id = %request.id,
                    owner_id = %request.owner_id.0,
                    "request owner has no contact; skipping notification"
                );
                return false;
            }
            Err(error) => {
                warn!(
                    event_name = "office.notification.lookup_failed",
                    request_id = %request.id,
                    error = %error,
                    "could not look up request owner contact"
                );
                return false;
            }
        };

        let notification =
            cash_ready_notification(&contact.email, contact.full_name.as_deref(), &request.title);
        match self.notifier.send(&notification).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "office.notification.failed",
                    request_id = %request.id,
                    error = %error,
                    "cash-ready notification failed"
                );
                false
            }
        }
    }

    pub async fn progress(
        &self,
        request_id: &RequestId,
    ) -> Result<ProgressProjection, CoordinatorError> {
        let request = self.load(request_id).await?;
        let records = self.store.list_approval_records(request_id).await?;
        Ok(project(&request, &records))
    }

    /// Requests waiting on the actor's own chain step.
    pub async fn approval_inbox(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BudgetRequest>, CoordinatorError> {
        match self.engine.chain().step_for_role(actor.role) {
            Some((_, step)) => Ok(self.store.list_requests_by_status(step.status).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Admin roles see every organization and may narrow the list with
    /// `dept_filter`. Everyone else sees only `actor_organization`, and
    /// nothing when it is unknown.
    pub async fn dashboard(
        &self,
        actor: &Actor,
        actor_organization: Option<&str>,
        dept_filter: Option<&str>,
    ) -> Result<Dashboard, CoordinatorError> {
        if actor.role.is_admin() {
            let all = self.store.list_requests(None).await?;
            let organizations = all
                .iter()
                .map(|request| request.organization.trim())
                .filter(|organization| !organization.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let filter = non_blank(dept_filter);
            let requests = match filter {
                Some(dept) => {
                    all.into_iter().filter(|request| request.organization == dept).collect()
                }
                None => all,
            };
            return Ok(Dashboard {
                organization: filter.map(str::to_string),
                requests,
                organizations,
            });
        }

        let Some(organization) = non_blank(actor_organization) else {
            info!(
                event_name = "dashboard.no_organization",
                actor_id = %actor.id.0,
                actor_role = %actor.role,
                "actor has no organization; listing nothing"
            );
            return Ok(Dashboard {
                organization: None,
                requests: Vec::new(),
                organizations: Vec::new(),
            });
        };

        Ok(Dashboard {
            organization: Some(organization.to_string()),
            requests: self.store.list_requests(Some(organization)).await?,
            organizations: Vec::new(),
        })
    }

    pub async fn request_detail(
        &self,
        request_id: &RequestId,
        actor: &Actor,
    ) -> Result<RequestDetail, CoordinatorError> {
        let request = self.load(request_id).await?;
        let approvals = self.store.list_approval_records(request_id).await?;
        let progress = project(&request, &approvals);

        Ok(RequestDetail {
            required_role: self.engine.chain().required_role_for_status(request.status),
            can_decide: can_act(actor.role, request.status),
            request,
            approvals,
            progress,
        })
    }

    /// Item names and last prices used by `department` in `year`, most used first.
    pub async fn item_suggestions(
        &self,
        department: &str,
        year: i32,
    ) -> Result<Vec<ItemCategory>, CoordinatorError> {
        Ok(self.store.list_item_categories(department.trim(), year).await?)
    }

    pub async fn office_queue(&self) -> Result<OfficeQueue, CoordinatorError> {
        Ok(OfficeQueue {
            awaiting_cash: self.store.list_requests_by_status(RequestStatus::Approved).await?,
            awaiting_pickup: self
                .store
                .list_requests_by_status(RequestStatus::ReadyForPayment)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Datelike, TimeZone, Utc};

    use super::{AuditWrite, LifecycleCoordinator};
    use crate::domain::actor::{Actor, UserId};
    use crate::domain::approval::Decision;
    use crate::domain::request::{BudgetRequest, FundId, LineItem, OwnerContact, RequestId};
    use crate::domain::role::Role;
    use crate::domain::status::RequestStatus;
    use crate::errors::CoordinatorError;
    use crate::lifecycle::memory::InMemoryRecordStore;
    use crate::lifecycle::views::RecordingViewRefresher;
    use crate::notification::RecordingNotifier;
    use crate::submission::{LineItemInput, SubmissionDraft};
    use crate::workflow::{StepState, WorkflowEngine};

    type TestCoordinator = LifecycleCoordinator<InMemoryRecordStore, RecordingViewRefresher>;

    fn request(id: &str, status: RequestStatus) -> BudgetRequest {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().expect("valid timestamp");
        BudgetRequest {
            id: RequestId(id.to_owned()),
            title: "Soccer balls".to_owned(),
            organization: "Soccer club".to_owned(),
            payee: "Sports shop".to_owned(),
            amount: 4000,
            status,
            owner_id: UserId("owner-1".to_owned()),
            fund_id: FundId("club-fund".to_owned()),
            reason: "Replacing worn balls".to_owned(),
            line_items: vec![LineItem::priced("ball", 8, 500).expect("fits")],
            attachment_url: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn coordinator(
        store: InMemoryRecordStore,
    ) -> (TestCoordinator, RecordingViewRefresher, RecordingNotifier) {
        coordinator_with_notifier(store, RecordingNotifier::default())
    }

    fn coordinator_with_notifier(
        store: InMemoryRecordStore,
        notifier: RecordingNotifier,
    ) -> (TestCoordinator, RecordingViewRefresher, RecordingNotifier) {
        let views = RecordingViewRefresher::default();
        let coordinator = LifecycleCoordinator::new(
            store,
            views.clone(),
            Arc::new(notifier.clone()),
            WorkflowEngine::default(),
        );
        (coordinator, views, notifier)
    }

    fn id(value: &str) -> RequestId {
        RequestId(value.to_owned())
    }

    fn stored_status(coordinator: &TestCoordinator, request_id: &str) -> RequestStatus {
        coordinator.store().request(&id(request_id)).expect("request exists").status
    }

    #[tokio::test]
    async fn teacher_approval_advances_and_records_history() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-a", RequestStatus::PendingTeacher));
        let (coordinator, views, _) = coordinator(store);
        let teacher = Actor::new("t-1", Role::Teacher);

        let outcome = coordinator
            .act(&id("req-a"), &teacher, Decision::Approved, "  looks fine ")
            .await
            .expect("teacher may approve");

        assert_eq!(outcome.transition.from, RequestStatus::PendingTeacher);
        assert_eq!(outcome.transition.to, RequestStatus::PendingKyoto);
        assert_eq!(stored_status(&coordinator, "req-a"), RequestStatus::PendingKyoto);

        let records = coordinator.store().approval_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].approver_role, Role::Teacher);
        assert_eq!(records[0].decision, Decision::Approved);
        assert_eq!(records[0].comment, "looks fine");
        assert!(matches!(outcome.audit, AuditWrite::Recorded { .. }));
        assert_eq!(outcome.audit.warning(), None);

        let paths = views.paths();
        assert!(paths.contains(&"/requests/req-a".to_owned()));
        assert!(paths.contains(&"/".to_owned()));
    }

    #[tokio::test]
    async fn chairman_approval_makes_request_fully_approved() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-b", RequestStatus::PendingChairman));
        let (coordinator, _, _) = coordinator(store);

        let outcome = coordinator
            .act(&id("req-b"), &Actor::new("c-1", Role::Chairman), Decision::Approved, "")
            .await
            .expect("chairman may approve");

        assert_eq!(outcome.transition.to, RequestStatus::Approved);
        assert_eq!(stored_status(&coordinator, "req-b"), RequestStatus::Approved);
    }

    #[tokio::test]
    async fn wrong_role_is_refused_without_writes() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-c", RequestStatus::PendingTeacher));
        let (coordinator, views, _) = coordinator(store);

        let error = coordinator
            .act(&id("req-c"), &Actor::new("p-1", Role::Principal), Decision::Approved, "")
            .await
            .expect_err("principal acts only on its own step");

        assert_eq!(
            error,
            CoordinatorError::Forbidden { required: vec![Role::Teacher], actual: Role::Principal }
        );
        assert!(error.to_string().contains("`teacher`"));
        assert_eq!(stored_status(&coordinator, "req-c"), RequestStatus::PendingTeacher);
        assert!(coordinator.store().approval_records().is_empty());
        assert!(views.paths().is_empty());
    }

    #[tokio::test]
    async fn rejection_is_absorbing() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-d", RequestStatus::PendingPrincipal));
        let (coordinator, _, _) = coordinator(store);
        let principal = Actor::new("p-1", Role::Principal);

        let outcome = coordinator
            .act(&id("req-d"), &principal, Decision::Rejected, "over budget")
            .await
            .expect("principal may reject");
        assert_eq!(outcome.transition.to, RequestStatus::Rejected);

        let error = coordinator
            .act(&id("req-d"), &principal, Decision::Approved, "")
            .await
            .expect_err("rejected requests accept no further decisions");
        assert!(matches!(
            error,
            CoordinatorError::InvalidState { status: RequestStatus::Rejected, .. }
        ));
        assert_eq!(stored_status(&coordinator, "req-d"), RequestStatus::Rejected);
        assert_eq!(coordinator.store().approval_records().len(), 1);
    }

    #[tokio::test]
    async fn repeated_decision_does_not_advance_twice() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-e", RequestStatus::PendingTeacher));
        let (coordinator, _, _) = coordinator(store);
        let teacher = Actor::new("t-1", Role::Teacher);

        coordinator
            .act(&id("req-e"), &teacher, Decision::Approved, "")
            .await
            .expect("first approval");
        let error = coordinator
            .act(&id("req-e"), &teacher, Decision::Approved, "")
            .await
            .expect_err("the teacher step is already done");

        assert!(matches!(error, CoordinatorError::Forbidden { .. }));
        assert_eq!(stored_status(&coordinator, "req-e"), RequestStatus::PendingKyoto);
        assert_eq!(coordinator.store().approval_records().len(), 1);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (coordinator, _, _) = coordinator(InMemoryRecordStore::default());

        let error = coordinator
            .act(&id("missing"), &Actor::new("t-1", Role::Teacher), Decision::Approved, "")
            .await
            .expect_err("nothing to act on");

        assert_eq!(error, CoordinatorError::NotFound(id("missing")));
    }

    #[tokio::test]
    async fn failed_status_write_leaves_request_untouched() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-f", RequestStatus::PendingTeacher));
        store.fail_status_updates(true);
        let (coordinator, views, _) = coordinator(store);

        let error = coordinator
            .act(&id("req-f"), &Actor::new("t-1", Role::Teacher), Decision::Approved, "")
            .await
            .expect_err("write failure surfaces");

        assert!(matches!(error, CoordinatorError::Persistence(_)));
        assert_eq!(stored_status(&coordinator, "req-f"), RequestStatus::PendingTeacher);
        assert!(coordinator.store().approval_records().is_empty());
        assert!(views.paths().is_empty());
    }

    #[tokio::test]
    async fn failed_audit_write_keeps_status_and_warns() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-g", RequestStatus::PendingTeacher));
        store.fail_approval_inserts(true);
        let (coordinator, views, _) = coordinator(store);

        let outcome = coordinator
            .act(&id("req-g"), &Actor::new("t-1", Role::Teacher), Decision::Approved, "ok")
            .await
            .expect("status change succeeds even without history");

        assert_eq!(stored_status(&coordinator, "req-g"), RequestStatus::PendingKyoto);
        assert!(matches!(outcome.audit, AuditWrite::Failed { .. }));
        assert!(outcome.audit.warning().is_some_and(|w| w.contains("approval history")));
        assert!(coordinator.store().approval_records().is_empty());
        assert!(views.paths().contains(&"/requests/req-g".to_owned()));
    }

    #[tokio::test]
    async fn concurrent_change_is_reported_and_not_overwritten() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-h", RequestStatus::PendingTeacher));
        store.interleave_status_change(RequestStatus::Rejected);
        let (coordinator, _, _) = coordinator(store);

        let error = coordinator
            .act(&id("req-h"), &Actor::new("t-1", Role::Teacher), Decision::Approved, "")
            .await
            .expect_err("another writer got there first");

        assert_eq!(
            error,
            CoordinatorError::ConcurrentModification {
                request_id: id("req-h"),
                expected: RequestStatus::PendingTeacher,
            }
        );
        assert_eq!(stored_status(&coordinator, "req-h"), RequestStatus::Rejected);
        assert!(coordinator.store().approval_records().is_empty());
    }

    #[tokio::test]
    async fn full_chain_then_office_steps_complete_the_request() {
        let owner = UserId("owner-1".to_owned());
        let store = InMemoryRecordStore::default()
            .with_request(request("req-i", RequestStatus::PendingTeacher))
            .with_contact(
                &owner,
                OwnerContact {
                    email: "owner@school.example".to_owned(),
                    full_name: Some("Aoi Tanaka".to_owned()),
                },
            );
        let (coordinator, views, notifier) = coordinator(store);

        for role in [
            Role::Teacher,
            Role::Kyoto,
            Role::VicePrincipal,
            Role::Principal,
            Role::OfficeChief,
            Role::Chairman,
        ] {
            coordinator
                .act(&id("req-i"), &Actor::new(format!("{role}-1"), role), Decision::Approved, "")
                .await
                .expect("each step approves in turn");
        }
        assert_eq!(stored_status(&coordinator, "req-i"), RequestStatus::Approved);

        let accounting = Actor::new("acc-1", Role::Accounting);
        let ready = coordinator
            .mark_ready_for_payment(&id("req-i"), &accounting)
            .await
            .expect("accounting prepares cash");
        assert_eq!(ready.transition.to, RequestStatus::ReadyForPayment);
        assert!(ready.notified);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@school.example");
        assert_eq!(sent[0].subject, "[Cash ready] Soccer balls");
        assert!(sent[0].body.contains("Aoi Tanaka"));

        let done = coordinator
            .mark_completed(&id("req-i"), &accounting)
            .await
            .expect("accounting hands over cash");
        assert_eq!(done.transition.to, RequestStatus::Completed);
        assert_eq!(stored_status(&coordinator, "req-i"), RequestStatus::Completed);
        assert!(views.paths().contains(&"/office".to_owned()));

        let progress = coordinator.progress(&id("req-i")).await.expect("progress");
        assert_eq!(progress.done_count(), 6);
        assert!(progress.steps.iter().all(|step| step.state == StepState::Done));
    }

    #[tokio::test]
    async fn office_actions_require_office_role_and_exact_status() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-j", RequestStatus::PendingChairman))
            .with_request(request("req-k", RequestStatus::Approved));
        let (coordinator, _, notifier) = coordinator(store);

        let error = coordinator
            .mark_ready_for_payment(&id("req-j"), &Actor::new("acc-1", Role::Accounting))
            .await
            .expect_err("chain is not finished");
        assert!(matches!(
            error,
            CoordinatorError::InvalidState { status: RequestStatus::PendingChairman, .. }
        ));

        let error = coordinator
            .mark_ready_for_payment(&id("req-k"), &Actor::new("t-1", Role::Teacher))
            .await
            .expect_err("teachers cannot prepare cash");
        assert_eq!(
            error,
            CoordinatorError::Forbidden {
                required: vec![Role::Accounting, Role::OfficeChief],
                actual: Role::Teacher,
            }
        );

        let error = coordinator
            .mark_completed(&id("req-k"), &Actor::new("acc-1", Role::Accounting))
            .await
            .expect_err("cash must be prepared first");
        assert!(matches!(error, CoordinatorError::InvalidState { .. }));

        assert_eq!(stored_status(&coordinator, "req-k"), RequestStatus::Approved);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn notification_problems_do_not_block_cash_preparation() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-l", RequestStatus::Approved));
        let (coordinator, _, _) = coordinator(store);

        let outcome = coordinator
            .mark_ready_for_payment(&id("req-l"), &Actor::new("oc-1", Role::OfficeChief))
            .await
            .expect("status still advances without a contact");
        assert!(!outcome.notified);
        assert_eq!(stored_status(&coordinator, "req-l"), RequestStatus::ReadyForPayment);

        let owner = UserId("owner-1".to_owned());
        let store = InMemoryRecordStore::default()
            .with_request(request("req-m", RequestStatus::Approved))
            .with_contact(&owner, OwnerContact { email: "o@example.test".to_owned(), full_name: None });
        let (coordinator, _, _) = coordinator_with_notifier(store, RecordingNotifier::failing());

        let outcome = coordinator
            .mark_ready_for_payment(&id("req-m"), &Actor::new("acc-1", Role::Accounting))
            .await
            .expect("status still advances when delivery fails");
        assert!(!outcome.notified);
        assert_eq!(stored_status(&coordinator, "req-m"), RequestStatus::ReadyForPayment);
    }

    #[tokio::test]
    async fn progress_marks_rejected_step() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-n", RequestStatus::PendingTeacher));
        let (coordinator, _, _) = coordinator(store);

        coordinator
            .act(&id("req-n"), &Actor::new("t-1", Role::Teacher), Decision::Approved, "")
            .await
            .expect("teacher approves");
        coordinator
            .act(&id("req-n"), &Actor::new("k-1", Role::Kyoto), Decision::Rejected, "no")
            .await
            .expect("head teacher rejects");

        let progress = coordinator.progress(&id("req-n")).await.expect("progress");
        assert_eq!(progress.status, RequestStatus::Rejected);
        assert_eq!(progress.steps[0].state, StepState::Done);
        assert_eq!(progress.steps[1].state, StepState::RejectedAt);
        assert_eq!(progress.steps[2].state, StepState::Waiting);
    }

    #[tokio::test]
    async fn submit_recomputes_total_and_starts_the_chain() {
        let (coordinator, views, _) = coordinator(InMemoryRecordStore::default());
        let draft = SubmissionDraft {
            organization: "Soccer club".to_owned(),
            title: "Soccer balls".to_owned(),
            payee: "Sports shop".to_owned(),
            fund_id: "club-fund".to_owned(),
            reason: "Replacing worn balls".to_owned(),
            line_items: vec![
                LineItemInput { name: "ball".to_owned(), quantity: 2, unit_price: 500 },
                LineItemInput { name: "net".to_owned(), quantity: 1, unit_price: 3000 },
                LineItemInput { name: "   ".to_owned(), quantity: 9, unit_price: 9 },
            ],
            claimed_amount: Some(9999),
            attachment: None,
        };

        let created = coordinator
            .submit(&Actor::new("owner-1", Role::Teacher), &draft)
            .await
            .expect("valid draft");

        assert_eq!(created.amount, 4000);
        assert_eq!(created.status, RequestStatus::PendingTeacher);
        assert_eq!(created.line_items.len(), 2);
        assert_eq!(created.owner_id, UserId("owner-1".to_owned()));
        assert_eq!(coordinator.store().request(&created.id), Some(created.clone()));
        assert_eq!(coordinator.store().item_categories().len(), 2);
        assert_eq!(views.paths(), vec!["/".to_owned()]);
    }

    #[tokio::test]
    async fn submit_rejects_invalid_draft_without_writes() {
        let (coordinator, _, _) = coordinator(InMemoryRecordStore::default());

        let error = coordinator
            .submit(&Actor::new("owner-1", Role::Teacher), &SubmissionDraft::default())
            .await
            .expect_err("empty draft");

        let CoordinatorError::Validation(errors) = error else {
            panic!("expected validation error");
        };
        assert!(errors.get("title").is_some());
        assert!(coordinator.store().item_categories().is_empty());
    }

    #[tokio::test]
    async fn item_usage_failure_does_not_fail_submission() {
        let store = InMemoryRecordStore::default();
        store.fail_item_usage(true);
        let (coordinator, _, _) = coordinator(store);
        let draft = SubmissionDraft {
            organization: "Art club".to_owned(),
            title: "Paint".to_owned(),
            payee: "Art supply".to_owned(),
            fund_id: "club-fund".to_owned(),
            reason: "Festival poster".to_owned(),
            line_items: vec![LineItemInput {
                name: "paint".to_owned(),
                quantity: 3,
                unit_price: 700,
            }],
            claimed_amount: None,
            attachment: None,
        };

        let created = coordinator
            .submit(&Actor::new("owner-2", Role::Teacher), &draft)
            .await
            .expect("usage tracking is best effort");
        assert_eq!(created.amount, 2100);
    }

    #[tokio::test]
    async fn queues_list_requests_by_step() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-o", RequestStatus::Approved))
            .with_request(request("req-p", RequestStatus::ReadyForPayment))
            .with_request(request("req-q", RequestStatus::PendingPrincipal));
        let (coordinator, _, _) = coordinator(store);

        let queue = coordinator.office_queue().await.expect("queue");
        assert_eq!(queue.awaiting_cash.len(), 1);
        assert_eq!(queue.awaiting_cash[0].id, id("req-o"));
        assert_eq!(queue.awaiting_pickup[0].id, id("req-p"));

        let inbox = coordinator
            .approval_inbox(&Actor::new("p-1", Role::Principal))
            .await
            .expect("inbox");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, id("req-q"));

        let none = coordinator
            .approval_inbox(&Actor::new("acc-1", Role::Accounting))
            .await
            .expect("inbox");
        assert!(none.is_empty());
    }

    fn request_in(id: &str, organization: &str, minutes: i64) -> BudgetRequest {
        let mut base = request(id, RequestStatus::PendingTeacher);
        base.organization = organization.to_owned();
        base.created_at = base.created_at + chrono::Duration::minutes(minutes);
        base
    }

    #[tokio::test]
    async fn admins_see_every_organization_and_may_filter() {
        let store = InMemoryRecordStore::default()
            .with_request(request_in("req-s1", "Soccer club", 0))
            .with_request(request_in("req-c1", "Choir", 10))
            .with_request(request_in("req-s2", "Soccer club", 20));
        let (coordinator, _, _) = coordinator(store);
        let principal = Actor::new("p-1", Role::Principal);

        let all = coordinator.dashboard(&principal, None, None).await.expect("dashboard");
        let ids: Vec<_> = all.requests.iter().map(|request| request.id.0.as_str()).collect();
        assert_eq!(ids, vec!["req-s2", "req-c1", "req-s1"]);
        assert_eq!(all.organization, None);
        assert_eq!(all.organizations, vec!["Choir".to_owned(), "Soccer club".to_owned()]);

        let blank = coordinator.dashboard(&principal, None, Some("  ")).await.expect("dashboard");
        assert_eq!(blank.requests.len(), 3);

        let choir = coordinator.dashboard(&principal, None, Some("Choir")).await.expect("dashboard");
        assert_eq!(choir.organization.as_deref(), Some("Choir"));
        assert_eq!(choir.requests.len(), 1);
        assert_eq!(choir.requests[0].id, id("req-c1"));
    }

    #[tokio::test]
    async fn non_admins_are_pinned_to_their_own_organization() {
        let store = InMemoryRecordStore::default()
            .with_request(request_in("req-s1", "Soccer club", 0))
            .with_request(request_in("req-c1", "Choir", 10));
        let (coordinator, _, _) = coordinator(store);
        let teacher = Actor::new("t-1", Role::Teacher);

        let own = coordinator
            .dashboard(&teacher, Some("Soccer club"), Some("Choir"))
            .await
            .expect("dashboard");
        assert_eq!(own.organization.as_deref(), Some("Soccer club"));
        assert_eq!(own.requests.len(), 1);
        assert_eq!(own.requests[0].id, id("req-s1"));
        assert!(own.organizations.is_empty());

        let unknown = coordinator
            .dashboard(&Actor::new("s-1", Role::Student), None, None)
            .await
            .expect("dashboard");
        assert!(unknown.requests.is_empty());
    }

    #[tokio::test]
    async fn request_detail_carries_history_and_whose_turn_it_is() {
        let store = InMemoryRecordStore::default()
            .with_request(request("req-d", RequestStatus::PendingTeacher));
        let (coordinator, _, _) = coordinator(store);
        let teacher = Actor::new("t-1", Role::Teacher);

        coordinator.act(&id("req-d"), &teacher, Decision::Approved, "ok").await.expect("approve");

        let kyoto_view = coordinator
            .request_detail(&id("req-d"), &Actor::new("k-1", Role::Kyoto))
            .await
            .expect("detail");
        assert_eq!(kyoto_view.request.status, RequestStatus::PendingKyoto);
        assert_eq!(kyoto_view.approvals.len(), 1);
        assert_eq!(kyoto_view.approvals[0].comment, "ok");
        assert_eq!(kyoto_view.required_role, Some(Role::Kyoto));
        assert!(kyoto_view.can_decide);
        assert_eq!(kyoto_view.progress.steps[0].state, StepState::Done);

        let teacher_view = coordinator.request_detail(&id("req-d"), &teacher).await.expect("detail");
        assert!(!teacher_view.can_decide);

        let missing = coordinator.request_detail(&id("nope"), &teacher).await;
        assert!(matches!(missing, Err(CoordinatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn item_suggestions_reflect_recorded_usage() {
        let (coordinator, _, _) = coordinator(InMemoryRecordStore::default());
        let owner = Actor::new("owner-3", Role::Teacher);
        let draft = |items: Vec<LineItemInput>| SubmissionDraft {
            organization: "Soccer club".to_owned(),
            title: "Gear".to_owned(),
            payee: "Sports shop".to_owned(),
            fund_id: "club-fund".to_owned(),
            reason: "Season start".to_owned(),
            line_items: items,
            claimed_amount: None,
            attachment: None,
        };
        let item = |name: &str, unit_price| LineItemInput {
            name: name.to_owned(),
            quantity: 1,
            unit_price,
        };

        let first = coordinator
            .submit(&owner, &draft(vec![item("ball", 500), item("cone", 100)]))
            .await
            .expect("submit");
        coordinator.submit(&owner, &draft(vec![item("ball", 550)])).await.expect("submit");

        let year = first.created_at.year();
        let suggestions =
            coordinator.item_suggestions(" Soccer club ", year).await.expect("suggestions");
        let names: Vec<_> = suggestions.iter().map(|category| category.name.as_str()).collect();
        assert_eq!(names, vec!["ball", "cone"]);
        assert_eq!(suggestions[0].use_count, 2);
        assert_eq!(suggestions[0].unit_price, 550);

        assert!(coordinator.item_suggestions("Choir", year).await.expect("empty").is_empty());
    }
}
