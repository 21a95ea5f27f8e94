//! JSON API over the request lifecycle.
//!
//! - `GET  /requests?dept=`                   dashboard listing
//! - `POST /requests`                         submit a new request
//! - `GET  /requests/{id}`                    request with approval history
//! - `GET  /requests/{id}/progress`           approval progress
//! - `POST /requests/{id}/decision`           approve or reject the current step
//! - `POST /requests/{id}/ready-for-payment`  office: cash prepared
//! - `POST /requests/{id}/complete`           office: cash handed over
//! - `GET  /inbox`                            requests waiting on the caller's step
//! - `GET  /office/queue`                     office work queues
//! - `GET  /item-categories?department=&year=` item name and price suggestions
//!
//! Callers identify themselves with `x-actor-id` and `x-actor-role`, and
//! optionally `x-actor-organization` for the dashboard.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use budgetflow_core::domain::actor::Actor;
use budgetflow_core::domain::approval::Decision;
use budgetflow_core::domain::request::{BudgetRequest, ItemCategory, RequestId};
use budgetflow_core::domain::role::Role;
use budgetflow_core::domain::status::RequestStatus;
use budgetflow_core::errors::{CoordinatorError, InterfaceError};
use budgetflow_core::lifecycle::{Dashboard, OfficeOutcome, OfficeQueue, RequestDetail};
use budgetflow_core::submission::SubmissionDraft;
use budgetflow_core::workflow::ProgressProjection;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::ServerCoordinator;

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_ROLE_HEADER: &str = "x-actor-role";
const ACTOR_ORGANIZATION_HEADER: &str = "x-actor-organization";
const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    coordinator: Arc<ServerCoordinator>,
}

impl ApiState {
    pub fn new(coordinator: Arc<ServerCoordinator>) -> Self {
        Self { coordinator }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/requests", get(list_requests).post(submit_request))
        .route("/requests/{id}", get(request_detail))
        .route("/requests/{id}/progress", get(request_progress))
        .route("/requests/{id}/decision", post(decide_request))
        .route("/requests/{id}/ready-for-payment", post(mark_ready_for_payment))
        .route("/requests/{id}/complete", post(mark_completed))
        .route("/inbox", get(approval_inbox))
        .route("/office/queue", get(office_queue))
        .route("/item-categories", get(item_categories))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request context
// ---------------------------------------------------------------------------

/// The calling actor plus a correlation id for logs and error bodies.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub actor: Actor,
    pub organization: Option<String>,
    pub correlation_id: String,
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = correlation_id(&parts.headers);

        let Some(actor_id) = header(&parts.headers, ACTOR_ID_HEADER) else {
            return Err(ApiError::unauthenticated("missing x-actor-id header", correlation_id));
        };
        let Some(role_code) = header(&parts.headers, ACTOR_ROLE_HEADER) else {
            return Err(ApiError::unauthenticated("missing x-actor-role header", correlation_id));
        };
        let Some(role) = Role::parse(role_code) else {
            return Err(ApiError::unauthenticated(
                format!("unknown role `{role_code}`"),
                correlation_id,
            ));
        };

        let organization = header(&parts.headers, ACTOR_ORGANIZATION_HEADER).map(str::to_string);

        Ok(Self { actor: Actor::new(actor_id, role), organization, correlation_id })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn unauthenticated(detail: impl Into<String>, correlation_id: String) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorBody {
                error: "Sign in to continue.".to_string(),
                detail: detail.into(),
                correlation_id,
            },
        }
    }

    fn bad_request(detail: impl Into<String>, correlation_id: String) -> Self {
        let interface =
            InterfaceError::BadRequest { message: detail.into(), correlation_id };
        interface.into()
    }

    fn from_coordinator(error: CoordinatorError, correlation_id: &str) -> Self {
        warn!(
            event_name = "api.request.failed",
            correlation_id = %correlation_id,
            error = %error,
            "request failed"
        );
        error.into_interface(correlation_id).into()
    }
}

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        let status = match value {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            body: ErrorBody {
                error: value.user_message().to_string(),
                detail: value.message().to_string(),
                correlation_id: value.correlation_id().to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decision: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub dept: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemCategoryQuery {
    pub department: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub request_id: String,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub decision: Decision,
    pub audit_recorded: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OfficeResponse {
    pub request_id: String,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub notified: bool,
}

impl From<OfficeOutcome> for OfficeResponse {
    fn from(value: OfficeOutcome) -> Self {
        Self {
            request_id: value.request_id.0,
            from: value.transition.from,
            to: value.transition.to,
            notified: value.notified,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_requests(
    State(state): State<ApiState>,
    context: RequestContext,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = state
        .coordinator
        .dashboard(&context.actor, context.organization.as_deref(), query.dept.as_deref())
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(dashboard))
}

async fn request_detail(
    State(state): State<ApiState>,
    context: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<RequestDetail>, ApiError> {
    let detail = state
        .coordinator
        .request_detail(&RequestId(id), &context.actor)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(detail))
}

async fn submit_request(
    State(state): State<ApiState>,
    context: RequestContext,
    Json(draft): Json<SubmissionDraft>,
) -> Result<(StatusCode, Json<BudgetRequest>), ApiError> {
    let request = state
        .coordinator
        .submit(&context.actor, &draft)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;

    info!(
        event_name = "api.request.submitted",
        correlation_id = %context.correlation_id,
        request_id = %request.id,
        "request submitted"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

async fn request_progress(
    State(state): State<ApiState>,
    context: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<ProgressProjection>, ApiError> {
    let progress = state
        .coordinator
        .progress(&RequestId(id))
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(progress))
}

async fn decide_request(
    State(state): State<ApiState>,
    context: RequestContext,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let Some(decision) = Decision::parse(&body.decision) else {
        return Err(ApiError::bad_request(
            format!("decision must be `approved` or `rejected`, got `{}`", body.decision),
            context.correlation_id,
        ));
    };

    let outcome = state
        .coordinator
        .act(&RequestId(id), &context.actor, decision, &body.comment)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;

    let warning = outcome.audit.warning();
    info!(
        event_name = "api.request.decided",
        correlation_id = %context.correlation_id,
        request_id = %outcome.request_id,
        decision = %decision,
        to = %outcome.transition.to,
        audit_recorded = warning.is_none(),
        "decision applied"
    );

    Ok(Json(DecisionResponse {
        request_id: outcome.request_id.0,
        from: outcome.transition.from,
        to: outcome.transition.to,
        decision,
        audit_recorded: warning.is_none(),
        warning,
    }))
}

async fn mark_ready_for_payment(
    State(state): State<ApiState>,
    context: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<OfficeResponse>, ApiError> {
    let outcome = state
        .coordinator
        .mark_ready_for_payment(&RequestId(id), &context.actor)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(outcome.into()))
}

async fn mark_completed(
    State(state): State<ApiState>,
    context: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<OfficeResponse>, ApiError> {
    let outcome = state
        .coordinator
        .mark_completed(&RequestId(id), &context.actor)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(outcome.into()))
}

async fn approval_inbox(
    State(state): State<ApiState>,
    context: RequestContext,
) -> Result<Json<Vec<BudgetRequest>>, ApiError> {
    let requests = state
        .coordinator
        .approval_inbox(&context.actor)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(requests))
}

async fn office_queue(
    State(state): State<ApiState>,
    context: RequestContext,
) -> Result<Json<OfficeQueue>, ApiError> {
    let office = state.coordinator.engine().office_policy();
    if !office.allows(context.actor.role) {
        let error = CoordinatorError::Forbidden {
            required: office.roles().to_vec(),
            actual: context.actor.role,
        };
        return Err(ApiError::from_coordinator(error, &context.correlation_id));
    }

    let queue = state
        .coordinator
        .office_queue()
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(queue))
}

async fn item_categories(
    State(state): State<ApiState>,
    context: RequestContext,
    Query(query): Query<ItemCategoryQuery>,
) -> Result<Json<Vec<ItemCategory>>, ApiError> {
    if query.department.trim().is_empty() {
        return Err(ApiError::bad_request("department must not be blank", context.correlation_id));
    }
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let categories = state
        .coordinator
        .item_suggestions(&query.department, year)
        .await
        .map_err(|error| ApiError::from_coordinator(error, &context.correlation_id))?;
    Ok(Json(categories))
}
