use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::{Actor, UserId};
use crate::domain::request::RequestId;
use crate::domain::role::Role;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRecordId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Some(Self::Approved),
            "rejected" | "reject" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit entry for one approve/reject decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: ApprovalRecordId,
    pub request_id: RequestId,
    pub approver_id: UserId,
    pub approver_role: Role,
    pub decision: Decision,
    pub comment: String,
    pub decided_at: DateTime<Utc>,
}

impl ApprovalRecord {
    pub fn new(
        request_id: RequestId,
        actor: &Actor,
        decision: Decision,
        comment: impl Into<String>,
        decided_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApprovalRecordId(Uuid::new_v4().to_string()),
            request_id,
            approver_id: actor.id.clone(),
            approver_role: actor.role,
            decision,
            comment: comment.into().trim().to_string(),
            decided_at,
        }
    }
}
