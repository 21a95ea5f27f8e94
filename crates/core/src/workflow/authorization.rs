use serde::{Deserialize, Serialize};

use crate::domain::role::Role;
use crate::domain::status::RequestStatus;
use crate::workflow::chain::required_role_for_status;

/// Strict single-approver-per-step check. Statuses with no designated
/// approver (draft, post-chain, rejected) are closed to every role.
pub fn can_act(actor_role: Role, status: RequestStatus) -> bool {
    required_role_for_status(status) == Some(actor_role)
}

/// Roles allowed to run the cash preparation and disbursement steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficePolicy {
    roles: Vec<Role>,
}

impl OfficePolicy {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn allows(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl Default for OfficePolicy {
    fn default() -> Self {
        Self::new(vec![Role::Accounting, Role::OfficeChief])
    }
}
