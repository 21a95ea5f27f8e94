use serde::Serialize;

use crate::domain::role::Role;
use crate::domain::status::RequestStatus;

/// One role-gated stage of the approval sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
    pub status: RequestStatus,
    pub role: Role,
    pub label: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NextStatus {
    /// The following pending step.
    Chain(RequestStatus),
    /// The last step was cleared; the request is fully approved.
    FinalApproval,
    /// The status is not a pending chain status.
    None,
}

impl NextStatus {
    pub fn status(&self) -> Option<RequestStatus> {
        match self {
            Self::Chain(status) => Some(*status),
            Self::FinalApproval => Some(RequestStatus::Approved),
            Self::None => None,
        }
    }
}

/// Ordered approval chain. Step `i` must complete before step `i + 1` becomes
/// active; statuses are unique across steps.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalChain {
    steps: &'static [Step],
}

pub static APPROVAL_CHAIN: ApprovalChain = ApprovalChain {
    steps: &[
        Step { status: RequestStatus::PendingTeacher, role: Role::Teacher, label: "Teacher in charge" },
        Step { status: RequestStatus::PendingKyoto, role: Role::Kyoto, label: "Head teacher" },
        Step {
            status: RequestStatus::PendingVicePrincipal,
            role: Role::VicePrincipal,
            label: "Vice principal",
        },
        Step { status: RequestStatus::PendingPrincipal, role: Role::Principal, label: "Principal" },
        Step { status: RequestStatus::PendingOffice, role: Role::OfficeChief, label: "Office chief" },
        Step { status: RequestStatus::PendingChairman, role: Role::Chairman, label: "Chairman" },
    ],
};

impl ApprovalChain {
    pub fn steps(&self) -> &'static [Step] {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Status a freshly submitted request enters.
    pub fn first_status(&self) -> Option<RequestStatus> {
        self.steps.first().map(|step| step.status)
    }

    pub fn index_of(&self, status: RequestStatus) -> Option<usize> {
        self.steps.iter().position(|step| step.status == status)
    }

    pub fn step_for_status(&self, status: RequestStatus) -> Option<&'static Step> {
        self.steps.iter().find(|step| step.status == status)
    }

    pub fn required_role_for_status(&self, status: RequestStatus) -> Option<Role> {
        self.step_for_status(status).map(|step| step.role)
    }

    pub fn step_for_role(&self, role: Role) -> Option<(usize, &'static Step)> {
        self.steps.iter().enumerate().find(|(_, step)| step.role == role)
    }

    pub fn next_status(&self, status: RequestStatus) -> NextStatus {
        match self.index_of(status) {
            Some(index) if index + 1 == self.steps.len() => NextStatus::FinalApproval,
            Some(index) => NextStatus::Chain(self.steps[index + 1].status),
            None => NextStatus::None,
        }
    }

    /// `-1` for `draft`, `rejected` or anything off the chain; the index of the
    /// pending step for in-chain statuses; `len()` once fully approved.
    pub fn completed_step_index(&self, status: RequestStatus) -> i32 {
        if let Some(index) = self.index_of(status) {
            return index as i32;
        }
        if status.is_fully_approved() {
            return self.steps.len() as i32;
        }
        -1
    }
}

pub fn step_for_status(status: RequestStatus) -> Option<&'static Step> {
    APPROVAL_CHAIN.step_for_status(status)
}

pub fn required_role_for_status(status: RequestStatus) -> Option<Role> {
    APPROVAL_CHAIN.required_role_for_status(status)
}

pub fn next_status(status: RequestStatus) -> NextStatus {
    APPROVAL_CHAIN.next_status(status)
}

pub fn completed_step_index(status: RequestStatus) -> i32 {
    APPROVAL_CHAIN.completed_step_index(status)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{
        completed_step_index, next_status, required_role_for_status, NextStatus, APPROVAL_CHAIN,
    };
    use crate::domain::role::Role;
    use crate::domain::status::RequestStatus;

    #[test]
    fn chain_has_six_unique_pending_steps() {
        let steps = APPROVAL_CHAIN.steps();
        assert_eq!(steps.len(), 6);

        let unique: HashSet<_> = steps.iter().map(|step| step.status).collect();
        assert_eq!(unique.len(), steps.len());
        assert_eq!(APPROVAL_CHAIN.first_status(), Some(RequestStatus::PendingTeacher));
    }

    #[test]
    fn next_status_walks_the_chain_then_reaches_approved() {
        let steps = APPROVAL_CHAIN.steps();
        for (index, step) in steps.iter().enumerate() {
            let expected = match steps.get(index + 1) {
                Some(next) => NextStatus::Chain(next.status),
                None => NextStatus::FinalApproval,
            };
            assert_eq!(next_status(step.status), expected, "step {index}");
        }
        assert_eq!(next_status(RequestStatus::PendingChairman).status(), Some(RequestStatus::Approved));
    }

    #[test]
    fn statuses_off_the_chain_have_no_next_status_or_role() {
        for status in [
            RequestStatus::Draft,
            RequestStatus::Approved,
            RequestStatus::ReadyForPayment,
            RequestStatus::Completed,
            RequestStatus::Rejected,
        ] {
            assert_eq!(next_status(status), NextStatus::None);
            assert_eq!(required_role_for_status(status), None);
        }
    }

    #[test]
    fn required_roles_follow_the_chain_order() {
        assert_eq!(required_role_for_status(RequestStatus::PendingTeacher), Some(Role::Teacher));
        assert_eq!(required_role_for_status(RequestStatus::PendingKyoto), Some(Role::Kyoto));
        assert_eq!(required_role_for_status(RequestStatus::PendingOffice), Some(Role::OfficeChief));
        assert_eq!(required_role_for_status(RequestStatus::PendingChairman), Some(Role::Chairman));
    }

    #[test]
    fn completed_step_index_sentinels() {
        assert_eq!(completed_step_index(RequestStatus::Draft), -1);
        assert_eq!(completed_step_index(RequestStatus::Rejected), -1);
        assert_eq!(completed_step_index(RequestStatus::PendingTeacher), 0);
        assert_eq!(completed_step_index(RequestStatus::PendingChairman), 5);
        assert_eq!(completed_step_index(RequestStatus::Approved), 6);
        assert_eq!(completed_step_index(RequestStatus::ReadyForPayment), 6);
        assert_eq!(completed_step_index(RequestStatus::Completed), 6);
    }

    #[test]
    fn completed_step_index_never_decreases_along_a_full_run() {
        let mut sequence = vec![RequestStatus::Draft];
        sequence.extend(APPROVAL_CHAIN.steps().iter().map(|step| step.status));
        sequence.extend([
            RequestStatus::Approved,
            RequestStatus::ReadyForPayment,
            RequestStatus::Completed,
        ]);

        let indices: Vec<i32> = sequence.into_iter().map(completed_step_index).collect();
        assert!(indices.windows(2).all(|pair| pair[0] <= pair[1]), "{indices:?}");
    }
}
