use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    PendingTeacher,
    PendingKyoto,
    PendingVicePrincipal,
    PendingPrincipal,
    PendingOffice,
    PendingChairman,
    Approved,
    ReadyForPayment,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 11] = [
        Self::Draft,
        Self::PendingTeacher,
        Self::PendingKyoto,
        Self::PendingVicePrincipal,
        Self::PendingPrincipal,
        Self::PendingOffice,
        Self::PendingChairman,
        Self::Approved,
        Self::ReadyForPayment,
        Self::Completed,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingTeacher => "pending_teacher",
            Self::PendingKyoto => "pending_kyoto",
            Self::PendingVicePrincipal => "pending_vice_principal",
            Self::PendingPrincipal => "pending_principal",
            Self::PendingOffice => "pending_office",
            Self::PendingChairman => "pending_chairman",
            Self::Approved => "approved",
            Self::ReadyForPayment => "ready_for_payment",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending_teacher" => Some(Self::PendingTeacher),
            "pending_kyoto" => Some(Self::PendingKyoto),
            "pending_vice_principal" => Some(Self::PendingVicePrincipal),
            "pending_principal" => Some(Self::PendingPrincipal),
            "pending_office" => Some(Self::PendingOffice),
            "pending_chairman" => Some(Self::PendingChairman),
            "approved" => Some(Self::Approved),
            "ready_for_payment" => Some(Self::ReadyForPayment),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingTeacher => "Awaiting teacher approval",
            Self::PendingKyoto => "Awaiting head teacher approval",
            Self::PendingVicePrincipal => "Awaiting vice principal approval",
            Self::PendingPrincipal => "Awaiting principal approval",
            Self::PendingOffice => "Awaiting office chief approval",
            Self::PendingChairman => "Awaiting chairman approval",
            Self::Approved => "Fully approved, awaiting cash",
            Self::ReadyForPayment => "Cash prepared, awaiting pickup",
            Self::Completed => "Disbursed",
            Self::Rejected => "Rejected",
        }
    }

    /// `completed` and `rejected` accept no further action of any kind.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// True for the three post-chain success states.
    pub fn is_fully_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::ReadyForPayment | Self::Completed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
