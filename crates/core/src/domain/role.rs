use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Kyoto,
    VicePrincipal,
    Principal,
    OfficeChief,
    Chairman,
    Accounting,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Self::Student,
        Self::Teacher,
        Self::Kyoto,
        Self::VicePrincipal,
        Self::Principal,
        Self::OfficeChief,
        Self::Chairman,
        Self::Accounting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Kyoto => "kyoto",
            Self::VicePrincipal => "vice_principal",
            Self::Principal => "principal",
            Self::OfficeChief => "office_chief",
            Self::Chairman => "chairman",
            Self::Accounting => "accounting",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "teacher" => Some(Self::Teacher),
            "kyoto" => Some(Self::Kyoto),
            "vice_principal" => Some(Self::VicePrincipal),
            "principal" => Some(Self::Principal),
            "office_chief" => Some(Self::OfficeChief),
            "chairman" => Some(Self::Chairman),
            "accounting" => Some(Self::Accounting),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Teacher => "Teacher in charge",
            Self::Kyoto => "Head teacher",
            Self::VicePrincipal => "Vice principal",
            Self::Principal => "Principal",
            Self::OfficeChief => "Office chief",
            Self::Chairman => "Chairman",
            Self::Accounting => "Accounting office",
        }
    }

    /// Admin roles can see requests from every organization.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::Kyoto
                | Self::VicePrincipal
                | Self::Principal
                | Self::OfficeChief
                | Self::Chairman
                | Self::Accounting
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
