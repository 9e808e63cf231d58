//! Caller identity as handed over by the authentication layer.
//!
//! The core never issues identities; it only checks that the one it
//! receives is complete enough to derive an access scope from.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CallerRole {
    School,
    Volunteer,
    Student,
    Other,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::School => "school",
            CallerRole::Volunteer => "volunteer",
            CallerRole::Student => "student",
            CallerRole::Other => "other",
        }
    }

    /// Unknown role names map to `Other`.
    pub fn from_claim(s: &str) -> Self {
        match s {
            "school" => CallerRole::School,
            "volunteer" => CallerRole::Volunteer,
            "student" => CallerRole::Student,
            _ => CallerRole::Other,
        }
    }
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is calling, and which tenant identifiers scope what they see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub role: CallerRole,
    /// Own school for school and student callers; an explicit grant for
    /// other roles.
    pub school_id: Option<Uuid>,
    pub class_id: Option<String>,
    pub volunteer_id: Option<Uuid>,
}

impl CallerIdentity {
    pub fn school(user_id: Uuid, school_id: Uuid) -> Self {
        Self {
            user_id,
            role: CallerRole::School,
            school_id: Some(school_id),
            class_id: None,
            volunteer_id: None,
        }
    }

    pub fn volunteer(user_id: Uuid, volunteer_id: Uuid) -> Self {
        Self {
            user_id,
            role: CallerRole::Volunteer,
            school_id: None,
            class_id: None,
            volunteer_id: Some(volunteer_id),
        }
    }

    /// Reject identities missing the tenant id their role depends on.
    pub fn validate(&self) -> BridgeResult<()> {
        match self.role {
            CallerRole::School if self.school_id.is_none() => Err(BridgeError::authentication(
                "school identity carries no school id",
            )),
            CallerRole::Student if self.school_id.is_none() => Err(BridgeError::authentication(
                "student identity carries no school id",
            )),
            CallerRole::Volunteer if self.volunteer_id.is_none() => Err(
                BridgeError::authentication("volunteer identity carries no volunteer id"),
            ),
            _ => Ok(()),
        }
    }
}
