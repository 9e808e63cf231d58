//! Application domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a volunteer's application.
///
/// `Pending -> Approved -> Fulfilled`, or `Pending -> Rejected`.
/// `Rejected` and `Fulfilled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Fulfilled => "Fulfilled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(ApplicationStatus::Pending),
            "Approved" => Some(ApplicationStatus::Approved),
            "Rejected" => Some(ApplicationStatus::Rejected),
            "Fulfilled" => Some(ApplicationStatus::Fulfilled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Pending, ApplicationStatus::Approved)
                | (ApplicationStatus::Pending, ApplicationStatus::Rejected)
                | (ApplicationStatus::Approved, ApplicationStatus::Fulfilled)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One volunteer's offer against one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub request_id: Uuid,
    pub volunteer_id: Uuid,
    /// Owning school of the request, copied at creation for scoping.
    pub school_id: Uuid,
    /// Fixed at creation; never mutated.
    pub offered_quantity: u32,
    pub status: ApplicationStatus,
    /// Set together with the transition to `Fulfilled`.
    pub feedback: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplication {
    pub request_id: Uuid,
    pub volunteer_id: Uuid,
    pub school_id: Uuid,
    pub offered_quantity: u32,
}
