//! Request domain model.
//!
//! A request is a school's standing ask for a quantity of one catalog
//! subcategory. Its remaining quantity only ever shrinks, and only as a
//! side effect of confirmed application fulfillments.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a request.
///
/// `Open -> Approved -> Fulfilled -> Completed`, one direction only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Open,
    Approved,
    Fulfilled,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "Open",
            RequestStatus::Approved => "Approved",
            RequestStatus::Fulfilled => "Fulfilled",
            RequestStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Open" => Some(RequestStatus::Open),
            "Approved" => Some(RequestStatus::Approved),
            "Fulfilled" => Some(RequestStatus::Fulfilled),
            "Completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Open, RequestStatus::Approved)
                | (RequestStatus::Approved, RequestStatus::Fulfilled)
                | (RequestStatus::Fulfilled, RequestStatus::Completed)
        )
    }

    /// Statuses in which the school may still approve applications.
    pub fn accepts_approvals(&self) -> bool {
        matches!(self, RequestStatus::Open | RequestStatus::Approved)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    /// The owning school (tenant).
    pub school_id: Uuid,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub required_quantity: u32,
    /// Always within `0..=required_quantity`; zero exactly when fulfilled.
    pub remaining_quantity: u32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Quantity already delivered through fulfilled applications.
    pub fn delivered_quantity(&self) -> u32 {
        self.required_quantity - self.remaining_quantity
    }
}

/// Fields required to create a new request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub school_id: Uuid,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub required_quantity: u32,
}

/// Optional narrowing for request listings.
///
/// `search` is a case-insensitive substring match over description,
/// category and subcategory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    /// Filter for the public catalog of open requests.
    pub fn open() -> Self {
        Self {
            status: Some(RequestStatus::Open),
            ..Default::default()
        }
    }
}
