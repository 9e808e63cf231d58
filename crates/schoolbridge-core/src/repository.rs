//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Listing operations take the
//! caller's visibility predicate so that scoping happens inside the
//! query, not after it.

use uuid::Uuid;

use crate::error::BridgeResult;
use crate::models::{
    application::{Application, ApplicationStatus, CreateApplication},
    category::Category,
    request::{CreateRequest, Request, RequestFilter, RequestStatus},
};
use crate::scope::{ApplicationVisibility, RequestVisibility};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Catalog (global, read-only)
// ---------------------------------------------------------------------------

pub trait CatalogRepository: Send + Sync {
    fn list(&self) -> impl Future<Output = BridgeResult<Vec<Category>>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = BridgeResult<Category>> + Send;
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub trait RequestRepository: Send + Sync {
    /// Create a request in `Open` with `remaining_quantity = required_quantity`.
    fn create(&self, input: CreateRequest) -> impl Future<Output = BridgeResult<Request>> + Send;

    /// Unscoped lookup; callers check the result against their scope.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BridgeResult<Request>> + Send;

    fn list(
        &self,
        visibility: RequestVisibility,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> impl Future<Output = BridgeResult<PaginatedResult<Request>>> + Send;

    /// Approve a pending application against this request.
    ///
    /// One transaction moves the application `Pending -> Approved` and the
    /// request to `Approved`. Nothing is written, and `None` is returned,
    /// unless the application is `Pending` and belongs to the request and
    /// the request still [accepts approvals](RequestStatus::accepts_approvals).
    fn approve_application(
        &self,
        id: Uuid,
        application_id: Uuid,
    ) -> impl Future<Output = BridgeResult<Option<Request>>> + Send;

    /// Record a confirmed delivery against this request.
    ///
    /// One transaction moves the application `Approved -> Fulfilled` with
    /// its feedback and subtracts `quantity` from `remaining_quantity`; the
    /// request becomes `Fulfilled` when the result is zero. Nothing is
    /// written, and `None` is returned, unless the application is
    /// `Approved` for exactly `quantity` and the request is `Approved`
    /// with at least `quantity` remaining.
    fn fulfill_application(
        &self,
        id: Uuid,
        application_id: Uuid,
        quantity: u32,
        feedback: String,
    ) -> impl Future<Output = BridgeResult<Option<Request>>> + Send;

    /// Atomically move a request from `from` to `to`.
    ///
    /// Returns `None` if the request is not currently in `from`.
    fn transition(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> impl Future<Output = BridgeResult<Option<Request>>> + Send;
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

pub trait ApplicationRepository: Send + Sync {
    /// Create a pending application.
    ///
    /// Fails with `Conflict` if the volunteer already applied to the
    /// request.
    fn create(
        &self,
        input: CreateApplication,
    ) -> impl Future<Output = BridgeResult<Application>> + Send;

    /// Unscoped lookup; callers check the result against their scope.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BridgeResult<Application>> + Send;

    fn find_by_volunteer_and_request(
        &self,
        volunteer_id: Uuid,
        request_id: Uuid,
    ) -> impl Future<Output = BridgeResult<Option<Application>>> + Send;

    fn list_for_request(
        &self,
        visibility: ApplicationVisibility,
        request_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = BridgeResult<PaginatedResult<Application>>> + Send;

    fn list(
        &self,
        visibility: ApplicationVisibility,
        pagination: Pagination,
    ) -> impl Future<Output = BridgeResult<PaginatedResult<Application>>> + Send;

    /// Atomically move an application from `from` to `to`.
    ///
    /// Returns `None` if the application is not currently in `from`.
    /// Transitions that touch the request go through
    /// [`RequestRepository`] instead.
    fn transition(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> impl Future<Output = BridgeResult<Option<Application>>> + Send;

    /// Delete the application if it is still `Pending`.
    ///
    /// Returns `false` when nothing was deleted.
    fn delete_pending(&self, id: Uuid) -> impl Future<Output = BridgeResult<bool>> + Send;
}
