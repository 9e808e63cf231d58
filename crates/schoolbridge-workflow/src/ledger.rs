//! Request ledger: creation, listing and the quantity bookkeeping that
//! only the application workflow may trigger.
//!
//! Approval and fulfillment are single datastore transactions covering
//! both the application and its request. The ledger drives them, retries
//! datastore failures such as write conflicts, and turns a refused
//! transaction into the caller-facing reason.

use schoolbridge_core::error::{BridgeError, BridgeResult};
use schoolbridge_core::models::application::Application;
use schoolbridge_core::models::request::{CreateRequest, Request, RequestFilter, RequestStatus};
use schoolbridge_core::repository::{
    CatalogRepository, PaginatedResult, Pagination, RequestRepository,
};
use schoolbridge_core::scope::RequestVisibility;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::WorkflowConfig;

/// Owner of the Request entity.
///
/// Generic over repository implementations; cloning is cheap when the
/// repositories are (the SurrealDB ones share one client).
#[derive(Clone)]
pub struct RequestLedger<R: RequestRepository, C: CatalogRepository> {
    requests: R,
    catalog: C,
    config: WorkflowConfig,
}

impl<R: RequestRepository, C: CatalogRepository> RequestLedger<R, C> {
    pub fn new(requests: R, catalog: C, config: WorkflowConfig) -> Self {
        Self {
            requests,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Validate and create an `Open` request for a school.
    pub async fn create_request(&self, input: CreateRequest) -> BridgeResult<Request> {
        let category = input.category.trim().to_string();
        let subcategory = input.subcategory.trim().to_string();
        let description = input.description.trim().to_string();

        if input.required_quantity < 1 {
            return Err(BridgeError::validation(
                "required quantity must be at least 1",
            ));
        }
        if description.is_empty() {
            return Err(BridgeError::validation("description must not be empty"));
        }
        if description.chars().count() > self.config.max_description_len {
            return Err(BridgeError::validation(format!(
                "description exceeds {} characters",
                self.config.max_description_len
            )));
        }

        let known = match self.catalog.get_by_name(&category).await {
            Ok(c) => c,
            Err(BridgeError::NotFound { .. }) => {
                return Err(BridgeError::validation(format!(
                    "unknown category '{category}'"
                )));
            }
            Err(e) => return Err(e),
        };
        if !known.has_subcategory(&subcategory) {
            return Err(BridgeError::validation(format!(
                "subcategory '{subcategory}' does not belong to '{category}'"
            )));
        }

        let request = self
            .requests
            .create(CreateRequest {
                school_id: input.school_id,
                category,
                subcategory,
                description,
                required_quantity: input.required_quantity,
            })
            .await?;

        info!(
            request_id = %request.id,
            school_id = %request.school_id,
            quantity = request.required_quantity,
            "Request created"
        );
        Ok(request)
    }

    /// Unscoped lookup; the facade checks the caller's scope.
    pub async fn get_request(&self, id: Uuid) -> BridgeResult<Request> {
        self.requests.get_by_id(id).await
    }

    /// Open requests, optionally narrowed by category, subcategory and a
    /// free-text search.
    pub async fn list_open_requests(
        &self,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Request>> {
        let filter = RequestFilter {
            category: filter.category,
            subcategory: filter.subcategory,
            search: filter.search,
            ..RequestFilter::open()
        };
        self.requests
            .list(RequestVisibility::OpenCatalog, filter, pagination)
            .await
    }

    /// Requests visible under `visibility`, any status.
    pub async fn list_requests(
        &self,
        visibility: RequestVisibility,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Request>> {
        self.requests.list(visibility, filter, pagination).await
    }

    /// Approve a pending application and move its request to `Approved`,
    /// as one transaction.
    ///
    /// Fails with `InvalidState` when the request no longer takes
    /// approvals. `Ok(None)` means the request was fine but the
    /// application was not pending for it; nothing was written.
    pub(crate) async fn approve_application(
        &self,
        application: &Application,
    ) -> BridgeResult<Option<Request>> {
        let id = application.request_id;
        let before = self.requests.get_by_id(id).await?;
        ensure_takes_approvals(&before)?;

        let outcome = self
            .with_retries(id, || self.requests.approve_application(id, application.id))
            .await;
        let outcome = match outcome {
            Err(BridgeError::Database(message)) => {
                warn!(request_id = %id, error = %message, "Approval did not commit");
                ensure_takes_approvals(&self.requests.get_by_id(id).await?)?;
                return Err(changed_concurrently("approval"));
            }
            other => other?,
        };

        match outcome {
            Some(request) => {
                if before.status.can_transition_to(RequestStatus::Approved) {
                    info!(request_id = %id, "Request approved");
                }
                Ok(Some(request))
            }
            None => {
                ensure_takes_approvals(&self.requests.get_by_id(id).await?)?;
                Ok(None)
            }
        }
    }

    /// Record a confirmed delivery: the application becomes `Fulfilled`
    /// with its feedback and its offered quantity leaves the request, as
    /// one transaction.
    ///
    /// Fails with `InvalidState` when the request cannot absorb the
    /// quantity, or when datastore failures outlast the configured
    /// retries. `Ok(None)` means the request was fine but the application
    /// was not approved for it; nothing was written.
    pub(crate) async fn apply_fulfillment(
        &self,
        application: &Application,
        feedback: &str,
    ) -> BridgeResult<Option<Request>> {
        let id = application.request_id;
        let quantity = application.offered_quantity;
        if quantity == 0 {
            return Err(BridgeError::validation("fulfilled quantity must be positive"));
        }

        let outcome = self
            .with_retries(id, || {
                self.requests
                    .fulfill_application(id, application.id, quantity, feedback.to_string())
            })
            .await;
        let outcome = match outcome {
            Err(BridgeError::Database(message)) => {
                warn!(request_id = %id, quantity, error = %message, "Fulfillment did not commit");
                // A refusal can surface as a plain transaction failure; the
                // current request tells the two apart.
                ensure_absorbs(&self.requests.get_by_id(id).await?, quantity)?;
                return Err(changed_concurrently("fulfillment"));
            }
            other => other?,
        };

        match outcome {
            Some(request) => {
                info!(
                    request_id = %id,
                    quantity,
                    delivered = request.delivered_quantity(),
                    remaining = request.remaining_quantity,
                    status = %request.status,
                    "Fulfillment applied"
                );
                Ok(Some(request))
            }
            None => {
                ensure_absorbs(&self.requests.get_by_id(id).await?, quantity)?;
                Ok(None)
            }
        }
    }

    /// Owning school closes a fulfilled request: `Fulfilled -> Completed`.
    pub async fn complete_request(&self, request: &Request) -> BridgeResult<Request> {
        if !request.status.can_transition_to(RequestStatus::Completed) {
            return Err(not_completable(request.status));
        }
        match self
            .requests
            .transition(request.id, RequestStatus::Fulfilled, RequestStatus::Completed)
            .await?
        {
            Some(completed) => {
                info!(request_id = %completed.id, "Request completed");
                Ok(completed)
            }
            None => {
                let current = self.requests.get_by_id(request.id).await?;
                Err(not_completable(current.status))
            }
        }
    }

    /// Run a request transaction, retrying datastore failures up to
    /// `fulfillment_retries` times. Returns the last outcome.
    async fn with_retries<F, Fut>(&self, id: Uuid, mut run: F) -> BridgeResult<Option<Request>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BridgeResult<Option<Request>>>,
    {
        let mut attempt = 0;
        loop {
            match run().await {
                Err(BridgeError::Database(message)) if attempt < self.config.fulfillment_retries => {
                    attempt += 1;
                    warn!(request_id = %id, attempt, error = %message, "Request transaction failed, retrying");
                }
                outcome => return outcome,
            }
        }
    }
}

fn ensure_takes_approvals(request: &Request) -> BridgeResult<()> {
    if request.status.accepts_approvals() {
        return Ok(());
    }
    warn!(request_id = %request.id, status = %request.status, "Request no longer takes approvals");
    Err(BridgeError::invalid_state(format!(
        "request is {}, no further approvals",
        request.status
    )))
}

fn ensure_absorbs(request: &Request, quantity: u32) -> BridgeResult<()> {
    if !request.status.can_transition_to(RequestStatus::Fulfilled) {
        warn!(request_id = %request.id, status = %request.status, "Request no longer accepts fulfillment");
        return Err(BridgeError::invalid_state(format!(
            "request is {}",
            request.status
        )));
    }
    if request.remaining_quantity < quantity {
        warn!(
            request_id = %request.id,
            quantity,
            remaining = request.remaining_quantity,
            "Fulfillment exceeds remaining quantity"
        );
        return Err(BridgeError::invalid_state(format!(
            "only {} remaining, cannot fulfill {}",
            request.remaining_quantity, quantity
        )));
    }
    Ok(())
}

fn changed_concurrently(what: &str) -> BridgeError {
    BridgeError::invalid_state(format!("request changed concurrently, {what} not applied"))
}

fn not_completable(status: RequestStatus) -> BridgeError {
    BridgeError::invalid_state(format!(
        "only fulfilled requests can be completed, request is {status}"
    ))
}
