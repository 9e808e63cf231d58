//! Workflow facade: the only entry point callers use.
//!
//! Every operation resolves the caller's [`AccessScope`] first, gates the
//! caller's role for mutations, and checks the target record against the
//! scope before delegating. A record outside the scope is reported as
//! `NotFound`, exactly like a record that does not exist, so callers
//! cannot probe other schools' data. `Forbidden` is reserved for roles
//! that may never perform an action at all.

use schoolbridge_core::error::{BridgeError, BridgeResult};
use schoolbridge_core::models::application::Application;
use schoolbridge_core::models::category::Category;
use schoolbridge_core::models::identity::CallerIdentity;
use schoolbridge_core::models::request::{CreateRequest, Request, RequestFilter};
use schoolbridge_core::repository::{
    ApplicationRepository, CatalogRepository, PaginatedResult, Pagination, RequestRepository,
};
use schoolbridge_core::scope::AccessScope;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::applications::ApplicationWorkflow;
use crate::config::WorkflowConfig;
use crate::ledger::RequestLedger;

/// What a school submits to open a request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub required_quantity: u32,
}

/// Caller-supplied paging; missing values fall back to the configured
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

pub struct WorkflowFacade<A, R, C>
where
    A: ApplicationRepository,
    R: RequestRepository,
    C: CatalogRepository,
{
    ledger: RequestLedger<R, C>,
    workflow: ApplicationWorkflow<A, R, C>,
    config: WorkflowConfig,
}

impl<A, R, C> WorkflowFacade<A, R, C>
where
    A: ApplicationRepository,
    R: RequestRepository + Clone,
    C: CatalogRepository + Clone,
{
    pub fn new(applications: A, requests: R, catalog: C, config: WorkflowConfig) -> Self {
        let ledger = RequestLedger::new(requests, catalog, config.clone());
        let workflow = ApplicationWorkflow::new(applications, ledger.clone(), config.clone());
        Self {
            ledger,
            workflow,
            config,
        }
    }
}

impl<A, R, C> WorkflowFacade<A, R, C>
where
    A: ApplicationRepository,
    R: RequestRepository,
    C: CatalogRepository,
{
    fn pagination(&self, page: PageRequest) -> Pagination {
        Pagination {
            offset: page.offset.unwrap_or(0),
            limit: page
                .limit
                .unwrap_or(self.config.default_page_size)
                .clamp(1, self.config.max_page_size),
        }
    }

    // -------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------

    pub async fn list_categories(&self) -> BridgeResult<Vec<Category>> {
        self.ledger.catalog().list().await
    }

    // -------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------

    pub async fn create_request(
        &self,
        identity: Option<&CallerIdentity>,
        input: NewRequest,
    ) -> BridgeResult<Request> {
        let scope = AccessScope::resolve(identity)?;
        let school_id = scope.acting_school()?;

        self.ledger
            .create_request(CreateRequest {
                school_id,
                category: input.category,
                subcategory: input.subcategory,
                description: input.description,
                required_quantity: input.required_quantity,
            })
            .await
    }

    /// The public catalog. Anonymous callers are allowed; a supplied
    /// identity must still be well formed.
    pub async fn list_open_requests(
        &self,
        identity: Option<&CallerIdentity>,
        filter: RequestFilter,
        page: PageRequest,
    ) -> BridgeResult<PaginatedResult<Request>> {
        if identity.is_some() {
            AccessScope::resolve(identity)?;
        }
        self.ledger
            .list_open_requests(filter, self.pagination(page))
            .await
    }

    /// All requests of the calling school, any status.
    pub async fn list_own_requests(
        &self,
        identity: Option<&CallerIdentity>,
        filter: RequestFilter,
        page: PageRequest,
    ) -> BridgeResult<PaginatedResult<Request>> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_school()?;

        self.ledger
            .list_requests(scope.requests, filter, self.pagination(page))
            .await
    }

    pub async fn get_request(
        &self,
        identity: Option<&CallerIdentity>,
        request_id: Uuid,
    ) -> BridgeResult<Request> {
        let scope = AccessScope::resolve(identity)?;
        self.scoped_request(&scope, request_id).await
    }

    /// Owning school closes a fulfilled request.
    pub async fn complete_request(
        &self,
        identity: Option<&CallerIdentity>,
        request_id: Uuid,
    ) -> BridgeResult<Request> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_school()?;
        let request = self.scoped_request(&scope, request_id).await?;

        self.ledger.complete_request(&request).await
    }

    // -------------------------------------------------------------------
    // Applications
    // -------------------------------------------------------------------

    pub async fn submit_application(
        &self,
        identity: Option<&CallerIdentity>,
        request_id: Uuid,
        quantity: u32,
    ) -> BridgeResult<Application> {
        let scope = AccessScope::resolve(identity)?;
        let volunteer_id = scope.acting_volunteer()?;

        // Deliberately not filtered by the open catalog: applying to a
        // closed request is an invalid state, not a missing record.
        let request = self.ledger.get_request(request_id).await?;

        self.workflow
            .submit_application(volunteer_id, &request, quantity)
            .await
    }

    pub async fn list_applications_for_request(
        &self,
        identity: Option<&CallerIdentity>,
        request_id: Uuid,
        page: PageRequest,
    ) -> BridgeResult<PaginatedResult<Application>> {
        let scope = AccessScope::resolve(identity)?;
        let request = self.scoped_request(&scope, request_id).await?;

        self.workflow
            .list_for_request(scope.applications, request.id, self.pagination(page))
            .await
    }

    pub async fn list_own_applications(
        &self,
        identity: Option<&CallerIdentity>,
        page: PageRequest,
    ) -> BridgeResult<PaginatedResult<Application>> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_volunteer()?;

        self.workflow
            .list_applications(scope.applications, self.pagination(page))
            .await
    }

    /// Approval is refused once the request no longer takes approvals
    /// (`Fulfilled` or `Completed`), even for an application still pending.
    pub async fn approve_application(
        &self,
        identity: Option<&CallerIdentity>,
        application_id: Uuid,
    ) -> BridgeResult<Application> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_school()?;
        let application = self.scoped_application(&scope, application_id).await?;

        self.workflow.approve_application(&application).await
    }

    pub async fn reject_application(
        &self,
        identity: Option<&CallerIdentity>,
        application_id: Uuid,
    ) -> BridgeResult<Application> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_school()?;
        let application = self.scoped_application(&scope, application_id).await?;

        self.workflow.reject_application(&application).await
    }

    pub async fn record_feedback_and_fulfill(
        &self,
        identity: Option<&CallerIdentity>,
        application_id: Uuid,
        feedback: &str,
    ) -> BridgeResult<(Application, Request)> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_school()?;
        let application = self.scoped_application(&scope, application_id).await?;

        self.workflow
            .record_feedback_and_fulfill(&application, feedback)
            .await
    }

    pub async fn withdraw_application(
        &self,
        identity: Option<&CallerIdentity>,
        application_id: Uuid,
    ) -> BridgeResult<()> {
        let scope = AccessScope::resolve(identity)?;
        scope.acting_volunteer()?;
        let application = self.scoped_application(&scope, application_id).await?;

        self.workflow.withdraw_application(&application).await
    }

    // -------------------------------------------------------------------
    // Scope checks
    // -------------------------------------------------------------------

    async fn scoped_request(&self, scope: &AccessScope, id: Uuid) -> BridgeResult<Request> {
        let request = self.ledger.get_request(id).await?;
        if !scope.permits_request(&request) {
            warn!(request_id = %id, role = %scope.role, "Request outside caller scope");
            return Err(BridgeError::not_found("request", id));
        }
        Ok(request)
    }

    async fn scoped_application(
        &self,
        scope: &AccessScope,
        id: Uuid,
    ) -> BridgeResult<Application> {
        let application = self.workflow.get_application(id).await?;
        if !scope.permits_application(&application) {
            warn!(application_id = %id, role = %scope.role, "Application outside caller scope");
            return Err(BridgeError::not_found("application", id));
        }
        Ok(application)
    }
}
