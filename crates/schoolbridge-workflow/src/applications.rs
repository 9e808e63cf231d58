//! Application workflow: submission, approval, rejection, withdrawal
//! and confirmed fulfillment.
//!
//! This is the only component that mutates a request after creation,
//! and it does so exclusively through [`RequestLedger`].
//!
//! Approval and fulfillment are two separate steps. Approving commits the
//! school to a volunteer; only confirming the delivery (with feedback)
//! subtracts the offered quantity from the request. Each step changes the
//! application and the request in one transaction.

use schoolbridge_core::error::{BridgeError, BridgeResult};
use schoolbridge_core::models::application::{
    Application, ApplicationStatus, CreateApplication,
};
use schoolbridge_core::models::request::{Request, RequestStatus};
use schoolbridge_core::repository::{
    ApplicationRepository, CatalogRepository, PaginatedResult, Pagination, RequestRepository,
};
use schoolbridge_core::scope::ApplicationVisibility;
use tracing::info;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::ledger::RequestLedger;

/// Owner of the Application entity.
#[derive(Clone)]
pub struct ApplicationWorkflow<A, R, C>
where
    A: ApplicationRepository,
    R: RequestRepository,
    C: CatalogRepository,
{
    applications: A,
    ledger: RequestLedger<R, C>,
    config: WorkflowConfig,
}

impl<A, R, C> ApplicationWorkflow<A, R, C>
where
    A: ApplicationRepository,
    R: RequestRepository,
    C: CatalogRepository,
{
    pub fn new(applications: A, ledger: RequestLedger<R, C>, config: WorkflowConfig) -> Self {
        Self {
            applications,
            ledger,
            config,
        }
    }

    /// Unscoped lookup; the facade checks the caller's scope.
    pub async fn get_application(&self, id: Uuid) -> BridgeResult<Application> {
        self.applications.get_by_id(id).await
    }

    pub async fn list_for_request(
        &self,
        visibility: ApplicationVisibility,
        request_id: Uuid,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Application>> {
        self.applications
            .list_for_request(visibility, request_id, pagination)
            .await
    }

    pub async fn list_applications(
        &self,
        visibility: ApplicationVisibility,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Application>> {
        self.applications.list(visibility, pagination).await
    }

    /// A volunteer offers `quantity` against an open request.
    pub async fn submit_application(
        &self,
        volunteer_id: Uuid,
        request: &Request,
        quantity: u32,
    ) -> BridgeResult<Application> {
        if request.status != RequestStatus::Open {
            return Err(BridgeError::invalid_state(format!(
                "request is {}, applications are closed",
                request.status
            )));
        }
        if quantity < 1 || quantity > request.remaining_quantity {
            return Err(BridgeError::validation(format!(
                "quantity must be between 1 and {}",
                request.remaining_quantity
            )));
        }
        if self
            .applications
            .find_by_volunteer_and_request(volunteer_id, request.id)
            .await?
            .is_some()
        {
            return Err(already_applied());
        }

        // The unique index still guards the race between the check above
        // and this insert.
        let application = self
            .applications
            .create(CreateApplication {
                request_id: request.id,
                volunteer_id,
                school_id: request.school_id,
                offered_quantity: quantity,
            })
            .await
            .map_err(|e| match e {
                BridgeError::Conflict { .. } => already_applied(),
                other => other,
            })?;

        info!(
            application_id = %application.id,
            request_id = %request.id,
            volunteer_id = %volunteer_id,
            quantity,
            "Application submitted"
        );
        Ok(application)
    }

    /// `Pending -> Approved`. The request moves to `Approved` on its first
    /// approval; its quantity is untouched until fulfillment.
    pub async fn approve_application(&self, application: &Application) -> BridgeResult<Application> {
        ensure_can_move(application, ApplicationStatus::Pending, ApplicationStatus::Approved)?;

        let request = match self.ledger.approve_application(application).await? {
            Some(request) => request,
            None => return Err(self.lost_race(application, ApplicationStatus::Pending).await),
        };
        let approved = self.applications.get_by_id(application.id).await?;

        info!(
            application_id = %approved.id,
            request_id = %request.id,
            request_status = %request.status,
            "Application approved"
        );
        Ok(approved)
    }

    /// `Pending -> Rejected`. Terminal, no effect on the request.
    pub async fn reject_application(&self, application: &Application) -> BridgeResult<Application> {
        let rejected = self
            .transition(
                application,
                ApplicationStatus::Pending,
                ApplicationStatus::Rejected,
            )
            .await?;

        info!(
            application_id = %rejected.id,
            request_id = %rejected.request_id,
            "Application rejected"
        );
        Ok(rejected)
    }

    /// Confirm delivery: record feedback, mark the application fulfilled
    /// and subtract its offered quantity from the request.
    ///
    /// Both records change in one transaction, so a failed or abandoned
    /// call leaves the application `Approved` and can simply be repeated.
    pub async fn record_feedback_and_fulfill(
        &self,
        application: &Application,
        feedback: &str,
    ) -> BridgeResult<(Application, Request)> {
        ensure_can_move(application, ApplicationStatus::Approved, ApplicationStatus::Fulfilled)?;
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(BridgeError::validation("feedback must not be empty"));
        }
        if feedback.chars().count() > self.config.max_feedback_len {
            return Err(BridgeError::validation(format!(
                "feedback exceeds {} characters",
                self.config.max_feedback_len
            )));
        }

        let request = match self.ledger.apply_fulfillment(application, feedback).await {
            Ok(Some(request)) => request,
            Ok(None) => return Err(self.lost_race(application, ApplicationStatus::Approved).await),
            Err(e @ BridgeError::InvalidState { .. }) => {
                // Prefer the application's own status when it moved meanwhile.
                let current = self.applications.get_by_id(application.id).await?;
                if current.status != ApplicationStatus::Approved {
                    return Err(wrong_status(current.status, ApplicationStatus::Approved));
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let fulfilled = self.applications.get_by_id(application.id).await?;

        info!(
            application_id = %fulfilled.id,
            request_id = %request.id,
            quantity = fulfilled.offered_quantity,
            remaining = request.remaining_quantity,
            "Application fulfilled"
        );
        Ok((fulfilled, request))
    }

    /// The volunteer retracts a pending application. Deletes it; no effect
    /// on the request.
    pub async fn withdraw_application(&self, application: &Application) -> BridgeResult<()> {
        if application.status != ApplicationStatus::Pending {
            return Err(wrong_status(application.status, ApplicationStatus::Pending));
        }
        if !self.applications.delete_pending(application.id).await? {
            let current = self.applications.get_by_id(application.id).await?;
            return Err(wrong_status(current.status, ApplicationStatus::Pending));
        }

        info!(
            application_id = %application.id,
            request_id = %application.request_id,
            "Application withdrawn"
        );
        Ok(())
    }

    async fn transition(
        &self,
        application: &Application,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> BridgeResult<Application> {
        ensure_can_move(application, from, to)?;
        match self.applications.transition(application.id, from, to).await? {
            Some(updated) => Ok(updated),
            None => Err(self.lost_race(application, from).await),
        }
    }

    /// A conditional update matched nothing; report what the application
    /// is now.
    async fn lost_race(&self, application: &Application, expected: ApplicationStatus) -> BridgeError {
        match self.applications.get_by_id(application.id).await {
            Ok(current) if current.status != expected => wrong_status(current.status, expected),
            Ok(_) => BridgeError::invalid_state("application changed concurrently"),
            Err(e) => e,
        }
    }
}

fn already_applied() -> BridgeError {
    BridgeError::Conflict {
        entity: "application".into(),
        message: "volunteer has already applied to this request".into(),
    }
}

/// `from` is the one status that may move to `to`; it names the
/// expectation in the error.
fn ensure_can_move(
    application: &Application,
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> BridgeResult<()> {
    if application.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(wrong_status(application.status, from))
    }
}

fn wrong_status(actual: ApplicationStatus, expected: ApplicationStatus) -> BridgeError {
    BridgeError::invalid_state(format!(
        "application is {actual}, expected {expected}"
    ))
}
