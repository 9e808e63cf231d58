//! Per-caller access scope.
//!
//! [`AccessScope::resolve`] turns a caller identity into two predicates,
//! one over requests and one over applications. Every read and write in
//! the workflow is conjoined with the matching predicate: list queries
//! push it into the database, single-record lookups check it with
//! [`AccessScope::permits_request`] / [`AccessScope::permits_application`].
//!
//! Rules:
//! - school: requests and applications of its own school.
//! - volunteer: open requests (public catalog) and its own applications.
//! - student: its own school's requests, no applications.
//! - any other role: unfiltered, unless the identity carries an explicit
//!   school grant, which narrows it to that school.

use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};
use crate::models::application::Application;
use crate::models::identity::{CallerIdentity, CallerRole};
use crate::models::request::{Request, RequestStatus};

/// Which requests a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestVisibility {
    Unrestricted,
    OwnedBy(Uuid),
    OpenCatalog,
    Denied,
}

impl RequestVisibility {
    pub fn permits(&self, request: &Request) -> bool {
        match self {
            RequestVisibility::Unrestricted => true,
            RequestVisibility::OwnedBy(school_id) => request.school_id == *school_id,
            RequestVisibility::OpenCatalog => request.status == RequestStatus::Open,
            RequestVisibility::Denied => false,
        }
    }
}

/// Which applications a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationVisibility {
    Unrestricted,
    ForSchool(Uuid),
    ByVolunteer(Uuid),
    Denied,
}

impl ApplicationVisibility {
    pub fn permits(&self, application: &Application) -> bool {
        match self {
            ApplicationVisibility::Unrestricted => true,
            ApplicationVisibility::ForSchool(school_id) => application.school_id == *school_id,
            ApplicationVisibility::ByVolunteer(volunteer_id) => {
                application.volunteer_id == *volunteer_id
            }
            ApplicationVisibility::Denied => false,
        }
    }
}

/// The resolved scope of one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    pub role: CallerRole,
    pub requests: RequestVisibility,
    pub applications: ApplicationVisibility,
}

impl AccessScope {
    /// Resolve the scope for a caller.
    ///
    /// A missing or incomplete identity fails with
    /// [`BridgeError::AuthenticationRequired`].
    pub fn resolve(identity: Option<&CallerIdentity>) -> BridgeResult<Self> {
        let identity =
            identity.ok_or_else(|| BridgeError::authentication("no caller identity"))?;
        identity.validate()?;

        let scope = match identity.role {
            CallerRole::School => {
                let school_id = required(identity.school_id, "school id")?;
                AccessScope {
                    role: identity.role,
                    requests: RequestVisibility::OwnedBy(school_id),
                    applications: ApplicationVisibility::ForSchool(school_id),
                }
            }
            CallerRole::Volunteer => {
                let volunteer_id = required(identity.volunteer_id, "volunteer id")?;
                AccessScope {
                    role: identity.role,
                    requests: RequestVisibility::OpenCatalog,
                    applications: ApplicationVisibility::ByVolunteer(volunteer_id),
                }
            }
            CallerRole::Student => {
                let school_id = required(identity.school_id, "school id")?;
                AccessScope {
                    role: identity.role,
                    requests: RequestVisibility::OwnedBy(school_id),
                    applications: ApplicationVisibility::Denied,
                }
            }
            CallerRole::Other => match identity.school_id {
                Some(school_id) => AccessScope {
                    role: identity.role,
                    requests: RequestVisibility::OwnedBy(school_id),
                    applications: ApplicationVisibility::ForSchool(school_id),
                },
                None => AccessScope {
                    role: identity.role,
                    requests: RequestVisibility::Unrestricted,
                    applications: ApplicationVisibility::Unrestricted,
                },
            },
        };

        Ok(scope)
    }

    pub fn permits_request(&self, request: &Request) -> bool {
        self.requests.permits(request)
    }

    pub fn permits_application(&self, application: &Application) -> bool {
        self.applications.permits(application)
    }

    /// The school id a school caller acts for, or `Forbidden` for any
    /// other role.
    pub fn acting_school(&self) -> BridgeResult<Uuid> {
        match (self.role, self.requests) {
            (CallerRole::School, RequestVisibility::OwnedBy(school_id)) => Ok(school_id),
            _ => Err(BridgeError::forbidden(format!(
                "role '{}' cannot act for a school",
                self.role
            ))),
        }
    }

    /// The volunteer id a volunteer caller acts for, or `Forbidden` for
    /// any other role.
    pub fn acting_volunteer(&self) -> BridgeResult<Uuid> {
        match (self.role, self.applications) {
            (CallerRole::Volunteer, ApplicationVisibility::ByVolunteer(volunteer_id)) => {
                Ok(volunteer_id)
            }
            _ => Err(BridgeError::forbidden(format!(
                "role '{}' cannot act as a volunteer",
                self.role
            ))),
        }
    }
}

fn required(id: Option<Uuid>, what: &str) -> BridgeResult<Uuid> {
    id.ok_or_else(|| BridgeError::authentication(format!("identity carries no {what}")))
}
