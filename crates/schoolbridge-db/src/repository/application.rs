//! SurrealDB implementation of [`ApplicationRepository`].
//!
//! Status changes are conditional `UPDATE`s on the current status, so a
//! stale caller cannot reject or withdraw an application twice. Approval
//! and fulfillment also move the request and therefore run as
//! transactions in the request repository.

use chrono::{DateTime, Utc};
use schoolbridge_core::error::BridgeResult;
use schoolbridge_core::models::application::{
    Application, ApplicationStatus, CreateApplication,
};
use schoolbridge_core::repository::{ApplicationRepository, PaginatedResult, Pagination};
use schoolbridge_core::scope::ApplicationVisibility;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ApplicationRow {
    request_id: String,
    volunteer_id: String,
    school_id: String,
    offered_quantity: i64,
    status: String,
    feedback: Option<String>,
    applied_at: DateTime<Utc>,
    fulfilled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ApplicationRowWithId {
    record_id: String,
    request_id: String,
    volunteer_id: String,
    school_id: String,
    offered_quantity: i64,
    status: String,
    feedback: Option<String>,
    applied_at: DateTime<Utc>,
    fulfilled_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value)
        .map_err(|e| DbError::corrupt("application", format!("invalid {field} UUID: {e}")))
}

impl ApplicationRow {
    fn into_application(self, id: Uuid) -> Result<Application, DbError> {
        let status = ApplicationStatus::parse(&self.status).ok_or_else(|| {
            DbError::corrupt("application", format!("unknown status: {}", self.status))
        })?;
        let offered_quantity = u32::try_from(self.offered_quantity).map_err(|_| {
            DbError::corrupt(
                "application",
                format!("offered_quantity = {}", self.offered_quantity),
            )
        })?;
        Ok(Application {
            id,
            request_id: parse_uuid(&self.request_id, "request")?,
            volunteer_id: parse_uuid(&self.volunteer_id, "volunteer")?,
            school_id: parse_uuid(&self.school_id, "school")?,
            offered_quantity,
            status,
            feedback: self.feedback,
            applied_at: self.applied_at,
            fulfilled_at: self.fulfilled_at,
            updated_at: self.updated_at,
        })
    }
}

impl ApplicationRowWithId {
    fn try_into_application(self) -> Result<Application, DbError> {
        let id = parse_uuid(&self.record_id, "record")?;
        ApplicationRow {
            request_id: self.request_id,
            volunteer_id: self.volunteer_id,
            school_id: self.school_id,
            offered_quantity: self.offered_quantity,
            status: self.status,
            feedback: self.feedback,
            applied_at: self.applied_at,
            fulfilled_at: self.fulfilled_at,
            updated_at: self.updated_at,
        }
        .into_application(id)
    }
}

/// Translate a visibility predicate into a WHERE fragment plus the id it
/// binds as `$scope_id`.
fn visibility_clause(visibility: ApplicationVisibility) -> (&'static str, Option<String>) {
    match visibility {
        ApplicationVisibility::Unrestricted => ("true", None),
        ApplicationVisibility::ForSchool(id) => ("school_id = $scope_id", Some(id.to_string())),
        ApplicationVisibility::ByVolunteer(id) => {
            ("volunteer_id = $scope_id", Some(id.to_string()))
        }
        ApplicationVisibility::Denied => ("false", None),
    }
}

/// SurrealDB implementation of the Application repository.
#[derive(Clone)]
pub struct SurrealApplicationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealApplicationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(
        &self,
        query: &str,
        id: Uuid,
        binds: Vec<(&'static str, String)>,
    ) -> Result<Option<Application>, DbError> {
        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        for bind in binds {
            builder = builder.bind(bind);
        }

        let mut result = builder
            .await?
            .check()
            .map_err(|e| DbError::from_statement("application", e))?;

        let rows: Vec<ApplicationRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.into_application(id))
            .transpose()
    }

    async fn list_where(
        &self,
        where_clause: String,
        scope_id: Option<String>,
        request_id: Option<String>,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Application>, DbError> {
        let query = format!(
            "SELECT count() AS total FROM application WHERE {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM application \
             WHERE {where_clause} \
             ORDER BY applied_at ASC \
             LIMIT $limit START $offset;"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("scope_id", scope_id))
            .bind(("request_id", request_id))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await?;

        let count_rows: Vec<CountRow> = result.take(0)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<ApplicationRowWithId> = result.take(1)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_application())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

impl<C: Connection> ApplicationRepository for SurrealApplicationRepository<C> {
    async fn create(&self, input: CreateApplication) -> BridgeResult<Application> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('application', $id) SET \
                 request_id = $request_id, \
                 volunteer_id = $volunteer_id, \
                 school_id = $school_id, \
                 offered_quantity = $offered_quantity, \
                 status = 'Pending', \
                 feedback = NONE, \
                 fulfilled_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("request_id", input.request_id.to_string()))
            .bind(("volunteer_id", input.volunteer_id.to_string()))
            .bind(("school_id", input.school_id.to_string()))
            .bind(("offered_quantity", input.offered_quantity))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("application", e))?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "application".into(),
            id: id_str,
        })?;

        Ok(row.into_application(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BridgeResult<Application> {
        let application = self
            .fetch_one(
                "SELECT * FROM type::record('application', $id)",
                id,
                vec![],
            )
            .await?;

        application.ok_or_else(|| {
            DbError::NotFound {
                entity: "application".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn find_by_volunteer_and_request(
        &self,
        volunteer_id: Uuid,
        request_id: Uuid,
    ) -> BridgeResult<Option<Application>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM application \
                 WHERE volunteer_id = $volunteer_id AND request_id = $request_id",
            )
            .bind(("volunteer_id", volunteer_id.to_string()))
            .bind(("request_id", request_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApplicationRowWithId> = result.take(0).map_err(DbError::from)?;
        let application = rows
            .into_iter()
            .next()
            .map(|row| row.try_into_application())
            .transpose()?;

        Ok(application)
    }

    async fn list_for_request(
        &self,
        visibility: ApplicationVisibility,
        request_id: Uuid,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Application>> {
        let (clause, scope_id) = visibility_clause(visibility);
        let page = self
            .list_where(
                format!("request_id = $request_id AND {clause}"),
                scope_id,
                Some(request_id.to_string()),
                pagination,
            )
            .await?;
        Ok(page)
    }

    async fn list(
        &self,
        visibility: ApplicationVisibility,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Application>> {
        let (clause, scope_id) = visibility_clause(visibility);
        let page = self
            .list_where(clause.to_string(), scope_id, None, pagination)
            .await?;
        Ok(page)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> BridgeResult<Option<Application>> {
        let updated = self
            .fetch_one(
                "UPDATE type::record('application', $id) SET \
                 status = $to, updated_at = time::now() \
                 WHERE status = $from",
                id,
                vec![
                    ("from", from.as_str().to_string()),
                    ("to", to.as_str().to_string()),
                ],
            )
            .await?;
        Ok(updated)
    }

    async fn delete_pending(&self, id: Uuid) -> BridgeResult<bool> {
        let mut result = self
            .db
            .query(
                "DELETE type::record('application', $id) \
                 WHERE status = 'Pending' RETURN BEFORE",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement("application", e))?;

        let rows: Vec<ApplicationRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }
}
