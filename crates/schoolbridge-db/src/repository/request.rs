//! SurrealDB implementation of [`RequestRepository`].
//!
//! Quantity bookkeeping never reads a value into Rust and writes it back.
//! Approval and fulfillment each run as one SurrealQL transaction whose
//! conditional `UPDATE`s carry the preconditions; a guard `THROW`s when an
//! update matched nothing, which aborts the whole transaction. Either both
//! the application and the request change, or neither does.

use chrono::{DateTime, Utc};
use schoolbridge_core::error::BridgeResult;
use schoolbridge_core::models::request::{CreateRequest, Request, RequestFilter, RequestStatus};
use schoolbridge_core::repository::{PaginatedResult, Pagination, RequestRepository};
use schoolbridge_core::scope::RequestVisibility;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::CountRow;
use crate::error::{DbError, REFUSED};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct RequestRow {
    school_id: String,
    category: String,
    subcategory: String,
    description: String,
    required_quantity: i64,
    remaining_quantity: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct RequestRowWithId {
    record_id: String,
    school_id: String,
    category: String,
    subcategory: String,
    description: String,
    required_quantity: i64,
    remaining_quantity: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_BY_ID: &str = "SELECT * FROM type::record('request', $id)";

/// `Ok(false)` when a transaction guard refused the write.
fn guarded(outcome: Result<(), DbError>) -> Result<bool, DbError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(DbError::Refused(detail)) => {
            debug!(%detail, "Transaction refused");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn parse_status(s: &str) -> Result<RequestStatus, DbError> {
    RequestStatus::parse(s)
        .ok_or_else(|| DbError::corrupt("request", format!("unknown status: {s}")))
}

fn quantity(value: i64, field: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::corrupt("request", format!("{field} = {value}")))
}

impl RequestRow {
    fn into_request(self, id: Uuid) -> Result<Request, DbError> {
        let school_id = Uuid::parse_str(&self.school_id)
            .map_err(|e| DbError::corrupt("request", format!("invalid school UUID: {e}")))?;
        Ok(Request {
            id,
            school_id,
            category: self.category,
            subcategory: self.subcategory,
            description: self.description,
            required_quantity: quantity(self.required_quantity, "required_quantity")?,
            remaining_quantity: quantity(self.remaining_quantity, "remaining_quantity")?,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl RequestRowWithId {
    fn try_into_request(self) -> Result<Request, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::corrupt("request", format!("invalid UUID: {e}")))?;
        RequestRow {
            school_id: self.school_id,
            category: self.category,
            subcategory: self.subcategory,
            description: self.description,
            required_quantity: self.required_quantity,
            remaining_quantity: self.remaining_quantity,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_request(id)
    }
}

/// WHERE fragments and their bind values for a request listing.
struct RequestConditions {
    clauses: Vec<&'static str>,
    school_id: Option<String>,
    status: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    search: Option<String>,
}

impl RequestConditions {
    fn new(visibility: RequestVisibility, filter: RequestFilter) -> Self {
        let mut clauses = Vec::new();
        let mut school_id = None;
        let status = filter.status.map(|s| s.as_str().to_string());

        match visibility {
            RequestVisibility::Unrestricted => {}
            RequestVisibility::OwnedBy(id) => {
                clauses.push("school_id = $school_id");
                school_id = Some(id.to_string());
            }
            RequestVisibility::OpenCatalog => {
                clauses.push("status = 'Open'");
            }
            RequestVisibility::Denied => clauses.push("false"),
        }

        if status.is_some() {
            clauses.push("status = $status");
        }
        let category = filter.category.filter(|c| !c.trim().is_empty());
        if category.is_some() {
            clauses.push("category = $category");
        }
        let subcategory = filter.subcategory.filter(|s| !s.trim().is_empty());
        if subcategory.is_some() {
            clauses.push("subcategory = $subcategory");
        }
        let search = filter
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        if search.is_some() {
            clauses.push(
                "(string::contains(string::lowercase(description), $search) \
                 OR string::contains(string::lowercase(category), $search) \
                 OR string::contains(string::lowercase(subcategory), $search))",
            );
        }
        if clauses.is_empty() {
            clauses.push("true");
        }

        Self {
            clauses,
            school_id,
            status,
            category,
            subcategory,
            search,
        }
    }

    fn where_clause(&self) -> String {
        self.clauses.join(" AND ")
    }
}

/// SurrealDB implementation of the Request repository.
#[derive(Clone)]
pub struct SurrealRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn single(
        &self,
        query: &str,
        id: Uuid,
        binds: Vec<(&'static str, String)>,
    ) -> Result<Option<Request>, DbError> {
        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        for bind in binds {
            builder = builder.bind(bind);
        }

        let mut result = builder
            .await?
            .check()
            .map_err(|e| DbError::from_statement("request", e))?;

        let rows: Vec<RequestRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(|row| row.into_request(id))
            .transpose()
    }
}

impl<C: Connection> RequestRepository for SurrealRequestRepository<C> {
    async fn create(&self, input: CreateRequest) -> BridgeResult<Request> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('request', $id) SET \
                 school_id = $school_id, \
                 category = $category, subcategory = $subcategory, \
                 description = $description, \
                 required_quantity = $quantity, \
                 remaining_quantity = $quantity, \
                 status = 'Open'",
            )
            .bind(("id", id_str.clone()))
            .bind(("school_id", input.school_id.to_string()))
            .bind(("category", input.category))
            .bind(("subcategory", input.subcategory))
            .bind(("description", input.description))
            .bind(("quantity", input.required_quantity))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement("request", e))?;

        let rows: Vec<RequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BridgeResult<Request> {
        let request = self
            .single(SELECT_BY_ID, id, vec![])
            .await?;

        request.ok_or_else(|| {
            DbError::NotFound {
                entity: "request".into(),
                id: id.to_string(),
            }
            .into()
        })
    }

    async fn list(
        &self,
        visibility: RequestVisibility,
        filter: RequestFilter,
        pagination: Pagination,
    ) -> BridgeResult<PaginatedResult<Request>> {
        let conditions = RequestConditions::new(visibility, filter);
        let where_clause = conditions.where_clause();
        debug!(%where_clause, "Listing requests");

        let query = format!(
            "SELECT count() AS total FROM request WHERE {where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM request \
             WHERE {where_clause} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset;"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("school_id", conditions.school_id))
            .bind(("status", conditions.status))
            .bind(("category", conditions.category))
            .bind(("subcategory", conditions.subcategory))
            .bind(("search", conditions.search))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<RequestRowWithId> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn approve_application(
        &self,
        id: Uuid,
        application_id: Uuid,
    ) -> BridgeResult<Option<Request>> {
        let query = format!(
            "BEGIN TRANSACTION; \
             LET $approved = (UPDATE type::record('application', $application_id) SET \
                 status = 'Approved', updated_at = time::now() \
                 WHERE status = 'Pending' AND request_id = $id); \
             IF array::len($approved) = 0 {{ \
                 THROW '{REFUSED}: application is not pending for this request' \
             }}; \
             LET $request = (UPDATE type::record('request', $id) SET \
                 status = 'Approved', updated_at = time::now() \
                 WHERE status IN ['Open', 'Approved']); \
             IF array::len($request) = 0 {{ \
                 THROW '{REFUSED}: request no longer accepts approvals' \
             }}; \
             COMMIT TRANSACTION;"
        );

        let outcome = async {
            self.db
                .query(query)
                .bind(("id", id.to_string()))
                .bind(("application_id", application_id.to_string()))
                .await
                .map_err(|e| DbError::from_statement("request", e))?
                .check()
                .map_err(|e| DbError::from_statement("request", e))?;
            Ok::<(), DbError>(())
        }
        .await;

        if !guarded(outcome)? {
            return Ok(None);
        }
        Ok(self.single(SELECT_BY_ID, id, vec![]).await?)
    }

    async fn fulfill_application(
        &self,
        id: Uuid,
        application_id: Uuid,
        quantity: u32,
        feedback: String,
    ) -> BridgeResult<Option<Request>> {
        // `status` is assigned before `remaining_quantity` so it is computed
        // from the pre-update value.
        let query = format!(
            "BEGIN TRANSACTION; \
             LET $claimed = (UPDATE type::record('application', $application_id) SET \
                 status = 'Fulfilled', feedback = $feedback, \
                 fulfilled_at = time::now(), updated_at = time::now() \
                 WHERE status = 'Approved' AND request_id = $id \
                 AND offered_quantity = $quantity); \
             IF array::len($claimed) = 0 {{ \
                 THROW '{REFUSED}: application is not approved for this quantity' \
             }}; \
             LET $request = (UPDATE type::record('request', $id) SET \
                 status = IF remaining_quantity = $quantity {{ 'Fulfilled' }} \
                     ELSE {{ 'Approved' }}, \
                 remaining_quantity = remaining_quantity - $quantity, \
                 updated_at = time::now() \
                 WHERE remaining_quantity >= $quantity AND status = 'Approved'); \
             IF array::len($request) = 0 {{ \
                 THROW '{REFUSED}: request cannot absorb the quantity' \
             }}; \
             COMMIT TRANSACTION;"
        );

        let outcome = async {
            self.db
                .query(query)
                .bind(("id", id.to_string()))
                .bind(("application_id", application_id.to_string()))
                .bind(("feedback", feedback))
                .bind(("quantity", quantity))
                .await
                .map_err(|e| DbError::from_statement("request", e))?
                .check()
                .map_err(|e| DbError::from_statement("request", e))?;
            Ok::<(), DbError>(())
        }
        .await;

        if !guarded(outcome)? {
            return Ok(None);
        }
        Ok(self.single(SELECT_BY_ID, id, vec![]).await?)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> BridgeResult<Option<Request>> {
        let updated = self
            .single(
                "UPDATE type::record('request', $id) SET \
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
}
