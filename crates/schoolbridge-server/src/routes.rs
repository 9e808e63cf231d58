use std::time::Duration;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use schoolbridge_core::models::application::Application;
use schoolbridge_core::models::category::Category;
use schoolbridge_core::models::request::{Request, RequestFilter};
use schoolbridge_core::repository::PaginatedResult;
use schoolbridge_workflow::{NewRequest, PageRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::Caller;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/categories", get(categories_handler))
        .route("/requests", post(create_request_handler))
        .route("/requests/open", get(open_requests_handler))
        .route("/requests/mine", get(own_requests_handler))
        .route("/requests/{id}", get(get_request_handler))
        .route("/requests/{id}/apply", post(apply_handler))
        .route(
            "/requests/{id}/applications",
            get(request_applications_handler),
        )
        .route("/requests/{id}/complete", post(complete_request_handler))
        .route("/applications/mine", get(own_applications_handler))
        .route("/applications/{id}", delete(withdraw_handler))
        .route("/applications/{id}/approve", post(approve_handler))
        .route("/applications/{id}/reject", post(reject_handler))
        .route("/applications/{id}/feedback", post(feedback_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Query string shared by the request listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl ListQuery {
    fn split(self) -> (RequestFilter, PageRequest) {
        (
            RequestFilter {
                category: self.category,
                subcategory: self.subcategory,
                search: self.search,
                status: None,
            },
            PageRequest {
                offset: self.offset,
                limit: self.limit,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplyBody {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct FulfillmentResponse {
    pub application: Application,
    pub request: Request,
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

async fn categories_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.facade.list_categories().await?))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn create_request_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    payload: Result<Json<NewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Request>)> {
    let Json(input) = payload?;
    let request = state.facade.create_request(caller.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn open_requests_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<PaginatedResult<Request>>> {
    let Query(query) = query?;
    let (filter, page) = query.split();
    let requests = state
        .facade
        .list_open_requests(caller.as_ref(), filter, page)
        .await?;
    Ok(Json(requests))
}

async fn own_requests_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<PaginatedResult<Request>>> {
    let Query(query) = query?;
    let (filter, page) = query.split();
    let requests = state
        .facade
        .list_own_requests(caller.as_ref(), filter, page)
        .await?;
    Ok(Json(requests))
}

async fn get_request_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Request>> {
    let Path(id) = path?;
    Ok(Json(state.facade.get_request(caller.as_ref(), id).await?))
}

async fn complete_request_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Request>> {
    let Path(id) = path?;
    Ok(Json(state.facade.complete_request(caller.as_ref(), id).await?))
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

async fn apply_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ApplyBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Application>)> {
    let Path(request_id) = path?;
    let Json(body) = payload?;
    let application = state
        .facade
        .submit_application(caller.as_ref(), request_id, body.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn request_applications_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<PaginatedResult<Application>>> {
    let Path(request_id) = path?;
    let Query(query) = query?;
    let (_, page) = query.split();
    let applications = state
        .facade
        .list_applications_for_request(caller.as_ref(), request_id, page)
        .await?;
    Ok(Json(applications))
}

async fn own_applications_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<PaginatedResult<Application>>> {
    let Query(query) = query?;
    let (_, page) = query.split();
    let applications = state
        .facade
        .list_own_applications(caller.as_ref(), page)
        .await?;
    Ok(Json(applications))
}

async fn approve_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Application>> {
    let Path(id) = path?;
    Ok(Json(
        state.facade.approve_application(caller.as_ref(), id).await?,
    ))
}

async fn reject_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Application>> {
    let Path(id) = path?;
    Ok(Json(
        state.facade.reject_application(caller.as_ref(), id).await?,
    ))
}

async fn feedback_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<FeedbackBody>, JsonRejection>,
) -> ApiResult<Json<FulfillmentResponse>> {
    let Path(id) = path?;
    let Json(body) = payload?;
    let (application, request) = state
        .facade
        .record_feedback_and_fulfill(caller.as_ref(), id, &body.feedback)
        .await?;
    Ok(Json(FulfillmentResponse {
        application,
        request,
    }))
}

async fn withdraw_handler(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Path(id) = path?;
    state.facade.withdraw_application(caller.as_ref(), id).await?;
    Ok(Json(json!({ "id": id, "withdrawn": true })))
}
