//! Integration tests for the Request repository using in-memory SurrealDB.

use schoolbridge_core::error::BridgeError;
use schoolbridge_core::models::application::{Application, ApplicationStatus, CreateApplication};
use schoolbridge_core::models::request::{CreateRequest, Request, RequestFilter, RequestStatus};
use schoolbridge_core::repository::{ApplicationRepository, Pagination, RequestRepository};
use schoolbridge_core::scope::RequestVisibility;
use schoolbridge_db::repository::{SurrealApplicationRepository, SurrealRequestRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> SurrealRequestRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolbridge_db::run_migrations(&db).await.unwrap();
    SurrealRequestRepository::new(db)
}

/// Helper: both repositories over one in-memory DB.
async fn setup_pair() -> (SurrealRequestRepository<Db>, SurrealApplicationRepository<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolbridge_db::run_migrations(&db).await.unwrap();
    (
        SurrealRequestRepository::new(db.clone()),
        SurrealApplicationRepository::new(db),
    )
}

async fn offer(
    applications: &SurrealApplicationRepository<Db>,
    request: &Request,
    quantity: u32,
) -> Application {
    applications
        .create(CreateApplication {
            request_id: request.id,
            volunteer_id: Uuid::new_v4(),
            school_id: request.school_id,
            offered_quantity: quantity,
        })
        .await
        .unwrap()
}

fn desks(school_id: Uuid, quantity: u32) -> CreateRequest {
    CreateRequest {
        school_id,
        category: "Furniture".into(),
        subcategory: "Desks".into(),
        description: "Desks for the library reading room".into(),
        required_quantity: quantity,
    }
}

#[tokio::test]
async fn create_starts_open_with_full_remaining() {
    let repo = setup().await;
    let school_id = Uuid::new_v4();

    let request = repo.create(desks(school_id, 10)).await.unwrap();
    assert_eq!(request.school_id, school_id);
    assert_eq!(request.status, RequestStatus::Open);
    assert_eq!(request.required_quantity, 10);
    assert_eq!(request.remaining_quantity, 10);

    let fetched = repo.get_by_id(request.id).await.unwrap();
    assert_eq!(fetched.id, request.id);
    assert_eq!(fetched.description, request.description);
}

#[tokio::test]
async fn get_missing_request_is_not_found() {
    let repo = setup().await;
    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound { .. }));
}

#[tokio::test]
async fn approve_moves_application_and_request_together() {
    let (requests, applications) = setup_pair().await;
    let request = requests.create(desks(Uuid::new_v4(), 10)).await.unwrap();
    let first = offer(&applications, &request, 4).await;
    let second = offer(&applications, &request, 3).await;

    let after = requests
        .approve_application(request.id, first.id)
        .await
        .unwrap()
        .expect("pending application on an open request should approve");
    assert_eq!(after.status, RequestStatus::Approved);
    assert_eq!(after.remaining_quantity, 10);
    assert_eq!(
        applications.get_by_id(first.id).await.unwrap().status,
        ApplicationStatus::Approved
    );

    // Later approvals keep the request Approved.
    let after = requests
        .approve_application(request.id, second.id)
        .await
        .unwrap()
        .expect("an approved request still takes approvals");
    assert_eq!(after.status, RequestStatus::Approved);
}

#[tokio::test]
async fn refused_approval_writes_nothing() {
    let (requests, applications) = setup_pair().await;
    let request = requests.create(desks(Uuid::new_v4(), 2)).await.unwrap();
    let application = offer(&applications, &request, 2).await;

    // Belongs to a different request.
    let elsewhere = requests.create(desks(Uuid::new_v4(), 2)).await.unwrap();
    assert!(
        requests
            .approve_application(elsewhere.id, application.id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        requests.get_by_id(elsewhere.id).await.unwrap().status,
        RequestStatus::Open
    );
    assert_eq!(
        applications.get_by_id(application.id).await.unwrap().status,
        ApplicationStatus::Pending
    );

    // A request past Approved takes no further approvals.
    requests
        .transition(request.id, RequestStatus::Open, RequestStatus::Approved)
        .await
        .unwrap();
    requests
        .transition(request.id, RequestStatus::Approved, RequestStatus::Fulfilled)
        .await
        .unwrap();
    assert!(
        requests
            .approve_application(request.id, application.id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        applications.get_by_id(application.id).await.unwrap().status,
        ApplicationStatus::Pending
    );
}

#[tokio::test]
async fn fulfill_moves_both_records_and_stops_at_zero() {
    let (requests, applications) = setup_pair().await;
    let request = requests.create(desks(Uuid::new_v4(), 10)).await.unwrap();
    let first = offer(&applications, &request, 6).await;
    let second = offer(&applications, &request, 4).await;
    for application in [&first, &second] {
        requests
            .approve_application(request.id, application.id)
            .await
            .unwrap()
            .unwrap();
    }

    let after_first = requests
        .fulfill_application(request.id, first.id, 6, "Arrived Monday".into())
        .await
        .unwrap()
        .expect("6 of 10 should apply");
    assert_eq!(after_first.remaining_quantity, 4);
    assert_eq!(after_first.status, RequestStatus::Approved);

    let fulfilled = applications.get_by_id(first.id).await.unwrap();
    assert_eq!(fulfilled.status, ApplicationStatus::Fulfilled);
    assert_eq!(fulfilled.feedback.as_deref(), Some("Arrived Monday"));
    assert!(fulfilled.fulfilled_at.is_some());

    let after_second = requests
        .fulfill_application(request.id, second.id, 4, "All good".into())
        .await
        .unwrap()
        .expect("exactly the remainder should apply");
    assert_eq!(after_second.remaining_quantity, 0);
    assert_eq!(after_second.status, RequestStatus::Fulfilled);
}

#[tokio::test]
async fn refused_fulfillment_leaves_both_records_untouched() {
    let (requests, applications) = setup_pair().await;
    let request = requests.create(desks(Uuid::new_v4(), 10)).await.unwrap();
    let big = offer(&applications, &request, 6).await;
    let late = offer(&applications, &request, 5).await;
    for application in [&big, &late] {
        requests
            .approve_application(request.id, application.id)
            .await
            .unwrap()
            .unwrap();
    }
    requests
        .fulfill_application(request.id, big.id, 6, "Thanks".into())
        .await
        .unwrap()
        .unwrap();

    // 5 no longer fits into the remaining 4.
    assert!(
        requests
            .fulfill_application(request.id, late.id, 5, "Thanks".into())
            .await
            .unwrap()
            .is_none()
    );
    let late_now = applications.get_by_id(late.id).await.unwrap();
    assert_eq!(late_now.status, ApplicationStatus::Approved);
    assert!(late_now.feedback.is_none());
    assert!(late_now.fulfilled_at.is_none());
    assert_eq!(
        requests.get_by_id(request.id).await.unwrap().remaining_quantity,
        4
    );

    // The same application cannot be fulfilled twice.
    assert!(
        requests
            .fulfill_application(request.id, big.id, 6, "Again".into())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        requests.get_by_id(request.id).await.unwrap().remaining_quantity,
        4
    );

    // A quantity other than the offered one is refused.
    assert!(
        requests
            .fulfill_application(request.id, late.id, 4, "Partial".into())
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(
        applications.get_by_id(late.id).await.unwrap().status,
        ApplicationStatus::Approved
    );
}

#[tokio::test]
async fn fulfill_requires_prior_approval() {
    let (requests, applications) = setup_pair().await;
    let request = requests.create(desks(Uuid::new_v4(), 3)).await.unwrap();
    let pending = offer(&applications, &request, 3).await;

    assert!(
        requests
            .fulfill_application(request.id, pending.id, 3, "Too early".into())
            .await
            .unwrap()
            .is_none()
    );
    let unchanged = requests.get_by_id(request.id).await.unwrap();
    assert_eq!(unchanged.status, RequestStatus::Open);
    assert_eq!(unchanged.remaining_quantity, 3);
}

#[tokio::test]
async fn transition_is_conditional_on_current_status() {
    let repo = setup().await;
    let request = repo.create(desks(Uuid::new_v4(), 3)).await.unwrap();

    let approved = repo
        .transition(request.id, RequestStatus::Open, RequestStatus::Approved)
        .await
        .unwrap()
        .expect("open request should move to approved");
    assert_eq!(approved.status, RequestStatus::Approved);

    // Second attempt sees the request is no longer Open.
    assert!(
        repo.transition(request.id, RequestStatus::Open, RequestStatus::Approved)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn list_applies_visibility_and_filters() {
    let repo = setup().await;
    let school_a = Uuid::new_v4();
    let school_b = Uuid::new_v4();

    repo.create(desks(school_a, 5)).await.unwrap();
    repo.create(CreateRequest {
        school_id: school_a,
        category: "Electronics".into(),
        subcategory: "Projectors".into(),
        description: "Projector for the science lab".into(),
        required_quantity: 1,
    })
    .await
    .unwrap();
    let closed = repo.create(desks(school_b, 2)).await.unwrap();
    repo.transition(closed.id, RequestStatus::Open, RequestStatus::Approved)
        .await
        .unwrap();

    let own_a = repo
        .list(
            RequestVisibility::OwnedBy(school_a),
            RequestFilter::default(),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(own_a.total, 2);
    assert!(own_a.items.iter().all(|r| r.school_id == school_a));

    let catalog = repo
        .list(
            RequestVisibility::OpenCatalog,
            RequestFilter::default(),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(catalog.total, 2);
    assert!(catalog.items.iter().all(|r| r.status == RequestStatus::Open));

    let search = repo
        .list(
            RequestVisibility::OpenCatalog,
            RequestFilter {
                search: Some("SCIENCE".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.items[0].subcategory, "Projectors");

    let by_category = repo
        .list(
            RequestVisibility::Unrestricted,
            RequestFilter {
                category: Some("Furniture".into()),
                subcategory: Some("Desks".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_category.total, 2);

    let denied = repo
        .list(
            RequestVisibility::Denied,
            RequestFilter::default(),
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(denied.total, 0);
    assert!(denied.items.is_empty());
}

#[tokio::test]
async fn list_paginates() {
    let repo = setup().await;
    let school_id = Uuid::new_v4();
    for quantity in 1..=5 {
        repo.create(desks(school_id, quantity)).await.unwrap();
    }

    let page = repo
        .list(
            RequestVisibility::OwnedBy(school_id),
            RequestFilter::default(),
            Pagination {
                offset: 2,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.offset, 2);
}
