//! Integration tests for the Application repository using in-memory
//! SurrealDB.

use schoolbridge_core::error::BridgeError;
use schoolbridge_core::models::application::{ApplicationStatus, CreateApplication};
use schoolbridge_core::repository::{ApplicationRepository, Pagination};
use schoolbridge_core::scope::ApplicationVisibility;
use schoolbridge_db::repository::SurrealApplicationRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealApplicationRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolbridge_db::run_migrations(&db).await.unwrap();
    SurrealApplicationRepository::new(db)
}

fn offer(request_id: Uuid, volunteer_id: Uuid, school_id: Uuid) -> CreateApplication {
    CreateApplication {
        request_id,
        volunteer_id,
        school_id,
        offered_quantity: 3,
    }
}

#[tokio::test]
async fn create_and_get_application() {
    let repo = setup().await;
    let (request_id, volunteer_id, school_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let application = repo
        .create(offer(request_id, volunteer_id, school_id))
        .await
        .unwrap();
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.offered_quantity, 3);
    assert!(application.feedback.is_none());
    assert!(application.fulfilled_at.is_none());

    let fetched = repo.get_by_id(application.id).await.unwrap();
    assert_eq!(fetched.request_id, request_id);
    assert_eq!(fetched.volunteer_id, volunteer_id);
    assert_eq!(fetched.school_id, school_id);

    let found = repo
        .find_by_volunteer_and_request(volunteer_id, request_id)
        .await
        .unwrap();
    assert_eq!(found.map(|a| a.id), Some(application.id));
}

#[tokio::test]
async fn duplicate_pair_is_a_conflict() {
    let repo = setup().await;
    let (request_id, volunteer_id, school_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    repo.create(offer(request_id, volunteer_id, school_id))
        .await
        .unwrap();
    let err = repo
        .create(offer(request_id, volunteer_id, school_id))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Conflict { .. }), "got {err:?}");

    // Another volunteer on the same request is fine.
    repo.create(offer(request_id, Uuid::new_v4(), school_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn transitions_check_current_status() {
    let repo = setup().await;
    let application = repo
        .create(offer(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap();

    let approved = repo
        .transition(
            application.id,
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
        )
        .await
        .unwrap()
        .expect("pending application should be approved");
    assert_eq!(approved.status, ApplicationStatus::Approved);

    assert!(
        repo.transition(
            application.id,
            ApplicationStatus::Pending,
            ApplicationStatus::Rejected,
        )
        .await
        .unwrap()
        .is_none()
    );
}

#[tokio::test]
async fn delete_only_removes_pending() {
    let repo = setup().await;
    let pending = repo
        .create(offer(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap();
    let approved = repo
        .create(offer(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()))
        .await
        .unwrap();
    repo.transition(
        approved.id,
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
    )
    .await
    .unwrap();

    assert!(repo.delete_pending(pending.id).await.unwrap());
    assert!(matches!(
        repo.get_by_id(pending.id).await,
        Err(BridgeError::NotFound { .. })
    ));

    assert!(!repo.delete_pending(approved.id).await.unwrap());
    assert!(repo.get_by_id(approved.id).await.is_ok());
}

#[tokio::test]
async fn listings_respect_visibility() {
    let repo = setup().await;
    let request_id = Uuid::new_v4();
    let school_a = Uuid::new_v4();
    let school_b = Uuid::new_v4();
    let volunteer = Uuid::new_v4();

    repo.create(offer(request_id, volunteer, school_a))
        .await
        .unwrap();
    repo.create(offer(request_id, Uuid::new_v4(), school_a))
        .await
        .unwrap();
    repo.create(offer(Uuid::new_v4(), volunteer, school_b))
        .await
        .unwrap();

    let for_request = repo
        .list_for_request(
            ApplicationVisibility::ForSchool(school_a),
            request_id,
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(for_request.total, 2);

    let foreign_school = repo
        .list_for_request(
            ApplicationVisibility::ForSchool(school_b),
            request_id,
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(foreign_school.total, 0);

    let mine = repo
        .list(ApplicationVisibility::ByVolunteer(volunteer), Pagination::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 2);
    assert!(mine.items.iter().all(|a| a.volunteer_id == volunteer));

    let all = repo
        .list(ApplicationVisibility::Unrestricted, Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let denied = repo
        .list(ApplicationVisibility::Denied, Pagination::default())
        .await
        .unwrap();
    assert!(denied.items.is_empty());
}
