use std::sync::Arc;

use schoolbridge_db::DbManager;
use schoolbridge_db::repository::{
    SurrealApplicationRepository, SurrealCatalogRepository, SurrealRequestRepository,
};
use schoolbridge_workflow::{WorkflowConfig, WorkflowFacade};
use surrealdb::engine::any::Any;

use crate::session::SessionVerifier;

pub type Facade = WorkflowFacade<
    SurrealApplicationRepository<Any>,
    SurrealRequestRepository<Any>,
    SurrealCatalogRepository<Any>,
>;

#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<Facade>,
    pub db: DbManager,
    pub sessions: Arc<SessionVerifier>,
}

impl AppState {
    pub fn new(db: DbManager, sessions: SessionVerifier, config: WorkflowConfig) -> Self {
        let client = db.client().clone();
        let facade = WorkflowFacade::new(
            SurrealApplicationRepository::new(client.clone()),
            SurrealRequestRepository::new(client.clone()),
            SurrealCatalogRepository::new(client),
            config,
        );

        Self {
            facade: Arc::new(facade),
            db,
            sessions: Arc::new(sessions),
        }
    }
}
