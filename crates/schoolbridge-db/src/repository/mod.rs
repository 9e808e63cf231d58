//! SurrealDB repository implementations.

mod application;
mod catalog;
mod request;

pub use application::SurrealApplicationRepository;
pub use catalog::SurrealCatalogRepository;
pub use request::SurrealRequestRepository;

use surrealdb_types::SurrealValue;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}
