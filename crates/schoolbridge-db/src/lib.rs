//! SchoolBridge Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization, migrations and the seeded catalog
//!   ([`run_migrations`])
//! - Error types ([`DbError`])
//! - SurrealDB implementations of the `schoolbridge-core` repository traits

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
