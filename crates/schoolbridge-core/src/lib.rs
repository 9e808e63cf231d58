//! SchoolBridge Core: domain models, error taxonomy, repository traits
//! and the per-caller access scope.
//!
//! This crate performs no I/O. The database crate implements the
//! repository traits and the workflow crate drives them.

pub mod error;
pub mod models;
pub mod repository;
pub mod scope;

pub use error::{BridgeError, BridgeResult};
pub use scope::{AccessScope, ApplicationVisibility, RequestVisibility};
