//! SchoolBridge Workflow: the request ledger, the application workflow
//! and the scoped facade callers go through.
//!
//! Everything here is generic over the `schoolbridge-core` repository
//! traits, so the workflow has no dependency on the database crate.

pub mod applications;
pub mod config;
pub mod facade;
pub mod ledger;

pub use applications::ApplicationWorkflow;
pub use config::WorkflowConfig;
pub use facade::{NewRequest, PageRequest, WorkflowFacade};
pub use ledger::RequestLedger;
