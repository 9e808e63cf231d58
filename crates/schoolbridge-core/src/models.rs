//! Domain models for SchoolBridge.
//!
//! These are the core types shared across all crates.

pub mod application;
pub mod category;
pub mod identity;
pub mod request;
