//! Domain models for Guldan.
//!
//! These are the core types shared across all crates.

pub mod organization;
pub mod privilege;
pub mod project;
pub mod user;
pub mod visibility;
