//! Guldan Core: domain model, error kinds, the hierarchical naming
//! scheme, and the store traits implemented by `guldan-db`.

pub mod error;
pub mod models;
pub mod naming;
pub mod repository;
