//! Error types for Guldan.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuldanError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Conflict: {reason}")]
    Conflict { reason: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl GuldanError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

pub type GuldanResult<T> = Result<T, GuldanError>;
