//! Access error types.

use guldan_core::error::GuldanError;
use guldan_core::naming::NameError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name is {len} characters, the limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("name must not contain '.'")]
    ReservedSeparator,

    #[error("unknown privilege type: {0}")]
    UnknownPrivilegeType(String),

    #[error("users cannot authorize themselves")]
    SelfAuthorization,

    #[error("user cannot modify organization {0}")]
    NotModifier(Uuid),

    #[error("user cannot view organization {0}")]
    NotViewer(Uuid),

    #[error("user cannot modify project {0}")]
    NotProjectModifier(Uuid),

    #[error("target user holds no grant on organization {0}")]
    NoGrant(Uuid),
}

impl From<NameError> for AccessError {
    fn from(err: NameError) -> Self {
        match err {
            NameError::Empty => AccessError::EmptyName,
            NameError::TooLong { len, max } => AccessError::NameTooLong { len, max },
            NameError::ReservedSeparator => AccessError::ReservedSeparator,
        }
    }
}

impl From<AccessError> for GuldanError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::EmptyName
            | AccessError::NameTooLong { .. }
            | AccessError::ReservedSeparator
            | AccessError::UnknownPrivilegeType(_)
            | AccessError::SelfAuthorization => GuldanError::InvalidArgument {
                message: err.to_string(),
            },
            AccessError::NotModifier(_)
            | AccessError::NotViewer(_)
            | AccessError::NotProjectModifier(_) => GuldanError::PermissionDenied {
                reason: err.to_string(),
            },
            AccessError::NoGrant(_) => GuldanError::Conflict {
                reason: err.to_string(),
            },
        }
    }
}
