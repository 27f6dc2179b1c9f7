//! Guldan Access: privilege resolution over the grant store and the
//! lifecycle manager that owns every organization, project and grant
//! write.

pub mod config;
pub mod error;
pub mod resolver;
pub mod service;

pub use config::AccessConfig;
pub use error::AccessError;
pub use resolver::{PrivilegeResolver, ProjectLevels};
pub use service::{
    AccessMode, AccessService, AuthorizeInput, CreateOrganizationInput, CreateProjectInput,
    GrantHolder, OrganizationView,
};
